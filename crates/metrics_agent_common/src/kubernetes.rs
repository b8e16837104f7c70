// SPDX-License-Identifier: AGPL-3.0-only
// Copyright Authors of metrics-agent

use crate::config::{
    check_required_settings, resolve_values, ConfigError, OptionDescriptor,
    OptionValue, ParameterRegistry, Problem, ResolvedValues, SchemaError, Settings,
    ValidationError, ENV_PREFIX,
};
use clap::ArgMatches;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const API_KEY: &str = "api_key";
pub const CLUSTER_NAME: &str = "cluster_name";
pub const POLL_INTERVAL: &str = "poll_interval";
pub const COLLECTION_RETRY_LIMIT: &str = "collection_retry_limit";
pub const CERTIFICATE_FILE: &str = "certificate_file";
pub const KEY_FILE: &str = "key_file";
pub const OUTBOUND_PROXY: &str = "outbound_proxy";
pub const OUTBOUND_PROXY_AUTH: &str = "outbound_proxy_auth";
pub const OUTBOUND_PROXY_INSECURE: &str = "outbound_proxy_insecure";
pub const INSECURE: &str = "insecure";
pub const FORCE_KUBE_PROXY: &str = "force_kube_proxy";
pub const NAMESPACE: &str = "namespace";
pub const SCRATCH_DIR: &str = "scratch_dir";
pub const INFORMER_RESYNC_INTERVAL: &str = "informer_resync_interval";
pub const CONCURRENT_POLLERS: &str = "number_of_concurrent_node_pollers";
pub const PARSE_METRIC_DATA: &str = "parse_metric_data";

/// The settings that must be provided for the agent to start.
pub const REQUIRED_SETTINGS: &[&str] = &[API_KEY, CLUSTER_NAME];

/// Number of attempts made against each metrics source upon a failure.
pub const DEFAULT_COLLECTION_RETRY: u64 = 1;

const REDACTED: &str = "<redacted>";

/// Declares every option of the `kubernetes` command.
pub fn registry() -> Result<ParameterRegistry, SchemaError> {
    registry_with_prefix(ENV_PREFIX)
}

/// Like [registry], with the options published under `env_prefix` instead of [ENV_PREFIX].
pub fn registry_with_prefix(env_prefix: &str) -> Result<ParameterRegistry, SchemaError> {
    ParameterRegistry::builder(env_prefix)
        .declare(
            OptionDescriptor::string(API_KEY, "", "Cloudability API Key")
                .required()
                .secret(),
        )
        .declare(
            OptionDescriptor::string(
                CLUSTER_NAME,
                "",
                "Kubernetes Cluster Name. This must be unique to every cluster",
            )
            .required(),
        )
        .declare(OptionDescriptor::int(
            POLL_INTERVAL,
            "180",
            "Time, in seconds, to poll the services infrastructure",
        ))
        .declare(OptionDescriptor::uint(
            COLLECTION_RETRY_LIMIT,
            "1",
            "Number of times the agent should attempt to gather metrics from each source upon a failure",
        ))
        .declare(OptionDescriptor::string(
            CERTIFICATE_FILE,
            "",
            "The path to a certificate file",
        ))
        .declare(OptionDescriptor::string(
            KEY_FILE,
            "",
            "The path to a key file",
        ))
        .declare(OptionDescriptor::string(
            OUTBOUND_PROXY,
            "",
            "Outbound HTTP/HTTPS proxy, e.g. http://x.x.x.x:8080. Must have a scheme prefix (http:// or https://)",
        ))
        .declare(
            OptionDescriptor::string(
                OUTBOUND_PROXY_AUTH,
                "",
                "Outbound proxy basic authentication credentials in the form username:password",
            )
            .secret(),
        )
        .declare(OptionDescriptor::bool(
            OUTBOUND_PROXY_INSECURE,
            "false",
            "When true, does not verify TLS certificates when using the outbound proxy",
        ))
        .declare(OptionDescriptor::bool(
            INSECURE,
            "false",
            "When true, does not verify certificates when making TLS connections",
        ))
        .declare(OptionDescriptor::bool(
            FORCE_KUBE_PROXY,
            "false",
            "When true, disables direct node connection and forces proxy use",
        ))
        .declare(OptionDescriptor::string(
            NAMESPACE,
            "cloudability",
            "Kubernetes namespace that the agent is running in",
        ))
        .declare(OptionDescriptor::string(
            SCRATCH_DIR,
            "/tmp",
            "Directory metrics will be written to",
        ))
        .declare(OptionDescriptor::int(
            INFORMER_RESYNC_INTERVAL,
            "24",
            "Time, in hours, between informer resyncs",
        ))
        .declare(OptionDescriptor::int(
            CONCURRENT_POLLERS,
            "100",
            "Number of concurrent tasks created when polling node data",
        ))
        .declare(OptionDescriptor::bool(
            PARSE_METRIC_DATA,
            "false",
            "When true, core files will be parsed and non-relevant data will be removed prior to upload",
        ))
        .build()
}

/// The resolved configuration of the Kubernetes metrics agent.
#[derive(Clone, PartialEq, Eq)]
pub struct KubeAgentConfig {
    pub api_key: String,
    pub cluster_name: String,
    /// In seconds
    pub poll_interval: i64,
    pub collection_retry_limit: u64,
    pub certificate_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    pub outbound_proxy: Option<String>,
    /// `username:password`
    pub outbound_proxy_auth: Option<String>,
    pub outbound_proxy_insecure: bool,
    pub insecure: bool,
    pub force_kube_proxy: bool,
    pub namespace: String,
    pub scratch_dir: PathBuf,
    /// In hours
    pub informer_resync_interval: i64,
    pub concurrent_pollers: i64,
    pub parse_metric_data: bool,
}

impl KubeAgentConfig {
    /// Resolves the configuration from the parsed `kubernetes` command line and the environment.
    pub fn resolve(registry: &ParameterRegistry, matches: &ArgMatches) -> Result<Self, ConfigError> {
        let values = resolve_values(registry, matches)?;
        Ok(Self::from_values(&values)?)
    }

    /// Assembles the configuration from resolved values in one step.
    pub fn from_values(values: &ResolvedValues) -> Result<Self, SchemaError> {
        Ok(Self {
            api_key: values.string(API_KEY)?,
            cluster_name: values.string(CLUSTER_NAME)?,
            poll_interval: values.int(POLL_INTERVAL)?,
            collection_retry_limit: values.uint(COLLECTION_RETRY_LIMIT)?,
            certificate_file: non_empty(values.string(CERTIFICATE_FILE)?).map(PathBuf::from),
            key_file: non_empty(values.string(KEY_FILE)?).map(PathBuf::from),
            outbound_proxy: non_empty(values.string(OUTBOUND_PROXY)?),
            outbound_proxy_auth: non_empty(values.string(OUTBOUND_PROXY_AUTH)?),
            outbound_proxy_insecure: values.bool(OUTBOUND_PROXY_INSECURE)?,
            insecure: values.bool(INSECURE)?,
            force_kube_proxy: values.bool(FORCE_KUBE_PROXY)?,
            namespace: values.string(NAMESPACE)?,
            scratch_dir: PathBuf::from(values.string(SCRATCH_DIR)?),
            informer_resync_interval: values.int(INFORMER_RESYNC_INTERVAL)?,
            concurrent_pollers: values.int(CONCURRENT_POLLERS)?,
            parse_metric_data: values.bool(PARSE_METRIC_DATA)?,
        })
    }

    /// Rejects configurations that are incomplete or contradict themselves. Every problem is
    /// reported at once.
    pub fn validate(&self, required: &[&str]) -> Result<(), ValidationError> {
        let mut problems = check_required_settings(self, required)?;

        if self.certificate_file.is_some() != self.key_file.is_some() {
            problems.push(Problem::Conflict {
                option: CERTIFICATE_FILE.to_owned(),
                other: KEY_FILE.to_owned(),
                reason: "must be set together".to_owned(),
            });
        }
        if let Some(proxy) = &self.outbound_proxy {
            if !(proxy.starts_with("http://") || proxy.starts_with("https://")) {
                problems.push(invalid(
                    OUTBOUND_PROXY,
                    "must have a scheme prefix (http:// or https://)",
                ));
            }
        }
        if let Some(auth) = &self.outbound_proxy_auth {
            let well_formed = auth
                .split_once(':')
                .is_some_and(|(username, password)| !username.is_empty() && !password.is_empty());
            if !well_formed {
                problems.push(invalid(
                    OUTBOUND_PROXY_AUTH,
                    "must be of the form username:password",
                ));
            }
        }
        if self.namespace.is_empty() {
            problems.push(invalid(NAMESPACE, "must not be empty"));
        }
        for (option, value) in [
            (POLL_INTERVAL, self.poll_interval),
            (INFORMER_RESYNC_INTERVAL, self.informer_resync_interval),
            (CONCURRENT_POLLERS, self.concurrent_pollers),
        ] {
            if value <= 0 {
                problems.push(invalid(option, "must be greater than 0"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Rejected(problems))
        }
    }

    pub fn poll_interval_duration(&self) -> Duration {
        Duration::from_secs(self.poll_interval.max(0) as u64)
    }

    pub fn informer_resync_duration(&self) -> Duration {
        Duration::from_secs((self.informer_resync_interval.max(0) as u64).saturating_mul(60 * 60))
    }
}

impl Settings for KubeAgentConfig {
    fn value_of(&self, name: &str) -> Option<OptionValue> {
        let value = match name {
            API_KEY => OptionValue::String(self.api_key.clone()),
            CLUSTER_NAME => OptionValue::String(self.cluster_name.clone()),
            POLL_INTERVAL => OptionValue::Int(self.poll_interval),
            COLLECTION_RETRY_LIMIT => OptionValue::Uint(self.collection_retry_limit),
            CERTIFICATE_FILE => path_value(self.certificate_file.as_ref()),
            KEY_FILE => path_value(self.key_file.as_ref()),
            OUTBOUND_PROXY => OptionValue::String(self.outbound_proxy.clone().unwrap_or_default()),
            OUTBOUND_PROXY_AUTH => {
                OptionValue::String(self.outbound_proxy_auth.clone().unwrap_or_default())
            }
            OUTBOUND_PROXY_INSECURE => OptionValue::Bool(self.outbound_proxy_insecure),
            INSECURE => OptionValue::Bool(self.insecure),
            FORCE_KUBE_PROXY => OptionValue::Bool(self.force_kube_proxy),
            NAMESPACE => OptionValue::String(self.namespace.clone()),
            SCRATCH_DIR => path_value(Some(&self.scratch_dir)),
            INFORMER_RESYNC_INTERVAL => OptionValue::Int(self.informer_resync_interval),
            CONCURRENT_POLLERS => OptionValue::Int(self.concurrent_pollers),
            PARSE_METRIC_DATA => OptionValue::Bool(self.parse_metric_data),
            _ => return None,
        };
        Some(value)
    }
}

// Credentials are kept out of logs and error reports.
impl fmt::Debug for KubeAgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeAgentConfig")
            .field("api_key", &redact(Some(&self.api_key)))
            .field("cluster_name", &self.cluster_name)
            .field("poll_interval", &self.poll_interval)
            .field("collection_retry_limit", &self.collection_retry_limit)
            .field("certificate_file", &self.certificate_file)
            .field("key_file", &self.key_file)
            .field("outbound_proxy", &self.outbound_proxy)
            .field(
                "outbound_proxy_auth",
                &redact(self.outbound_proxy_auth.as_ref()),
            )
            .field("outbound_proxy_insecure", &self.outbound_proxy_insecure)
            .field("insecure", &self.insecure)
            .field("force_kube_proxy", &self.force_kube_proxy)
            .field("namespace", &self.namespace)
            .field("scratch_dir", &self.scratch_dir)
            .field("informer_resync_interval", &self.informer_resync_interval)
            .field("concurrent_pollers", &self.concurrent_pollers)
            .field("parse_metric_data", &self.parse_metric_data)
            .finish()
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn path_value(path: Option<&PathBuf>) -> OptionValue {
    OptionValue::String(
        path.map(|path| path.display().to_string())
            .unwrap_or_default(),
    )
}

fn redact(value: Option<&String>) -> Option<&'static str> {
    value.filter(|value| !value.is_empty()).map(|_| REDACTED)
}

fn invalid(option: &str, reason: &str) -> Problem {
    Problem::Invalid {
        option: option.to_owned(),
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{testing, OptionKind, Source};

    fn resolve(args: &[&str], vars: &[(&str, &str)]) -> Result<KubeAgentConfig, ConfigError> {
        let registry = registry_with_prefix(&testing::unique_env_prefix()).unwrap();
        testing::set_env(&registry, vars);
        let matches = registry
            .command("kubernetes")
            .try_get_matches_from(std::iter::once("kubernetes").chain(args.iter().copied()))
            .unwrap();
        KubeAgentConfig::resolve(&registry, &matches)
    }

    fn valid() -> KubeAgentConfig {
        resolve(&["--api_key=K1", "--cluster_name=C1"], &[]).unwrap()
    }

    #[test]
    fn should_build_the_registry() {
        let registry = registry().unwrap();
        assert_eq!(registry.options().len(), 16);
        registry.command("kubernetes").debug_assert();
    }

    #[test]
    fn should_declare_the_required_settings() {
        assert_eq!(registry().unwrap().required_names(), REQUIRED_SETTINGS);
    }

    #[test]
    fn should_expose_every_declared_option_by_name() {
        let config = valid();
        for option in registry().unwrap().options() {
            let value = config
                .value_of(option.name)
                .unwrap_or_else(|| panic!("{} is not a field", option.name));
            assert_eq!(value.kind(), option.kind, "{}", option.name);
        }
    }

    #[test]
    fn should_use_documented_defaults() {
        let config = resolve(&[], &[]).unwrap();
        assert_eq!(config.api_key, "");
        assert_eq!(config.cluster_name, "");
        assert_eq!(config.poll_interval, 180);
        assert_eq!(config.collection_retry_limit, DEFAULT_COLLECTION_RETRY);
        assert_eq!(config.certificate_file, None);
        assert_eq!(config.key_file, None);
        assert_eq!(config.outbound_proxy, None);
        assert_eq!(config.outbound_proxy_auth, None);
        assert!(!config.outbound_proxy_insecure);
        assert!(!config.insecure);
        assert!(!config.force_kube_proxy);
        assert_eq!(config.namespace, "cloudability");
        assert_eq!(config.scratch_dir, PathBuf::from("/tmp"));
        assert_eq!(config.informer_resync_interval, 24);
        assert_eq!(config.concurrent_pollers, 100);
        assert!(!config.parse_metric_data);
    }

    #[test]
    fn should_prefer_flags_over_environment_over_defaults() {
        let vars = [
            ("poll_interval", "60"),
            ("namespace", "metrics"),
        ];

        let config = resolve(&["--poll_interval=30"], &vars).unwrap();
        assert_eq!(config.poll_interval, 30);
        assert_eq!(config.namespace, "metrics");
        assert_eq!(config.concurrent_pollers, 100);

        let config = resolve(&[], &vars).unwrap();
        assert_eq!(config.poll_interval, 60);
    }

    #[test]
    fn should_read_every_option_from_the_environment() {
        let config = resolve(
            &[],
            &[
                ("api_key", "K2"),
                ("cluster_name", "C2"),
                ("collection_retry_limit", "5"),
                ("certificate_file", "/certs/tls.crt"),
                ("key_file", "/certs/tls.key"),
                ("outbound_proxy", "https://proxy:8080"),
                ("outbound_proxy_auth", "user:pass"),
                ("outbound_proxy_insecure", "true"),
                ("insecure", "1"),
                ("force_kube_proxy", "True"),
                ("scratch_dir", "/scratch"),
                ("informer_resync_interval", "12"),
                ("number_of_concurrent_node_pollers", "8"),
                ("parse_metric_data", "t"),
            ],
        )
        .unwrap();

        assert_eq!(config.api_key, "K2");
        assert_eq!(config.cluster_name, "C2");
        assert_eq!(config.collection_retry_limit, 5);
        assert_eq!(config.certificate_file, Some(PathBuf::from("/certs/tls.crt")));
        assert_eq!(config.key_file, Some(PathBuf::from("/certs/tls.key")));
        assert_eq!(config.outbound_proxy.as_deref(), Some("https://proxy:8080"));
        assert_eq!(config.outbound_proxy_auth.as_deref(), Some("user:pass"));
        assert!(config.outbound_proxy_insecure);
        assert!(config.insecure);
        assert!(config.force_kube_proxy);
        assert_eq!(config.scratch_dir, PathBuf::from("/scratch"));
        assert_eq!(config.informer_resync_interval, 12);
        assert_eq!(config.concurrent_pollers, 8);
        assert!(config.parse_metric_data);
        assert!(config.validate(REQUIRED_SETTINGS).is_ok());
    }

    #[test]
    fn should_be_idempotent() {
        let vars = [("cluster_name", "C1")];
        let first = resolve(&["--api_key=K1", "--insecure"], &vars).unwrap();
        let second = resolve(&["--api_key=K1", "--insecure"], &vars).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn should_reject_non_numeric_poll_interval() {
        let err = resolve(&["--poll_interval=abc"], &[]).unwrap_err();
        assert_eq!(err.invalid_options(), vec![POLL_INTERVAL]);
        assert!(err.to_string().contains("abc"));

        let err = resolve(&[], &[("poll_interval", "abc")]).unwrap_err();
        let ConfigError::InvalidValues(values) = err else {
            panic!("unexpected error");
        };
        assert_eq!(values[0].option, POLL_INTERVAL);
        assert_eq!(values[0].origin, Source::Environment);
    }

    #[test]
    fn should_reject_negative_retry_limit() {
        let err = resolve(&["--collection_retry_limit=-1"], &[]).unwrap_err();
        assert_eq!(err.invalid_options(), vec![COLLECTION_RETRY_LIMIT]);
    }

    #[test]
    fn should_name_exactly_the_missing_required_settings() {
        let cases: [(&[&str], &[&str]); 4] = [
            (&[], &[API_KEY, CLUSTER_NAME]),
            (&["--api_key=K1"], &[CLUSTER_NAME]),
            (&["--cluster_name=C1"], &[API_KEY]),
            (&["--api_key=K1", "--cluster_name=C1"], &[]),
        ];
        for (args, missing) in cases {
            let res = resolve(args, &[]).unwrap().validate(REQUIRED_SETTINGS);
            match res {
                Ok(()) => assert!(missing.is_empty(), "{args:?}"),
                Err(err) => assert_eq!(err.missing(), missing, "{args:?}"),
            }
        }
    }

    #[test]
    fn should_accept_the_minimal_configuration() {
        let config = valid();
        assert_eq!(config.api_key, "K1");
        assert_eq!(config.cluster_name, "C1");
        assert_eq!(config.poll_interval, 180);
        assert_eq!(config.namespace, "cloudability");
        assert_eq!(config.concurrent_pollers, 100);
        assert!(config.validate(REQUIRED_SETTINGS).is_ok());
    }

    #[test]
    fn should_require_certificate_and_key_together() {
        let config = KubeAgentConfig {
            certificate_file: Some("/certs/tls.crt".into()),
            ..valid()
        };
        let err = config.validate(REQUIRED_SETTINGS).unwrap_err();
        assert_eq!(
            err.problems(),
            [Problem::Conflict {
                option: CERTIFICATE_FILE.into(),
                other: KEY_FILE.into(),
                reason: "must be set together".into(),
            }]
        );

        let config = KubeAgentConfig {
            key_file: Some("/certs/tls.key".into()),
            ..valid()
        };
        assert!(config.validate(REQUIRED_SETTINGS).is_err());
    }

    #[test]
    fn should_require_a_proxy_scheme() {
        let config = KubeAgentConfig {
            outbound_proxy: Some("10.0.0.1:8080".into()),
            ..valid()
        };
        let err = config.validate(REQUIRED_SETTINGS).unwrap_err();
        assert!(err.to_string().contains(OUTBOUND_PROXY));

        let config = KubeAgentConfig {
            outbound_proxy: Some("http://10.0.0.1:8080".into()),
            ..valid()
        };
        assert!(config.validate(REQUIRED_SETTINGS).is_ok());
    }

    #[test]
    fn should_require_well_formed_proxy_credentials() {
        for auth in ["user", "user:", ":pass"] {
            let config = KubeAgentConfig {
                outbound_proxy_auth: Some(auth.into()),
                ..valid()
            };
            assert!(config.validate(REQUIRED_SETTINGS).is_err(), "{auth}");
        }
    }

    #[test]
    fn should_require_positive_intervals_and_pollers() {
        let config = resolve(
            &[
                "--api_key=K1",
                "--cluster_name=C1",
                "--poll_interval=0",
                "--informer_resync_interval=-1",
                "--number_of_concurrent_node_pollers=0",
                "--namespace=",
            ],
            &[],
        )
        .unwrap();
        let err = config.validate(REQUIRED_SETTINGS).unwrap_err();
        assert_eq!(err.problems().len(), 4);
        assert!(err.missing().is_empty());
    }

    #[test]
    fn should_aggregate_missing_and_invalid_settings() {
        let config = resolve(&["--poll_interval=0"], &[]).unwrap();
        let err = config.validate(REQUIRED_SETTINGS).unwrap_err();
        assert_eq!(err.missing(), vec![API_KEY, CLUSTER_NAME]);
        assert_eq!(err.problems().len(), 3);
    }

    #[test]
    fn should_reject_unknown_required_names() {
        let err = valid().validate(&["heapster_override_url"]).unwrap_err();
        assert!(matches!(err, ValidationError::Schema(SchemaError::UnknownOption(_))));
    }

    #[test]
    fn should_redact_credentials_in_debug_output() {
        let config = KubeAgentConfig {
            outbound_proxy_auth: Some("user:hunter2".into()),
            ..valid()
        };
        let output = format!("{config:?}");
        assert!(!output.contains("K1"));
        assert!(!output.contains("hunter2"));
        assert!(output.contains("C1"));
    }

    #[test]
    fn should_convert_intervals_to_durations() {
        let config = valid();
        assert_eq!(config.poll_interval_duration(), Duration::from_secs(180));
        assert_eq!(
            config.informer_resync_duration(),
            Duration::from_secs(24 * 60 * 60)
        );
    }

    #[test]
    fn should_saturate_large_resync_intervals() {
        let config = resolve(
            &[
                "--api_key=K1",
                "--cluster_name=C1",
                "--informer_resync_interval=9223372036854775807",
            ],
            &[],
        )
        .unwrap();
        assert!(config.validate(REQUIRED_SETTINGS).is_ok());
        assert_eq!(config.informer_resync_duration(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn should_declare_booleans_as_booleans() {
        let registry = registry().unwrap();
        for name in [OUTBOUND_PROXY_INSECURE, INSECURE, FORCE_KUBE_PROXY, PARSE_METRIC_DATA] {
            assert_eq!(registry.get(name).unwrap().kind, OptionKind::Bool);
        }
    }
}
