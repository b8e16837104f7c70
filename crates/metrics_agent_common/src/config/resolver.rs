use crate::config::error::{ConfigError, InvalidValue, SchemaError};
use crate::config::registry::{OptionDescriptor, ParameterRegistry};
use crate::config::value::{OptionKind, OptionValue};
use clap::parser::ValueSource;
use clap::ArgMatches;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use tracing::debug;

/// Where the effective value of an option came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Flag,
    Environment,
    Default,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Source::Flag => "flag",
            Source::Environment => "environment",
            Source::Default => "default",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedValue {
    pub value: OptionValue,
    pub source: Source,
}

/// The effective, typed value of every option in a registry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedValues {
    values: BTreeMap<&'static str, ResolvedValue>,
}

impl ResolvedValues {
    pub fn get(&self, name: &str) -> Option<&ResolvedValue> {
        self.values.get(name)
    }

    #[cfg(test)]
    pub(crate) fn source(&self, name: &str) -> Option<Source> {
        self.get(name).map(|resolved| resolved.source)
    }

    pub fn string(&self, name: &str) -> Result<String, SchemaError> {
        self.typed(name, OptionKind::String, |value| match value {
            OptionValue::String(value) => Some(value.clone()),
            _ => None,
        })
    }

    pub fn int(&self, name: &str) -> Result<i64, SchemaError> {
        self.typed(name, OptionKind::Int, |value| match value {
            OptionValue::Int(value) => Some(*value),
            _ => None,
        })
    }

    pub fn uint(&self, name: &str) -> Result<u64, SchemaError> {
        self.typed(name, OptionKind::Uint, |value| match value {
            OptionValue::Uint(value) => Some(*value),
            _ => None,
        })
    }

    pub fn bool(&self, name: &str) -> Result<bool, SchemaError> {
        self.typed(name, OptionKind::Bool, |value| match value {
            OptionValue::Bool(value) => Some(*value),
            _ => None,
        })
    }

    fn typed<T>(
        &self,
        name: &str,
        requested: OptionKind,
        extract: impl FnOnce(&OptionValue) -> Option<T>,
    ) -> Result<T, SchemaError> {
        let resolved = self
            .get(name)
            .ok_or_else(|| SchemaError::UnknownOption(name.to_owned()))?;
        extract(&resolved.value).ok_or_else(|| SchemaError::TypeMismatch {
            option: name.to_owned(),
            declared: resolved.value.kind().as_str(),
            requested: requested.as_str(),
        })
    }
}

/// Computes the effective value of every option in `registry` from matches of the command built
/// by [ParameterRegistry::command].
///
/// A flag given on the command line wins over the environment variable, which wins over the
/// declared default. Precedence is decided per option. Empty environment variables are treated
/// as unset. Every value that fails to convert is reported, not just the first one.
pub fn resolve_values(
    registry: &ParameterRegistry,
    matches: &ArgMatches,
) -> Result<ResolvedValues, ConfigError> {
    let mut values = BTreeMap::new();
    let mut invalid = Vec::new();

    for option in registry.options() {
        let parsed = raw_value(option, matches).and_then(|(raw, source)| {
            match option.kind.parse(&raw) {
                Ok(value) => Ok(ResolvedValue { value, source }),
                Err(reason) => Err(InvalidValue {
                    option: option.name.to_owned(),
                    raw,
                    origin: source,
                    reason,
                }),
            }
        });

        match parsed {
            Ok(resolved) => {
                if option.secret {
                    debug!(option = option.name, source = %resolved.source, "resolved option");
                } else {
                    debug!(
                        option = option.name,
                        source = %resolved.source,
                        value = %resolved.value,
                        "resolved option"
                    );
                }
                values.insert(option.name, resolved);
            }
            Err(value) => invalid.push(value),
        }
    }

    if !invalid.is_empty() {
        return Err(ConfigError::InvalidValues(invalid));
    }
    Ok(ResolvedValues { values })
}

fn raw_value(
    option: &OptionDescriptor,
    matches: &ArgMatches,
) -> Result<(String, Source), InvalidValue> {
    let source = match matches.value_source(option.name) {
        Some(ValueSource::CommandLine) => Source::Flag,
        Some(ValueSource::EnvVariable) => Source::Environment,
        _ => return Ok((option.default.to_owned(), Source::Default)),
    };
    let Some(raw) = matches.get_one::<OsString>(option.name) else {
        return Ok((option.default.to_owned(), Source::Default));
    };
    if source == Source::Environment && raw.is_empty() {
        return Ok((option.default.to_owned(), Source::Default));
    }

    raw.clone()
        .into_string()
        .map(|raw| (raw, source))
        .map_err(|raw| InvalidValue {
            option: option.name.to_owned(),
            raw: raw.to_string_lossy().into_owned(),
            origin: source,
            reason: "not valid UTF-8".to_owned(),
        })
}
