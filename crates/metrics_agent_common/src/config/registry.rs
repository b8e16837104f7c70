use crate::config::error::SchemaError;
use crate::config::value::OptionKind;
use clap::builder::ValueParser;
use clap::{Arg, ArgAction, Command};
use std::collections::HashSet;

/// The declaration of a single configuration option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDescriptor {
    /// Used as the flag name and as the environment variable suffix
    pub name: &'static str,
    pub kind: OptionKind,
    /// The default in its textual form. It is parsed like any other input.
    pub default: &'static str,
    pub help: &'static str,
    pub required: bool,
    /// Secret values are never logged
    pub secret: bool,
}

impl OptionDescriptor {
    pub const fn new(
        name: &'static str,
        kind: OptionKind,
        default: &'static str,
        help: &'static str,
    ) -> Self {
        Self {
            name,
            kind,
            default,
            help,
            required: false,
            secret: false,
        }
    }

    pub const fn string(name: &'static str, default: &'static str, help: &'static str) -> Self {
        Self::new(name, OptionKind::String, default, help)
    }

    pub const fn int(name: &'static str, default: &'static str, help: &'static str) -> Self {
        Self::new(name, OptionKind::Int, default, help)
    }

    pub const fn uint(name: &'static str, default: &'static str, help: &'static str) -> Self {
        Self::new(name, OptionKind::Uint, default, help)
    }

    pub const fn bool(name: &'static str, default: &'static str, help: &'static str) -> Self {
        Self::new(name, OptionKind::Bool, default, help)
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    fn value_name(&self) -> &'static str {
        match self.kind {
            OptionKind::String => "STRING",
            OptionKind::Int => "INT",
            OptionKind::Uint => "UINT",
            OptionKind::Bool => "BOOL",
        }
    }
}

/// The closed set of options recognized by a command, together with the environment variable
/// prefix they are published under. A registry cannot be changed once built.
#[derive(Debug, Clone)]
pub struct ParameterRegistry {
    env_prefix: String,
    options: Vec<OptionDescriptor>,
}

#[derive(Debug)]
pub struct RegistryBuilder {
    env_prefix: String,
    options: Vec<OptionDescriptor>,
}

impl RegistryBuilder {
    pub fn declare(mut self, option: OptionDescriptor) -> Self {
        self.options.push(option);
        self
    }

    /// Checks the declarations for duplicates and unparseable defaults.
    pub fn build(self) -> Result<ParameterRegistry, SchemaError> {
        // Environment keys are upper-cased, so names differing only in case would collide.
        let mut seen = HashSet::new();
        for option in &self.options {
            if !seen.insert(option.name.to_ascii_lowercase()) {
                return Err(SchemaError::DuplicateOption(option.name.to_owned()));
            }
            option
                .kind
                .parse(option.default)
                .map_err(|reason| SchemaError::InvalidDefault {
                    option: option.name.to_owned(),
                    default: option.default.to_owned(),
                    reason,
                })?;
        }

        Ok(ParameterRegistry {
            env_prefix: self.env_prefix,
            options: self.options,
        })
    }
}

impl ParameterRegistry {
    pub fn builder(env_prefix: impl Into<String>) -> RegistryBuilder {
        RegistryBuilder {
            env_prefix: env_prefix.into(),
            options: Vec::new(),
        }
    }

    pub fn env_prefix(&self) -> &str {
        &self.env_prefix
    }

    pub fn options(&self) -> &[OptionDescriptor] {
        &self.options
    }

    #[cfg(test)]
    pub(crate) fn get(&self, name: &str) -> Option<&OptionDescriptor> {
        self.options.iter().find(|option| option.name == name)
    }

    /// The names of the options declared as required, in declaration order.
    pub fn required_names(&self) -> Vec<&'static str> {
        self.options
            .iter()
            .filter(|option| option.required)
            .map(|option| option.name)
            .collect()
    }

    /// The environment variable consulted for `name`, e.g. `CLOUDABILITY_API_KEY`.
    pub fn env_key(&self, name: &str) -> String {
        format!("{}_{}", self.env_prefix, name).to_ascii_uppercase()
    }

    /// Builds a command exposing every option as a `--<name>` flag backed by its environment
    /// variable. Environment values are captured when the command is built.
    ///
    /// Values are kept as raw `OsString`s, typed conversion is left to the resolver.
    pub fn command(&self, name: &'static str) -> Command {
        self.options
            .iter()
            .fold(Command::new(name), |command, option| {
                command.arg(self.arg(option))
            })
    }

    fn arg(&self, option: &OptionDescriptor) -> Arg {
        let help = if option.required {
            format!("{} (required)", option.help)
        } else {
            option.help.to_owned()
        };

        let arg = Arg::new(option.name)
            .long(option.name)
            .env(self.env_key(option.name))
            .hide_env_values(option.secret)
            .value_name(option.value_name())
            .value_parser(ValueParser::os_string())
            .help(help)
            .action(ArgAction::Set)
            .default_value(option.default)
            .hide_default_value(option.default.is_empty());

        match option.kind {
            // `--insecure` alone means true, `--insecure=false` is accepted as well
            OptionKind::Bool => arg
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value("true"),
            _ => arg,
        }
    }
}
