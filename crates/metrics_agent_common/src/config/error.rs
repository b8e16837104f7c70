use crate::config::resolver::Source;
use std::fmt;
use thiserror::Error;

/// Defects in the option schema itself. These are programmer errors and are expected to be caught
/// by tests or by the startup self-check, never by end users.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchemaError {
    #[error("option {0} is declared more than once")]
    DuplicateOption(String),
    #[error("option {option} has an invalid default {default:?}: {reason}")]
    InvalidDefault {
        option: String,
        default: String,
        reason: String,
    },
    #[error("option {0} is not declared")]
    UnknownOption(String),
    #[error("option {option} was read as {requested} but is declared as {declared}")]
    TypeMismatch {
        option: String,
        declared: &'static str,
        requested: &'static str,
    },
}

/// A single value that could not be converted to the declared type of its option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidValue {
    pub option: String,
    pub raw: String,
    pub origin: Source,
    pub reason: String,
}

impl fmt::Display for InvalidValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid value {:?} for {} (from {}): {}",
            self.raw, self.option, self.origin, self.reason
        )
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("schema error")]
    Schema(#[from] SchemaError),
    #[error("{}", join_invalid(.0))]
    InvalidValues(Vec<InvalidValue>),
}

impl ConfigError {
    /// The names of the options whose values could not be parsed.
    pub fn invalid_options(&self) -> Vec<&str> {
        match self {
            ConfigError::InvalidValues(values) => {
                values.iter().map(|value| value.option.as_str()).collect()
            }
            ConfigError::Schema(_) => Vec::new(),
        }
    }
}

fn join_invalid(values: &[InvalidValue]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
