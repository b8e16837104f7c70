use crate::config::error::SchemaError;
use crate::config::value::OptionValue;
use std::fmt;
use thiserror::Error;

/// A resolved configuration whose fields can be looked up by option name.
pub trait Settings {
    fn value_of(&self, name: &str) -> Option<OptionValue>;
}

/// A single reason a configuration was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    /// A required option is unset or empty
    Missing { option: String },
    /// A value is well-typed but outside of what the option accepts
    Invalid { option: String, reason: String },
    /// Two options contradict each other
    Conflict {
        option: String,
        other: String,
        reason: String,
    },
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::Missing { option } => write!(f, "missing required setting {option}"),
            Problem::Invalid { option, reason } => write!(f, "{option} {reason}"),
            Problem::Conflict {
                option,
                other,
                reason,
            } => write!(f, "{option} and {other} {reason}"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("schema error")]
    Schema(#[from] SchemaError),
    #[error("invalid configuration: {}", join_problems(.0))]
    Rejected(Vec<Problem>),
}

impl ValidationError {
    pub fn problems(&self) -> &[Problem] {
        match self {
            ValidationError::Rejected(problems) => problems,
            ValidationError::Schema(_) => &[],
        }
    }

    /// The names of the required options that were left unset.
    pub fn missing(&self) -> Vec<&str> {
        self.problems()
            .iter()
            .filter_map(|problem| match problem {
                Problem::Missing { option } => Some(option.as_str()),
                _ => None,
            })
            .collect()
    }
}

fn join_problems(problems: &[Problem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Returns a [Problem::Missing] for every name in `required` that is unset in `settings`.
///
/// Naming an option the settings do not know about is a schema defect and fails the whole check.
pub fn check_required_settings(
    settings: &impl Settings,
    required: &[&str],
) -> Result<Vec<Problem>, SchemaError> {
    let mut problems = Vec::new();
    for &name in required {
        let value = settings
            .value_of(name)
            .ok_or_else(|| SchemaError::UnknownOption(name.to_owned()))?;
        if !value.is_set() {
            problems.push(Problem::Missing {
                option: name.to_owned(),
            });
        }
    }
    Ok(problems)
}
