use std::fmt;

/// The semantic type of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    String,
    Int,
    Uint,
    Bool,
}

impl OptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKind::String => "string",
            OptionKind::Int => "integer",
            OptionKind::Uint => "unsigned integer",
            OptionKind::Bool => "boolean",
        }
    }

    /// Converts raw flag, environment or default text into a typed value.
    pub fn parse(&self, raw: &str) -> Result<OptionValue, String> {
        match self {
            OptionKind::String => Ok(OptionValue::String(raw.to_owned())),
            OptionKind::Int => raw
                .parse::<i64>()
                .map(OptionValue::Int)
                .map_err(|_| "expected an integer".to_owned()),
            OptionKind::Uint => raw
                .parse::<u64>()
                .map(OptionValue::Uint)
                .map_err(|_| "expected a non-negative integer".to_owned()),
            OptionKind::Bool => parse_bool(raw).map(OptionValue::Bool).ok_or_else(|| {
                "expected a boolean (true/false, t/f, 1/0)".to_owned()
            }),
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// A typed option value produced during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    String(String),
    Int(i64),
    Uint(u64),
    Bool(bool),
}

impl OptionValue {
    pub fn kind(&self) -> OptionKind {
        match self {
            OptionValue::String(_) => OptionKind::String,
            OptionValue::Int(_) => OptionKind::Int,
            OptionValue::Uint(_) => OptionKind::Uint,
            OptionValue::Bool(_) => OptionKind::Bool,
        }
    }

    /// Whether the value counts as "present" for a required setting.
    pub fn is_set(&self) -> bool {
        match self {
            OptionValue::String(value) => !value.is_empty(),
            _ => true,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::String(value) => f.write_str(value),
            OptionValue::Int(value) => write!(f, "{value}"),
            OptionValue::Uint(value) => write!(f, "{value}"),
            OptionValue::Bool(value) => write!(f, "{value}"),
        }
    }
}
