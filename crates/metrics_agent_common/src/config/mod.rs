// SPDX-License-Identifier: AGPL-3.0-only
// Copyright Authors of metrics-agent

//! Option declaration, resolution and validation.
//!
//! A [`ParameterRegistry`] declares every recognized option once and publishes it as a clap flag
//! backed by an environment variable. The resolver merges flags, environment and the declared
//! defaults, in that order of precedence, and the validation gate rejects incomplete configurations before any
//! collection work starts.

mod error;
mod registry;
mod resolver;
#[cfg(test)]
pub(crate) mod testing;
mod validation;
mod value;

pub use error::{ConfigError, InvalidValue, SchemaError};
pub use registry::{OptionDescriptor, ParameterRegistry, RegistryBuilder};
pub use resolver::{resolve_values, ResolvedValue, ResolvedValues, Source};
pub use validation::{check_required_settings, Problem, Settings, ValidationError};
pub use value::{OptionKind, OptionValue};

/// The prefix of every environment variable consulted by the agent.
pub const ENV_PREFIX: &str = "cloudability";
