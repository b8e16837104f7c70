use crate::config::ParameterRegistry;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_PREFIX: AtomicUsize = AtomicUsize::new(0);

/// A prefix no other test uses, so tests can set environment variables concurrently.
pub(crate) fn unique_env_prefix() -> String {
    format!(
        "metrics_agent_test_{}",
        NEXT_PREFIX.fetch_add(1, Ordering::Relaxed)
    )
}

/// Sets `<PREFIX>_<NAME>` for every `(name, value)` pair. Must run before the command is built.
pub(crate) fn set_env(registry: &ParameterRegistry, vars: &[(&str, &str)]) {
    for (name, value) in vars {
        std::env::set_var(registry.env_key(name), value);
    }
}
