use clap::{ArgMatches, Command};
use color_eyre::eyre;
use color_eyre::Section;
use metrics_agent_common::config::ParameterRegistry;
use metrics_agent_common::kubernetes::{KubeAgentConfig, REQUIRED_SETTINGS};
use tracing::info;

pub(crate) const COMMAND: &str = "kubernetes";

pub(crate) fn command(registry: &ParameterRegistry) -> Command {
    registry
        .command(COMMAND)
        .about("Collect Kubernetes metrics")
        .long_about("Command to collect Kubernetes metrics")
}

/// Resolves and validates the configuration. Nothing is collected unless this succeeds.
pub(crate) fn load_config(
    registry: &ParameterRegistry,
    matches: &ArgMatches,
) -> eyre::Result<KubeAgentConfig> {
    let config = KubeAgentConfig::resolve(registry, matches)
        .with_suggestion(|| settings_hint(registry))?;
    config
        .validate(REQUIRED_SETTINGS)
        .with_suggestion(|| settings_hint(registry))?;
    Ok(config)
}

fn settings_hint(registry: &ParameterRegistry) -> String {
    format!(
        "settings can be passed as --<name> flags or as {}_<NAME> environment variables",
        registry.env_prefix().to_ascii_uppercase()
    )
}

pub(crate) async fn main(registry: &ParameterRegistry, matches: &ArgMatches) -> eyre::Result<()> {
    let config = load_config(registry, matches)?;
    info!(?config, "configuration resolved");

    metrics_agent_kubernetes::collect_kube_metrics(config).await
}
