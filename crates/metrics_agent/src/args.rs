use crate::logging::LoggingArgs;
use clap::{Command, CommandFactory};
use clap_derive::Parser;
use metrics_agent_common::config::ParameterRegistry;

/// Collects metrics from a Kubernetes cluster
#[derive(Parser, Debug)]
#[command(name = "metrics-agent", version, about)]
#[command(propagate_version = true, subcommand_required = true)]
pub(crate) struct Args {
    #[command(flatten, next_help_heading = "Logging options")]
    pub logging: LoggingArgs,
}

/// The root command. The `kubernetes` subcommand is generated from its option registry.
pub(crate) fn command(kubernetes: &ParameterRegistry) -> Command {
    Args::command().subcommand(crate::kubernetes::command(kubernetes))
}
