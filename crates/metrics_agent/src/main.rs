use clap::FromArgMatches;
use color_eyre::eyre::{self, bail};

mod args;
mod kubernetes;
mod logging;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let registry = metrics_agent_common::kubernetes::registry()?;
    let matches = args::command(&registry).get_matches();
    let args = args::Args::from_arg_matches(&matches)?;
    logging::init(&args.logging)?;

    match matches.subcommand() {
        Some((kubernetes::COMMAND, sub_matches)) => kubernetes::main(&registry, sub_matches).await,
        Some((name, _)) => bail!("unknown command {name}"),
        None => bail!("no command given, see --help for a list of commands"),
    }
}
