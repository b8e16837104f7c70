use clap_derive::{Args, ValueEnum};
use color_eyre::eyre::{eyre, Result, WrapErr};
use tracing_subscriber::EnvFilter;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogFormat {
    Plain,
    Json,
}

#[derive(Args, Debug)]
#[group(skip)]
pub(crate) struct LoggingArgs {
    /// The log level or filter directives, e.g. info or metrics_agent=debug. RUST_LOG takes
    /// precedence when set
    #[arg(
        env = "CLOUDABILITY_LOG_LEVEL",
        long = "log_level",
        default_value = "info",
        global = true
    )]
    pub log_level: String,

    /// The log output format
    #[arg(
        env = "CLOUDABILITY_LOG_FORMAT",
        long = "log_format",
        value_enum,
        ignore_case = true,
        default_value_t = LogFormat::Plain,
        global = true
    )]
    pub log_format: LogFormat,
}

pub(crate) fn init(args: &LoggingArgs) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&args.log_level)
            .wrap_err_with(|| format!("invalid log level {:?}", args.log_level))?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match args.log_format {
        LogFormat::Plain => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|error| eyre!("unable to initialize logging: {error}"))
}
