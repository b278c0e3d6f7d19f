use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use finquote::core::log::init_logging;
use finquote::core::{Interval, Period};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Explicit provider identifier (skips fallback resolution)
    #[arg(short, long, global = true)]
    provider: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch latest quotes for one or more symbols
    Quote {
        #[arg(required = true)]
        symbols: Vec<String>,
    },
    /// Fetch historical bars for a symbol
    Series {
        symbol: String,
        /// Range selector, e.g. 1d, 5d, 1mo, 1y, max
        #[arg(long, default_value = "1mo")]
        period: Period,
        /// Bar granularity, e.g. 1m, 1d, 1wk
        #[arg(long, default_value = "1d")]
        interval: Interval,
    },
    /// Fetch company metadata for a symbol
    Info { symbol: String },
    /// List registered provider identifiers
    Providers,
}

impl From<Commands> for finquote::AppCommand {
    fn from(cmd: Commands) -> finquote::AppCommand {
        match cmd {
            Commands::Quote { symbols } => finquote::AppCommand::Quote { symbols },
            Commands::Series {
                symbol,
                period,
                interval,
            } => finquote::AppCommand::Series {
                symbol,
                period,
                interval,
            },
            Commands::Info { symbol } => finquote::AppCommand::Info { symbol },
            Commands::Providers => finquote::AppCommand::Providers,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(cmd) => {
            finquote::run_command(
                cmd.into(),
                cli.config_path.as_deref(),
                cli.provider.as_deref(),
            )
            .await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
