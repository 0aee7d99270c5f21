use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use eodman::core::log::init_logging;
use eodman::core::types::AssetSelection;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Calculate adjusted eod prices
    Adjust {
        /// Tickers or composite FIGIs to adjust; default is all known assets
        idents: Vec<String>,
        /// Only assets with a split or dividend recorded in the last 2 days
        #[arg(short, long, conflicts_with_all = ["clean", "idents"])]
        recent: bool,
        /// Only assets that still have rows with a missing adjusted close
        #[arg(short, long, conflicts_with = "idents")]
        clean: bool,
    },
    /// Generate synthetic indexes based on spliced data
    Synthetic {
        /// YAML document of synthetic asset definitions
        definitions: PathBuf,
        /// Print EOD quotes to the screen
        #[arg(short, long)]
        print: bool,
        /// Save EOD quotes to the database
        #[arg(short, long)]
        save: bool,
    },
}

impl From<Commands> for eodman::AppCommand {
    fn from(cmd: Commands) -> eodman::AppCommand {
        match cmd {
            Commands::Adjust {
                idents,
                recent,
                clean,
            } => {
                let selection = if recent {
                    AssetSelection::Recent
                } else if clean {
                    AssetSelection::MissingAdjusted
                } else if !idents.is_empty() {
                    AssetSelection::Explicit(idents)
                } else {
                    AssetSelection::All
                };
                eodman::AppCommand::Adjust { selection }
            }
            Commands::Synthetic {
                definitions,
                print,
                save,
            } => eodman::AppCommand::Synthetic {
                definitions,
                print,
                save,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => eodman::cli::setup::setup(),
        Some(cmd) => eodman::run_command(cmd.into(), cli.config_path.as_deref()),
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
