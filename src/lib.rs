pub mod cli;
pub mod core;
pub mod sources;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::types::AssetSelection;
use crate::store::SqliteStore;
use anyhow::Result;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Back-adjust close prices for the selected assets.
    Adjust { selection: AssetSelection },
    /// Build synthetic indexes from a definitions document.
    Synthetic {
        definitions: PathBuf,
        print: bool,
        save: bool,
    },
}

pub fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("EOD maintenance starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    // Setup failures (no database, bad config) are fatal; everything past
    // this point recovers per-asset.
    let mut store = SqliteStore::open(config.database_path()?)?;

    match command {
        AppCommand::Adjust { selection } => cli::adjust::run(&mut store, &selection),
        AppCommand::Synthetic {
            definitions,
            print,
            save,
        } => cli::synthetic::run(&mut store, &definitions, print, save),
    }
}
