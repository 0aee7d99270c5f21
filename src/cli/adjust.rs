//! The `adjust` command: back-adjust close prices for a selection of assets

use crate::core::adjust_quotes;
use crate::core::types::AssetSelection;
use crate::store::EodStore;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};

/// Adjusts every selected asset's series, one transaction per asset.
///
/// A failure while processing one asset is logged and that asset is skipped;
/// the batch never aborts on a per-asset error.
pub fn run<S: EodStore>(store: &mut S, selection: &AssetSelection) -> Result<()> {
    let assets = store
        .select_assets(selection)
        .context("Failed to select assets to adjust")?;
    info!(num_assets = assets.len(), "adjusting close prices");

    let pb = ProgressBar::new(assets.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    for asset_key in &assets {
        if let Err(e) = adjust_asset(store, asset_key) {
            error!(error = %e, asset_key = %asset_key, "could not adjust asset prices");
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(())
}

fn adjust_asset<S: EodStore>(store: &mut S, asset_key: &str) -> Result<()> {
    let mut quotes = store.quotes_desc(asset_key)?;
    if quotes.is_empty() {
        warn!(asset_key = %asset_key, "no quotes to adjust");
        return Ok(());
    }
    adjust_quotes(&mut quotes);
    store.save_adjusted(&quotes)
}
