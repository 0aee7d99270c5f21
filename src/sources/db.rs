//! Database-backed percent changes
//!
//! Thin adapter over the store's lag query so file- and database-sourced
//! components produce identical sequences for equivalent price series.

use crate::core::types::PercentChange;
use crate::store::EodStore;
use anyhow::{Context, Result};
use tracing::debug;

pub struct StoreChangeSource<'a, S: EodStore> {
    store: &'a S,
}

impl<'a, S: EodStore> StoreChangeSource<'a, S> {
    pub fn new(store: &'a S) -> Self {
        StoreChangeSource { store }
    }

    pub fn changes_for_asset(&self, asset_key: &str) -> Result<Vec<PercentChange>> {
        let changes = self
            .store
            .adjusted_changes(asset_key)
            .with_context(|| format!("Failed to load percent changes for {asset_key}"))?;
        debug!(asset_key = %asset_key, count = changes.len(), "read store-backed percent changes");
        Ok(changes)
    }
}
