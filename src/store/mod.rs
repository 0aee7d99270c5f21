pub mod memory;
pub mod sqlite;

use crate::core::synthetic::SyntheticAsset;
use crate::core::types::{AssetSelection, PercentChange, Quote};
use anyhow::Result;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Persistence gateway for asset metadata and EOD quote rows.
///
/// Writes are transactional per call: one asset's update either lands
/// completely or not at all. Reads that fail abort only the asset being
/// processed; the surrounding batch carries on.
pub trait EodStore {
    /// Distinct composite FIGIs matching the selection. Explicit idents may
    /// be tickers or FIGIs; ones that resolve to nothing are logged and
    /// dropped rather than failing the run.
    fn select_assets(&self, selection: &AssetSelection) -> Result<Vec<String>>;

    /// Full quote series for one asset, newest first.
    fn quotes_desc(&self, asset_key: &str) -> Result<Vec<Quote>>;

    /// Bounded recent slice of the series, newest first.
    fn recent_quotes(&self, asset_key: &str, limit: usize) -> Result<Vec<Quote>>;

    /// Day-over-day ratios of the persisted adjusted closes, ascending by
    /// date. The earliest row has no predecessor and is excluded.
    fn adjusted_changes(&self, asset_key: &str) -> Result<Vec<PercentChange>>;

    /// Idempotent insert-or-update of full quote rows keyed by
    /// (asset_key, event_date), one all-or-nothing transaction.
    fn upsert_quotes(&mut self, quotes: &[Quote]) -> Result<()>;

    /// Writes back the adjusted closes for already-persisted rows in one
    /// transaction.
    fn save_adjusted(&mut self, quotes: &[Quote]) -> Result<()>;

    /// Upserts the asset record and its synthetic quote rows in a single
    /// transaction.
    fn save_synthetic(&mut self, asset: &SyntheticAsset, quotes: &[Quote]) -> Result<()>;
}
