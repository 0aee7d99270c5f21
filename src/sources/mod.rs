//! Percent-change sources for synthetic asset components
//!
//! Each source yields an ascending-by-date sequence of day-over-day adjusted
//! close ratios for one component. The first observation of any underlying
//! series has no predecessor and is never emitted.

pub mod db;
pub mod file;

use crate::core::synthetic::{ComponentSource, SyntheticComponent};
use crate::core::types::PercentChange;
use crate::store::EodStore;
use anyhow::Result;

pub use db::StoreChangeSource;
pub use file::read_percent_changes;

pub trait PercentChangeSource {
    /// Ascending-by-date percent changes for one component.
    fn changes(&self, component: &SyntheticComponent) -> Result<Vec<PercentChange>>;
}

/// Production source: dispatches on the component's tagged source variant,
/// reading either a CSV series from disk or the persisted adjusted closes.
pub struct ComponentChangeSource<'a, S: EodStore> {
    store: &'a S,
}

impl<'a, S: EodStore> ComponentChangeSource<'a, S> {
    pub fn new(store: &'a S) -> Self {
        ComponentChangeSource { store }
    }
}

impl<S: EodStore> PercentChangeSource for ComponentChangeSource<'_, S> {
    fn changes(&self, component: &SyntheticComponent) -> Result<Vec<PercentChange>> {
        match &component.source {
            ComponentSource::File(path) => file::read_percent_changes(path),
            ComponentSource::Asset(asset_key) => {
                StoreChangeSource::new(self.store).changes_for_asset(asset_key)
            }
        }
    }
}
