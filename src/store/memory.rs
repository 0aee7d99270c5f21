//! In-memory quote store for tests and dry runs

use crate::core::synthetic::SyntheticAsset;
use crate::core::types::{AssetSelection, PercentChange, Quote};
use crate::store::EodStore;
use anyhow::{Result, bail};
use chrono::{Days, NaiveDate, Utc};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone)]
struct AssetRecord {
    ticker: String,
    #[allow(dead_code)]
    name: String,
}

/// Mirror of [`crate::store::SqliteStore`] over BTreeMaps. The ordered keys
/// give the same chronological and per-asset ordering as the SQL queries.
#[derive(Default)]
pub struct MemoryStore {
    assets: BTreeMap<String, AssetRecord>,
    quotes: BTreeMap<(String, NaiveDate), Quote>,
    /// When set, every write fails; lets tests exercise rollback paths.
    pub fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_asset(&mut self, asset_key: &str, ticker: &str, name: &str) {
        self.assets.insert(
            asset_key.to_string(),
            AssetRecord {
                ticker: ticker.to_string(),
                name: name.to_string(),
            },
        );
    }

    fn asset_quotes_desc(&self, asset_key: &str) -> Vec<Quote> {
        let mut quotes: Vec<Quote> = self
            .quotes
            .range((asset_key.to_string(), NaiveDate::MIN)..=(asset_key.to_string(), NaiveDate::MAX))
            .map(|(_, quote)| quote.clone())
            .collect();
        quotes.reverse();
        quotes
    }
}

impl EodStore for MemoryStore {
    fn select_assets(&self, selection: &AssetSelection) -> Result<Vec<String>> {
        match selection {
            AssetSelection::Recent => {
                let cutoff = Utc::now()
                    .date_naive()
                    .checked_sub_days(Days::new(2))
                    .unwrap_or_default();
                let mut keys: Vec<String> = self
                    .quotes
                    .values()
                    .filter(|q| {
                        q.event_date >= cutoff && (q.split_factor != 1.0 || q.dividend > 0.0)
                    })
                    .map(|q| q.asset_key.clone())
                    .collect();
                keys.dedup();
                Ok(keys)
            }
            AssetSelection::MissingAdjusted => {
                let mut keys: Vec<String> = self
                    .quotes
                    .values()
                    .filter(|q| q.adj_close.is_none())
                    .map(|q| q.asset_key.clone())
                    .collect();
                keys.dedup();
                Ok(keys)
            }
            AssetSelection::All => Ok(self.assets.keys().cloned().collect()),
            AssetSelection::Explicit(idents) => {
                let mut keys = Vec::new();
                for ident in idents {
                    let resolved = self
                        .assets
                        .iter()
                        .find(|(figi, rec)| figi.as_str() == ident.as_str() || rec.ticker == *ident)
                        .map(|(figi, _)| figi.clone());
                    match resolved {
                        Some(figi) => keys.push(figi),
                        None => {
                            warn!(ident = %ident, "could not resolve identifier to a composite figi; skipping")
                        }
                    }
                }
                Ok(keys)
            }
        }
    }

    fn quotes_desc(&self, asset_key: &str) -> Result<Vec<Quote>> {
        Ok(self.asset_quotes_desc(asset_key))
    }

    fn recent_quotes(&self, asset_key: &str, limit: usize) -> Result<Vec<Quote>> {
        let mut quotes = self.asset_quotes_desc(asset_key);
        quotes.truncate(limit);
        Ok(quotes)
    }

    fn adjusted_changes(&self, asset_key: &str) -> Result<Vec<PercentChange>> {
        let mut ascending = self.asset_quotes_desc(asset_key);
        ascending.reverse();

        let mut changes = Vec::new();
        let mut prev: Option<f64> = None;
        for quote in &ascending {
            if let (Some(curr), Some(prev)) = (quote.adj_close, prev) {
                changes.push(PercentChange {
                    date: quote.event_date,
                    percent: curr / prev,
                });
            }
            prev = quote.adj_close;
        }
        Ok(changes)
    }

    fn upsert_quotes(&mut self, quotes: &[Quote]) -> Result<()> {
        if self.fail_writes {
            bail!("simulated write failure");
        }
        for quote in quotes {
            self.quotes
                .insert((quote.asset_key.clone(), quote.event_date), quote.clone());
        }
        Ok(())
    }

    fn save_adjusted(&mut self, quotes: &[Quote]) -> Result<()> {
        if self.fail_writes {
            bail!("simulated write failure");
        }
        for quote in quotes {
            if let Some(existing) = self
                .quotes
                .get_mut(&(quote.asset_key.clone(), quote.event_date))
            {
                existing.adj_close = quote.adj_close;
            }
        }
        Ok(())
    }

    fn save_synthetic(&mut self, asset: &SyntheticAsset, quotes: &[Quote]) -> Result<()> {
        if self.fail_writes {
            bail!("simulated write failure");
        }
        self.upsert_asset(&asset.asset_key, &asset.symbol, &asset.name);
        self.upsert_quotes(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, day).unwrap()
    }

    fn quote(day: u32, adj_close: Option<f64>) -> Quote {
        Quote {
            event_date: date(day),
            asset_key: "BBG0TEST".to_string(),
            symbol: "TEST".to_string(),
            close: 1.0,
            adj_close,
            dividend: 0.0,
            split_factor: 1.0,
        }
    }

    #[test]
    fn adjusted_changes_match_the_lag_semantics() {
        let mut store = MemoryStore::new();
        store
            .upsert_quotes(&[
                quote(1, Some(10.0)),
                quote(2, Some(11.0)),
                quote(3, Some(5.5)),
            ])
            .unwrap();

        let changes = store.adjusted_changes("BBG0TEST").unwrap();
        assert_eq!(changes.len(), 2);
        assert!((changes[0].percent - 1.1).abs() < 1e-12);
        assert!((changes[1].percent - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rows_without_adjusted_close_break_the_chain() {
        let mut store = MemoryStore::new();
        store
            .upsert_quotes(&[quote(1, Some(10.0)), quote(2, None), quote(3, Some(5.0))])
            .unwrap();

        // Day 2 has no adjusted close, so neither day 2 nor day 3 has a
        // well-defined ratio.
        let changes = store.adjusted_changes("BBG0TEST").unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn select_assets_recent_requires_a_fresh_corporate_action() {
        let mut store = MemoryStore::new();
        let today = Utc::now().date_naive();
        let stale = today.checked_sub_days(Days::new(10)).unwrap();

        let mut split_today = quote(1, None);
        split_today.asset_key = "BBG0SPLIT".to_string();
        split_today.event_date = today;
        split_today.split_factor = 2.0;

        let mut quiet_today = quote(1, None);
        quiet_today.asset_key = "BBG0QUIET".to_string();
        quiet_today.event_date = today;

        let mut dividend_stale = quote(1, None);
        dividend_stale.asset_key = "BBG0STALE".to_string();
        dividend_stale.event_date = stale;
        dividend_stale.dividend = 0.5;

        store
            .upsert_quotes(&[split_today, quiet_today, dividend_stale])
            .unwrap();

        let keys = store.select_assets(&AssetSelection::Recent).unwrap();
        assert_eq!(keys, vec!["BBG0SPLIT".to_string()]);
    }

    #[test]
    fn quotes_are_keyed_by_asset_and_date() {
        let mut store = MemoryStore::new();
        store.upsert_quotes(&[quote(1, None)]).unwrap();
        store.upsert_quotes(&[quote(1, None)]).unwrap();
        assert_eq!(store.quotes_desc("BBG0TEST").unwrap().len(), 1);
    }
}
