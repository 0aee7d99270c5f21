//! Shared data model for EOD price maintenance

use chrono::NaiveDate;

/// One asset's price record for one trading date.
///
/// `adj_close` is `None` until the adjustment engine has populated it; every
/// other field is owned by upstream ingestion and treated as read-only here.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub event_date: NaiveDate,
    /// Canonical composite FIGI for the instrument. Tickers can be reused or
    /// renamed, so they are carried only for display.
    pub asset_key: String,
    pub symbol: String,
    pub close: f64,
    pub adj_close: Option<f64>,
    pub dividend: f64,
    pub split_factor: f64,
}

impl Quote {
    /// A synthetic-index quote: emitted already adjusted, no corporate events.
    pub fn synthetic(event_date: NaiveDate, asset_key: &str, symbol: &str, close: f64) -> Self {
        Quote {
            event_date,
            asset_key: asset_key.to_string(),
            symbol: symbol.to_string(),
            close,
            adj_close: Some(close),
            dividend: 0.0,
            split_factor: 1.0,
        }
    }
}

/// Ratio of adjusted close at `date` to the adjusted close of the immediately
/// preceding observation. The first observation of any series has no
/// predecessor and therefore no `PercentChange`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentChange {
    pub date: NaiveDate,
    pub percent: f64,
}

/// Which assets an adjust run operates on.
///
/// Passed explicitly into the driver; there is no process-wide selection
/// state.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetSelection {
    /// Assets with a split or dividend recorded within the last two days.
    Recent,
    /// Assets that still have rows with a missing adjusted close.
    MissingAdjusted,
    /// Explicit tickers or composite FIGIs, resolved by the store.
    Explicit(Vec<String>),
    /// Every asset known to the store.
    All,
}
