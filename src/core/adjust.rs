//! CRSP back-adjustment of close prices
//!
//! Walks an asset's history from the most recent quote backwards, dividing
//! each raw close by a running adjustment factor that accumulates the
//! total-return effect of dividends and share splits.
//! See: http://crsp.org/products/documentation/crsp-calculations

use crate::core::types::Quote;
use tracing::debug;

/// Populates `adj_close` for a series ordered by event date descending.
///
/// The slice may span multiple assets (grouped, each newest-first); the
/// adjustment factor restarts at 1.0 whenever the asset key changes, so the
/// most recent quote of every asset keeps `adj_close == close`.
pub fn adjust_quotes(quotes: &mut [Quote]) {
    let mut current_key = String::new();
    let mut factor = 1.0_f64;

    for quote in quotes.iter_mut() {
        if current_key != quote.asset_key {
            debug!(asset_key = %quote.asset_key, "resetting adjustment factor");
            current_key = quote.asset_key.clone();
            factor = 1.0;
        }

        quote.adj_close = Some(quote.close / factor);

        if quote.close > 0.0 {
            factor *= (1.0 + quote.dividend / quote.close) * quote.split_factor;
        } else {
            // A non-positive close would poison every earlier date with a
            // division by zero or a sign flip; restart the walk instead.
            factor = 1.0;
        }
    }
}
