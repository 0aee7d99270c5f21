//! The `synthetic` command: build and persist spliced synthetic indexes

use crate::core::synthetic::{build_history, load_definitions};
use crate::core::types::Quote;
use crate::sources::ComponentChangeSource;
use crate::store::EodStore;
use anyhow::Result;
use std::path::Path;
use tracing::{error, info};

/// How many persisted quotes seed an incremental build. Only the most recent
/// one is used; the rest give context when debugging.
const SEED_HISTORY_LIMIT: usize = 5;

/// Builds each synthetic asset in the definitions document, previewing
/// and/or persisting the result.
///
/// A malformed document is fatal; a failure on one asset (bad component
/// source, store error) is logged and that asset is skipped. A partially
/// built history is never persisted.
pub fn run<S: EodStore>(store: &mut S, definitions: &Path, print: bool, save: bool) -> Result<()> {
    let assets = load_definitions(definitions)?;

    for (key, asset) in &assets {
        info!(key = %key, symbol = %asset.symbol, asset_key = %asset.asset_key, "updating synthetic history");

        let prior = match store.recent_quotes(&asset.asset_key, SEED_HISTORY_LIMIT) {
            Ok(prior) => prior,
            Err(e) => {
                error!(error = %e, asset_key = %asset.asset_key, "could not load prior history");
                continue;
            }
        };

        let source = ComponentChangeSource::new(&*store);
        let quotes = match build_history(asset, &prior, &source) {
            Ok(quotes) => quotes,
            Err(splice) => {
                error!(
                    error = %splice.error,
                    built = splice.partial.len(),
                    asset_key = %asset.asset_key,
                    "could not build synthetic history; discarding partial result"
                );
                continue;
            }
        };

        if print {
            print_quotes(&quotes);
        }

        if save {
            if let Err(e) = store.save_synthetic(asset, &quotes) {
                error!(error = %e, asset_key = %asset.asset_key, "could not save synthetic history");
            }
        }
    }

    Ok(())
}

fn print_quotes(quotes: &[Quote]) {
    for quote in quotes {
        println!("{}", format_quote(quote));
    }
}

/// One preview line per quote, tab-separated:
/// `date(YYYY-MM-DD) \t symbol \t close \t adjClose`.
pub fn format_quote(quote: &Quote) -> String {
    format!(
        "{}\t{}\t{:.5}\t{:.5}",
        quote.event_date.format("%Y-%m-%d"),
        quote.symbol,
        quote.close,
        quote.adj_close.unwrap_or(quote.close)
    )
}
