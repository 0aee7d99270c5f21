//! SQLite-backed quote store
//!
//! Owns the assets and eod tables. Dates are stored as ISO-8601 text so the
//! primary key (composite_figi, event_date) sorts chronologically.

use crate::core::synthetic::SyntheticAsset;
use crate::core::types::{AssetSelection, PercentChange, Quote};
use crate::store::EodStore;
use anyhow::{Context, Result};
use chrono::{Days, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use tracing::{debug, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS assets (
    composite_figi TEXT PRIMARY KEY,
    ticker TEXT NOT NULL,
    name TEXT NOT NULL,
    asset_type TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    listed_utc TEXT
);
CREATE TABLE IF NOT EXISTS eod (
    composite_figi TEXT NOT NULL,
    event_date TEXT NOT NULL,
    ticker TEXT,
    close REAL NOT NULL,
    adj_close REAL,
    dividend REAL NOT NULL DEFAULT 0.0,
    split_factor REAL NOT NULL DEFAULT 1.0,
    PRIMARY KEY (composite_figi, event_date)
);
";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path` and ensures the
    /// schema exists. Failure here is fatal to the run.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create data directory: {}", parent.display())
            })?;
        }
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("Failed to open database: {}", path.as_ref().display()))?;
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize database schema")?;
        debug!(path = %path.as_ref().display(), "opened quote database");
        Ok(SqliteStore { conn })
    }

    /// Registers a real (non-synthetic) asset. Used by ingestion and tests;
    /// idempotent on the composite FIGI.
    pub fn upsert_asset(&mut self, asset_key: &str, ticker: &str, name: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO assets (composite_figi, ticker, name, asset_type)
                 VALUES (?1, ?2, ?3, 'Common Stock')
                 ON CONFLICT (composite_figi) DO UPDATE SET ticker = excluded.ticker, name = excluded.name",
                params![asset_key, ticker, name],
            )
            .with_context(|| format!("Failed to upsert asset {asset_key}"))?;
        Ok(())
    }

    fn resolve_asset(&self, ident: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT composite_figi FROM assets WHERE ticker = ?1 OR composite_figi = ?1 LIMIT 1",
                params![ident],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to resolve asset identifier {ident}"))
    }

    fn distinct_keys(&self, sql: &str, bind: &[&dyn rusqlite::ToSql]) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(sql).context("Failed to prepare asset query")?;
        let rows = stmt
            .query_map(bind, |row| row.get::<_, String>(0))
            .context("Failed to query assets")?;
        let mut keys = Vec::new();
        for row in rows {
            keys.push(row.context("Failed to decode asset key")?);
        }
        Ok(keys)
    }

    fn quote_rows(
        &self,
        sql: &str,
        asset_key: &str,
        bind: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Quote>> {
        let mut stmt = self.conn.prepare(sql).context("Failed to prepare quote query")?;
        let rows = stmt
            .query_map(bind, |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, Option<f64>>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, f64>(5)?,
                ))
            })
            .with_context(|| format!("Failed to query quotes for {asset_key}"))?;

        let mut quotes = Vec::new();
        for row in rows {
            let (date_str, ticker, close, adj_close, dividend, split_factor) =
                row.with_context(|| format!("Failed to decode quote row for {asset_key}"))?;
            let event_date = parse_date(&date_str)
                .with_context(|| format!("Invalid event date for {asset_key}"))?;
            quotes.push(Quote {
                event_date,
                asset_key: asset_key.to_string(),
                symbol: ticker.unwrap_or_else(|| asset_key.to_string()),
                close,
                adj_close,
                dividend,
                split_factor,
            });
        }
        Ok(quotes)
    }
}

impl EodStore for SqliteStore {
    fn select_assets(&self, selection: &AssetSelection) -> Result<Vec<String>> {
        match selection {
            AssetSelection::Recent => {
                let cutoff = Utc::now()
                    .date_naive()
                    .checked_sub_days(Days::new(2))
                    .unwrap_or_default()
                    .format(DATE_FORMAT)
                    .to_string();
                self.distinct_keys(
                    "SELECT DISTINCT composite_figi FROM eod
                     WHERE event_date >= ?1 AND (split_factor != 1.0 OR dividend > 0.0)
                     ORDER BY composite_figi",
                    &[&cutoff],
                )
            }
            AssetSelection::MissingAdjusted => self.distinct_keys(
                "SELECT DISTINCT composite_figi FROM eod WHERE adj_close IS NULL
                 ORDER BY composite_figi",
                &[],
            ),
            AssetSelection::All => self.distinct_keys(
                "SELECT DISTINCT composite_figi FROM assets ORDER BY composite_figi",
                &[],
            ),
            AssetSelection::Explicit(idents) => {
                let mut keys = Vec::new();
                for ident in idents {
                    match self.resolve_asset(ident)? {
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
        self.quote_rows(
            "SELECT event_date, ticker, close, adj_close, dividend, split_factor
             FROM eod WHERE composite_figi = ?1 ORDER BY event_date DESC",
            asset_key,
            &[&asset_key],
        )
    }

    fn recent_quotes(&self, asset_key: &str, limit: usize) -> Result<Vec<Quote>> {
        self.quote_rows(
            "SELECT event_date, ticker, close, adj_close, dividend, split_factor
             FROM eod WHERE composite_figi = ?1 ORDER BY event_date DESC LIMIT ?2",
            asset_key,
            &[&asset_key, &(limit as i64)],
        )
    }

    fn adjusted_changes(&self, asset_key: &str) -> Result<Vec<PercentChange>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT event_date,
                        adj_close / (LAG(adj_close, 1) OVER (ORDER BY event_date ASC)) AS pct_change
                 FROM eod WHERE composite_figi = ?1 ORDER BY event_date ASC",
            )
            .context("Failed to prepare percent change query")?;
        let rows = stmt
            .query_map(params![asset_key], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<f64>>(1)?))
            })
            .with_context(|| format!("Failed to query percent changes for {asset_key}"))?;

        let mut changes = Vec::new();
        for row in rows {
            let (date_str, percent) =
                row.with_context(|| format!("Failed to decode percent change for {asset_key}"))?;
            // The earliest row has no predecessor; its NULL ratio is dropped,
            // never zero-filled.
            if let Some(percent) = percent {
                changes.push(PercentChange {
                    date: parse_date(&date_str)
                        .with_context(|| format!("Invalid event date for {asset_key}"))?,
                    percent,
                });
            }
        }
        Ok(changes)
    }

    fn upsert_quotes(&mut self, quotes: &[Quote]) -> Result<()> {
        let tx = self.conn.transaction().context("Failed to start transaction")?;
        for quote in quotes {
            tx.execute(
                "INSERT INTO eod (composite_figi, event_date, ticker, close, adj_close, dividend, split_factor)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT (composite_figi, event_date) DO UPDATE SET
                     ticker = excluded.ticker,
                     close = excluded.close,
                     adj_close = excluded.adj_close,
                     dividend = excluded.dividend,
                     split_factor = excluded.split_factor",
                params![
                    quote.asset_key,
                    format_date(quote.event_date),
                    quote.symbol,
                    quote.close,
                    quote.adj_close,
                    quote.dividend,
                    quote.split_factor,
                ],
            )
            .with_context(|| {
                format!(
                    "Failed to upsert quote {} {}",
                    quote.asset_key, quote.event_date
                )
            })?;
        }
        tx.commit().context("Failed to commit quote upserts")
    }

    fn save_adjusted(&mut self, quotes: &[Quote]) -> Result<()> {
        let tx = self.conn.transaction().context("Failed to start transaction")?;
        for quote in quotes {
            tx.execute(
                "UPDATE eod SET adj_close = ?1 WHERE composite_figi = ?2 AND event_date = ?3",
                params![
                    quote.adj_close,
                    quote.asset_key,
                    format_date(quote.event_date)
                ],
            )
            .with_context(|| {
                format!(
                    "Failed to save adjusted close for {} {}",
                    quote.asset_key, quote.event_date
                )
            })?;
        }
        tx.commit().context("Failed to commit adjusted closes")
    }

    fn save_synthetic(&mut self, asset: &SyntheticAsset, quotes: &[Quote]) -> Result<()> {
        let tx = self.conn.transaction().context("Failed to start transaction")?;
        tx.execute(
            "INSERT INTO assets (composite_figi, ticker, name, asset_type, active, listed_utc)
             VALUES (?1, ?2, ?3, 'Synthetic History', 1, ?4)
             ON CONFLICT (composite_figi) DO UPDATE SET
                 name = excluded.name,
                 listed_utc = excluded.listed_utc",
            params![
                asset.asset_key,
                asset.symbol,
                asset.name,
                format_date(asset.start_date)
            ],
        )
        .with_context(|| format!("Failed to upsert synthetic asset {}", asset.asset_key))?;

        for quote in quotes {
            tx.execute(
                "INSERT INTO eod (composite_figi, event_date, ticker, close, adj_close, dividend, split_factor)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0.0, 1.0)
                 ON CONFLICT (composite_figi, event_date) DO UPDATE SET
                     close = excluded.close,
                     adj_close = excluded.adj_close",
                params![
                    quote.asset_key,
                    format_date(quote.event_date),
                    quote.symbol,
                    quote.close,
                    quote.adj_close,
                ],
            )
            .with_context(|| {
                format!(
                    "Failed to save synthetic quote {} {}",
                    quote.asset_key, quote.event_date
                )
            })?;
        }
        tx.commit().context("Failed to commit synthetic history")
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .with_context(|| format!("Invalid date: {text}"))
}
