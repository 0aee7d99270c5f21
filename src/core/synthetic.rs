//! Synthetic index construction
//!
//! A synthetic asset splices percent-change segments from one or more source
//! instruments (file-based or already in the store) into a single continuous
//! price series. Components are ordered: as time advances, later components
//! supersede earlier ones at their cutover dates.

use crate::core::types::Quote;
use crate::sources::PercentChangeSource;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{error, info};

/// Every synthetic index starts from the same reference value so series are
/// comparable across assets.
pub const BASELINE_CLOSE: f64 = 10.0;

/// Where one component's percent changes come from. Exactly one case —
/// validated when the definitions document is deserialized, not at use time.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentSource {
    /// Delimited (date, adjClose) series on disk.
    File(PathBuf),
    /// Adjusted-close series persisted in the store, keyed by composite FIGI.
    Asset(String),
}

/// One segment of a synthetic asset's timeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawComponent")]
pub struct SyntheticComponent {
    pub name: String,
    pub source: ComponentSource,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct RawComponent {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    file: Option<PathBuf>,
    #[serde(default)]
    asset_key: Option<String>,
    #[serde(default)]
    valid_from: Option<NaiveDate>,
    #[serde(default)]
    valid_until: Option<NaiveDate>,
}

impl TryFrom<RawComponent> for SyntheticComponent {
    type Error = String;

    fn try_from(raw: RawComponent) -> Result<Self, Self::Error> {
        let source = match (raw.file, raw.asset_key) {
            (Some(file), None) => ComponentSource::File(file),
            (None, Some(asset_key)) => ComponentSource::Asset(asset_key),
            (Some(_), Some(_)) => {
                return Err("component must set only one of 'file' or 'asset_key'".to_string());
            }
            (None, None) => {
                return Err("component must set one of 'file' or 'asset_key'".to_string());
            }
        };
        let name = raw.name.unwrap_or_else(|| match &source {
            ComponentSource::File(path) => path.display().to_string(),
            ComponentSource::Asset(key) => key.clone(),
        });
        Ok(SyntheticComponent {
            name,
            source,
            valid_from: raw.valid_from,
            valid_until: raw.valid_until,
        })
    }
}

/// Configuration entity for one synthetic asset. Read-only input.
#[derive(Debug, Clone, Deserialize)]
pub struct SyntheticAsset {
    #[serde(default)]
    pub category: String,
    pub components: Vec<SyntheticComponent>,
    pub asset_key: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub symbol: String,
}

/// Parses a definitions document: a mapping of arbitrary key to asset.
///
/// An unreadable or unparseable document is fatal; a single malformed
/// definition (for example a component with zero or two source references)
/// is logged and that asset is dropped from the run. BTreeMap keeps
/// iteration order stable across runs.
pub fn load_definitions<P: AsRef<std::path::Path>>(
    path: P,
) -> Result<BTreeMap<String, SyntheticAsset>> {
    let doc = std::fs::read_to_string(path.as_ref()).with_context(|| {
        format!(
            "Failed to read synthetic definitions: {}",
            path.as_ref().display()
        )
    })?;
    let raw: BTreeMap<String, serde_yaml::Value> =
        serde_yaml::from_str(&doc).with_context(|| {
            format!(
                "Failed to parse synthetic definitions: {}",
                path.as_ref().display()
            )
        })?;

    let mut assets = BTreeMap::new();
    for (key, value) in raw {
        match serde_yaml::from_value::<SyntheticAsset>(value) {
            Ok(asset) => {
                assets.insert(key, asset);
            }
            Err(e) => {
                error!(error = %e, key = %key, "invalid synthetic asset definition; skipping")
            }
        }
    }
    Ok(assets)
}

/// A component source failed part-way through a build. Carries whatever
/// prefix of the new history had already been spliced; the caller decides
/// whether to keep or discard it.
#[derive(Debug)]
pub struct SpliceError {
    pub partial: Vec<Quote>,
    pub error: anyhow::Error,
}

impl std::fmt::Display for SpliceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "synthetic build failed after {} quotes: {}",
            self.partial.len(),
            self.error
        )
    }
}

impl std::error::Error for SpliceError {}

/// Builds the new quotes to append to `asset`'s synthetic history.
///
/// `prior` is a bounded recent slice of the persisted series, newest first.
/// When it is empty the series is seeded at `start_date` with
/// [`BASELINE_CLOSE`] and that seed is the first emitted quote.
pub fn build_history(
    asset: &SyntheticAsset,
    prior: &[Quote],
    source: &dyn PercentChangeSource,
) -> Result<Vec<Quote>, SpliceError> {
    let mut history: Vec<Quote> = Vec::new();

    let mut current = match prior.first() {
        Some(quote) => quote.clone(),
        None => {
            info!(symbol = %asset.symbol, close = BASELINE_CLOSE, "starting synthetic history at baseline");
            let seed = Quote::synthetic(
                asset.start_date,
                &asset.asset_key,
                &asset.symbol,
                BASELINE_CLOSE,
            );
            history.push(seed.clone());
            seed
        }
    };

    for component in &asset.components {
        // Fully superseded: the persisted series already covers this window.
        if component
            .valid_until
            .is_some_and(|end| end <= current.event_date)
        {
            continue;
        }

        let changes = match source
            .changes(component)
            .with_context(|| format!("component '{}' failed", component.name))
        {
            Ok(changes) => changes,
            Err(error) => {
                return Err(SpliceError {
                    partial: history,
                    error,
                });
            }
        };

        for change in changes {
            if change.date <= current.event_date {
                continue;
            }
            if component.valid_from.is_some_and(|from| change.date < from) {
                continue;
            }
            if component.valid_until.is_some_and(|end| change.date > end) {
                // Hard cutover: the next component takes over from here.
                info!(date = %change.date, component = %component.name, "component ended");
                break;
            }
            let close = current.close * change.percent;
            current = Quote::synthetic(change.date, &asset.asset_key, &asset.symbol, close);
            history.push(current.clone());
        }
    }

    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PercentChange;
    use anyhow::anyhow;
    use std::collections::HashMap;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, day).unwrap()
    }

    fn component(name: &str, valid_until: Option<NaiveDate>) -> SyntheticComponent {
        SyntheticComponent {
            name: name.to_string(),
            source: ComponentSource::Asset(format!("BBG_{name}")),
            valid_from: None,
            valid_until,
        }
    }

    fn asset(components: Vec<SyntheticComponent>) -> SyntheticAsset {
        SyntheticAsset {
            category: "index".to_string(),
            components,
            asset_key: "BBG0SYN".to_string(),
            name: "Test Synthetic".to_string(),
            start_date: date(1),
            symbol: "SYN".to_string(),
        }
    }

    /// Maps component name to its changes; a missing entry is an error.
    struct FakeSource {
        changes: HashMap<String, Vec<PercentChange>>,
    }

    impl PercentChangeSource for FakeSource {
        fn changes(&self, component: &SyntheticComponent) -> Result<Vec<PercentChange>> {
            self.changes
                .get(&component.name)
                .cloned()
                .ok_or_else(|| anyhow!("no data for component"))
        }
    }

    fn source(entries: &[(&str, &[(u32, f64)])]) -> FakeSource {
        FakeSource {
            changes: entries
                .iter()
                .map(|(name, points)| {
                    (
                        name.to_string(),
                        points
                            .iter()
                            .map(|&(day, percent)| PercentChange {
                                date: date(day),
                                percent,
                            })
                            .collect(),
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn seeds_at_baseline_without_prior_history() {
        let asset = asset(vec![component("a", None)]);
        let source = source(&[("a", &[(2, 1.1), (3, 1.0)])]);

        let history = build_history(&asset, &[], &source).unwrap();

        assert_eq!(history.len(), 3);
        assert_eq!(history[0].event_date, date(1));
        assert_eq!(history[0].close, BASELINE_CLOSE);
        assert_eq!(history[0].adj_close, Some(BASELINE_CLOSE));
        assert!((history[1].close - 11.0).abs() < 1e-12);
        assert!((history[2].close - 11.0).abs() < 1e-12);
    }

    #[test]
    fn seeds_from_most_recent_prior_quote() {
        let asset = asset(vec![component("a", None)]);
        let source = source(&[("a", &[(2, 1.1), (5, 2.0)])]);
        let prior = vec![
            Quote::synthetic(date(4), "BBG0SYN", "SYN", 20.0),
            Quote::synthetic(date(3), "BBG0SYN", "SYN", 19.0),
        ];

        let history = build_history(&asset, &prior, &source).unwrap();

        // No baseline quote, and points at or before the seed are dropped.
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].event_date, date(5));
        assert!((history[0].close - 40.0).abs() < 1e-12);
    }

    #[test]
    fn stops_consuming_a_component_at_valid_until() {
        let asset = asset(vec![
            component("old", Some(date(3))),
            component("new", None),
        ]);
        let source = source(&[
            ("old", &[(2, 1.1), (3, 1.2), (4, 9.9), (5, 9.9)]),
            ("new", &[(4, 1.5), (5, 1.0)]),
        ]);

        let history = build_history(&asset, &[], &source).unwrap();

        let dates: Vec<NaiveDate> = history.iter().map(|q| q.event_date).collect();
        assert_eq!(dates, vec![date(1), date(2), date(3), date(4), date(5)]);
        // 10.0 * 1.1 * 1.2 = 13.2 at the cutover, then the next component.
        assert!((history[2].close - 13.2).abs() < 1e-12);
        assert!((history[3].close - 19.8).abs() < 1e-12);
        assert!((history[4].close - 19.8).abs() < 1e-12);
    }

    #[test]
    fn skips_components_fully_superseded_by_prior_history() {
        let asset = asset(vec![
            component("old", Some(date(4))),
            component("new", None),
        ]);
        // "old" would fail if queried; valid_until on the seed date skips it.
        let source = source(&[("new", &[(5, 1.5)])]);
        let prior = vec![Quote::synthetic(date(4), "BBG0SYN", "SYN", 20.0)];

        let history = build_history(&asset, &prior, &source).unwrap();

        assert_eq!(history.len(), 1);
        assert!((history[0].close - 30.0).abs() < 1e-12);
    }

    #[test]
    fn respects_valid_from_bound() {
        let mut first = component("a", None);
        first.valid_from = Some(date(3));
        let asset = asset(vec![first]);
        let source = source(&[("a", &[(2, 5.0), (3, 1.1)])]);

        let history = build_history(&asset, &[], &source).unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history[1].event_date, date(3));
        assert!((history[1].close - 11.0).abs() < 1e-12);
    }

    #[test]
    fn surfaces_partial_history_on_source_failure() {
        let asset = asset(vec![component("a", Some(date(3))), component("missing", None)]);
        let source = source(&[("a", &[(2, 1.1)])]);

        let err = build_history(&asset, &[], &source).unwrap_err();

        // Baseline plus the one spliced quote survive for the caller.
        assert_eq!(err.partial.len(), 2);
        assert!(err.error.to_string().contains("missing"));
    }

    #[test]
    fn component_exclusivity_is_validated_at_parse_time() {
        let both = "name: x\nfile: a.csv\nasset_key: BBG1\n";
        let neither = "name: x\n";
        assert!(serde_yaml::from_str::<SyntheticComponent>(both).is_err());
        assert!(serde_yaml::from_str::<SyntheticComponent>(neither).is_err());

        let file_only = "file: a.csv\n";
        let parsed: SyntheticComponent = serde_yaml::from_str(file_only).unwrap();
        assert_eq!(parsed.source, ComponentSource::File(PathBuf::from("a.csv")));
        assert_eq!(parsed.name, "a.csv");
    }

    #[test]
    fn invalid_definitions_are_skipped_not_fatal() {
        let doc = r#"
good:
  asset_key: "BBG0GOOD"
  name: "Good"
  start_date: 2021-01-01
  symbol: "GOOD"
  components:
    - file: "a.csv"
bad:
  asset_key: "BBG0BAD"
  name: "Bad"
  start_date: 2021-01-01
  symbol: "BAD"
  components:
    - name: "no source set"
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, doc.as_bytes()).unwrap();

        let assets = load_definitions(file.path()).unwrap();
        assert_eq!(assets.len(), 1);
        assert!(assets.contains_key("good"));
    }

    #[test]
    fn definitions_document_parses_into_assets() {
        let doc = r#"
vfinx_spliced:
  category: "index"
  asset_key: "BBG0SYN"
  name: "S&P 500 spliced"
  start_date: 1970-01-02
  symbol: "SYN"
  components:
    - name: "historic file"
      file: "sp500.csv"
      valid_until: 1980-01-01
    - name: "live fund"
      asset_key: "BBG000BHTMY2"
"#;
        let assets: BTreeMap<String, SyntheticAsset> = serde_yaml::from_str(doc).unwrap();
        let asset = &assets["vfinx_spliced"];
        assert_eq!(asset.symbol, "SYN");
        assert_eq!(asset.components.len(), 2);
        assert_eq!(
            asset.components[0].valid_until,
            NaiveDate::from_ymd_opt(1980, 1, 1)
        );
        assert_eq!(
            asset.components[1].source,
            ComponentSource::Asset("BBG000BHTMY2".to_string())
        );
    }
}
