//! Core business logic abstractions

pub mod adjust;
pub mod config;
pub mod log;
pub mod synthetic;
pub mod types;

// Re-export main types for cleaner imports
pub use adjust::adjust_quotes;
pub use synthetic::{ComponentSource, SpliceError, SyntheticAsset, SyntheticComponent};
pub use types::{AssetSelection, PercentChange, Quote};
