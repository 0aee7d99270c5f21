//! Command drivers for the eodman binary

pub mod adjust;
pub mod setup;
pub mod synthetic;
