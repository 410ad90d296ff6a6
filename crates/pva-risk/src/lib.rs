#![deny(missing_docs)]

//! Forecast risk: the posterior probability that abundance falls below a
//! set of thresholds at a forecast step.

/// YAML configuration schema and defaults.
pub mod config;
/// Exceedance probabilities.
pub mod exceedance;

pub use config::{RiskConfig, DEFAULT_THRESHOLDS};
pub use exceedance::{
    at_index, evaluate, exceedance_probabilities, ExceedanceEntry, ExceedanceReport,
};
