#![deny(missing_docs)]
//! Fit pipeline: samples every model, compares them and evaluates forecast
//! risk on the best one.

/// Top-level YAML analysis configuration.
pub mod config;
/// Concurrent model fitting and the analysis entry point.
pub mod pipeline;
/// Serializable analysis report.
pub mod report;

pub use config::AnalysisConfig;
pub use pipeline::{fit_all, fit_model, run_analysis, Analysis, ModelFit};
pub use report::{AnalysisReport, FitRecord, ModelFailure};
