use pva_core::errors::{ErrorInfo, PvaError};
use pva_model::ModelVariant;
use pva_post::PosteriorStore;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{validate_thresholds, RiskConfig};

/// Probability of falling below one threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExceedanceEntry {
    /// Natural-scale abundance threshold.
    pub threshold: f64,
    /// Fraction of draws strictly below `ln(threshold)`.
    pub probability: f64,
}

/// Risk evaluation of one model at one time step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceedanceReport {
    /// Model the draws came from.
    pub variant: ModelVariant,
    /// Zero-based time step evaluated.
    pub index: usize,
    /// Calendar year of the step.
    pub year: i32,
    /// One entry per threshold, in threshold order.
    pub entries: Vec<ExceedanceEntry>,
    /// Log-abundance draws the probabilities were computed from.
    pub draws: Vec<f64>,
}

impl ExceedanceReport {
    /// `(threshold, probability)` pairs.
    pub fn pairs(&self) -> Vec<(f64, f64)> {
        self.entries
            .iter()
            .map(|entry| (entry.threshold, entry.probability))
            .collect()
    }
}

/// Fraction of `draws` below the log of each threshold.
pub fn exceedance_probabilities(
    draws: &[f64],
    thresholds: &[f64],
) -> Result<Vec<ExceedanceEntry>, PvaError> {
    validate_thresholds(thresholds)?;
    if draws.is_empty() {
        return Err(PvaError::Configuration(ErrorInfo::new(
            "risk-draws-empty",
            "no forecast draws to evaluate",
        )));
    }
    if let Some(position) = draws.iter().position(|draw| !draw.is_finite()) {
        return Err(PvaError::Numerical(
            ErrorInfo::new("risk-draws", "forecast draw is not finite")
                .with_context("position", position.to_string()),
        ));
    }
    let total = draws.len() as f64;
    Ok(thresholds
        .iter()
        .map(|&threshold| {
            let log_threshold = threshold.ln();
            let below = draws.iter().filter(|&&draw| draw < log_threshold).count();
            ExceedanceEntry {
                threshold,
                probability: below as f64 / total,
            }
        })
        .collect())
}

/// Evaluates the configured step (the final forecast step by default).
pub fn evaluate(store: &PosteriorStore, config: &RiskConfig) -> Result<ExceedanceReport, PvaError> {
    let index = config.index.unwrap_or(store.series().len() - 1);
    at_index(store, index, &config.thresholds)
}

/// Evaluates any time step of a posterior store.
pub fn at_index(
    store: &PosteriorStore,
    index: usize,
    thresholds: &[f64],
) -> Result<ExceedanceReport, PvaError> {
    let draws = store.state_draws(index)?;
    let entries = exceedance_probabilities(&draws, thresholds)?;
    let year = store.series().points()[index].year;
    info!(
        model = %store.variant(),
        year,
        thresholds = entries.len(),
        "forecast risk evaluated"
    );
    Ok(ExceedanceReport {
        variant: store.variant(),
        index,
        year,
        entries,
        draws,
    })
}
