use std::fs;
use std::path::Path;

use pva_core::errors::{ErrorInfo, PvaError};
use serde::{Deserialize, Serialize};

/// Abundance thresholds evaluated when none are configured.
pub const DEFAULT_THRESHOLDS: [f64; 5] = [
    200_000.0,
    1_000_000.0,
    3_000_000.0,
    5_000_000.0,
    12_800_000.0,
];

/// YAML-configurable settings for forecast risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Natural-scale abundance thresholds, strictly increasing.
    #[serde(default = "default_thresholds")]
    pub thresholds: Vec<f64>,
    /// Zero-based time step to evaluate; the final step when unset.
    #[serde(default)]
    pub index: Option<usize>,
}

fn default_thresholds() -> Vec<f64> {
    DEFAULT_THRESHOLDS.to_vec()
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            thresholds: default_thresholds(),
            index: None,
        }
    }
}

impl RiskConfig {
    /// Parses a configuration from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, PvaError> {
        serde_yaml::from_str(text).map_err(|err| PvaError::serde("risk-config-parse", err))
    }

    /// Loads a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, PvaError> {
        let text = fs::read_to_string(path).map_err(|err| {
            PvaError::Serde(
                ErrorInfo::new("risk-config-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Self::from_yaml_str(&text)
    }

    /// Checks that every threshold is finite, positive and larger than the
    /// one before it.
    pub fn validate(&self) -> Result<(), PvaError> {
        validate_thresholds(&self.thresholds)
    }
}

pub(crate) fn validate_thresholds(thresholds: &[f64]) -> Result<(), PvaError> {
    if thresholds.is_empty() {
        return Err(PvaError::Configuration(
            ErrorInfo::new("threshold-empty", "no abundance thresholds given")
                .with_hint("use the default thresholds or list at least one"),
        ));
    }
    for (position, &threshold) in thresholds.iter().enumerate() {
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(PvaError::Configuration(
                ErrorInfo::new("threshold-value", "thresholds must be finite and positive")
                    .with_context("position", position.to_string())
                    .with_context("value", threshold.to_string()),
            ));
        }
        if position > 0 && threshold <= thresholds[position - 1] {
            return Err(PvaError::Configuration(
                ErrorInfo::new("threshold-order", "thresholds must be strictly increasing")
                    .with_context("position", position.to_string())
                    .with_context("value", threshold.to_string()),
            ));
        }
    }
    Ok(())
}
