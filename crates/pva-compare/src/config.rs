use std::fs;
use std::path::Path;

use pva_core::errors::{ErrorInfo, PvaError};
use serde::{Deserialize, Serialize};

/// YAML-configurable settings for model comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonConfig {
    /// Pareto shape above which a point's estimate is flagged as unreliable.
    #[serde(default = "default_k_threshold")]
    pub k_threshold: f64,
    /// Pseudo-BMA variant.
    #[serde(default)]
    pub pseudo_bma: PseudoBmaMethod,
    /// Bayesian bootstrap replicates for pseudo-BMA+.
    #[serde(default = "default_bootstrap_samples")]
    pub bootstrap_samples: usize,
    /// Seed of the bootstrap stream.
    #[serde(default = "default_bootstrap_seed")]
    pub bootstrap_seed: u64,
    /// Iteration cap of the stacking fixed point.
    #[serde(default = "default_stacking_iterations")]
    pub stacking_max_iterations: usize,
    /// Largest weight change at which stacking stops.
    #[serde(default = "default_stacking_tolerance")]
    pub stacking_tolerance: f64,
}

fn default_k_threshold() -> f64 {
    0.7
}

fn default_bootstrap_samples() -> usize {
    1_000
}

fn default_bootstrap_seed() -> u64 {
    0x00B0_075E_ED00_B0B0
}

fn default_stacking_iterations() -> usize {
    10_000
}

fn default_stacking_tolerance() -> f64 {
    1e-10
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            k_threshold: default_k_threshold(),
            pseudo_bma: PseudoBmaMethod::default(),
            bootstrap_samples: default_bootstrap_samples(),
            bootstrap_seed: default_bootstrap_seed(),
            stacking_max_iterations: default_stacking_iterations(),
            stacking_tolerance: default_stacking_tolerance(),
        }
    }
}

impl ComparisonConfig {
    /// Parses a configuration from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, PvaError> {
        serde_yaml::from_str(text).map_err(|err| PvaError::serde("comparison-config-parse", err))
    }

    /// Loads a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, PvaError> {
        let text = fs::read_to_string(path).map_err(|err| {
            PvaError::Serde(
                ErrorInfo::new("comparison-config-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Self::from_yaml_str(&text)
    }

    /// Rejects settings that cannot produce weights.
    pub fn validate(&self) -> Result<(), PvaError> {
        let invalid = |field: &str, value: String| {
            PvaError::Configuration(
                ErrorInfo::new("comparison-config", "invalid comparison setting")
                    .with_context("field", field)
                    .with_context("value", value),
            )
        };
        if !(self.k_threshold.is_finite() && self.k_threshold > 0.0) {
            return Err(invalid("k_threshold", self.k_threshold.to_string()));
        }
        if self.pseudo_bma == PseudoBmaMethod::BayesianBootstrap && self.bootstrap_samples == 0 {
            return Err(invalid("bootstrap_samples", "0".into()));
        }
        if self.stacking_max_iterations == 0 {
            return Err(invalid("stacking_max_iterations", "0".into()));
        }
        if !(self.stacking_tolerance.is_finite() && self.stacking_tolerance > 0.0) {
            return Err(invalid("stacking_tolerance", self.stacking_tolerance.to_string()));
        }
        Ok(())
    }
}

/// How pseudo-BMA weights are formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PseudoBmaMethod {
    /// Pseudo-BMA+: average of softmax weights over Bayesian bootstrap
    /// replicates of the pointwise elpd.
    #[default]
    BayesianBootstrap,
    /// Softmax of the total elpd.
    Plain,
}
