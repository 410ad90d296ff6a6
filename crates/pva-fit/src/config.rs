use std::fs;
use std::path::{Path, PathBuf};

use pva_compare::ComparisonConfig;
use pva_core::errors::{ErrorInfo, PvaError};
use pva_mcmc::SamplerConfig;
use pva_model::{ModelVariant, Priors};
use pva_risk::RiskConfig;
use serde::{Deserialize, Serialize};

/// Everything an analysis run needs besides the series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Models to fit; all three by default.
    #[serde(default = "default_models")]
    pub models: Vec<ModelVariant>,
    /// Sampler settings shared by every model.
    #[serde(default)]
    pub sampler: SamplerConfig,
    /// Prior hyperparameters.
    #[serde(default)]
    pub priors: Priors,
    /// Model comparison settings.
    #[serde(default)]
    pub comparison: ComparisonConfig,
    /// Forecast risk settings.
    #[serde(default)]
    pub risk: RiskConfig,
    /// JSON report destination; nothing is written when unset.
    #[serde(default)]
    pub report_file: Option<PathBuf>,
}

fn default_models() -> Vec<ModelVariant> {
    ModelVariant::ALL.to_vec()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            models: default_models(),
            sampler: SamplerConfig::default(),
            priors: Priors::default(),
            comparison: ComparisonConfig::default(),
            risk: RiskConfig::default(),
            report_file: None,
        }
    }
}

impl AnalysisConfig {
    /// Parses a configuration from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, PvaError> {
        serde_yaml::from_str(text).map_err(|err| PvaError::serde("analysis-config-parse", err))
    }

    /// Loads a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, PvaError> {
        let text = fs::read_to_string(path).map_err(|err| {
            PvaError::Serde(
                ErrorInfo::new("analysis-config-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Self::from_yaml_str(&text)
    }

    /// Validates every section so that bad settings fail before sampling.
    pub fn validate(&self) -> Result<(), PvaError> {
        if self.models.is_empty() {
            return Err(PvaError::Configuration(
                ErrorInfo::new("analysis-models", "no models selected")
                    .with_hint("list at least one of level, drift, gompertz"),
            ));
        }
        if let Some(duplicate) = self
            .models
            .iter()
            .enumerate()
            .find(|(index, variant)| self.models[..*index].contains(variant))
            .map(|(_, variant)| variant)
        {
            return Err(PvaError::Configuration(
                ErrorInfo::new("analysis-models", "model selected more than once")
                    .with_context("model", duplicate.as_str()),
            ));
        }
        self.sampler.validate()?;
        self.priors.validate()?;
        self.comparison.validate()?;
        self.risk.validate()
    }
}
