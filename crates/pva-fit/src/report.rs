use std::fs;
use std::path::Path;

use pva_compare::Comparison;
use pva_core::errors::{ErrorInfo, PvaError, PvaWarning};
use pva_core::SeriesShape;
use pva_mcmc::{ChainFailure, FitDiagnostics};
use pva_model::ModelVariant;
use pva_post::PosteriorSummary;
use pva_risk::ExceedanceReport;
use serde::{Deserialize, Serialize};

/// A model whose fit failed entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFailure {
    /// Model that failed.
    pub variant: ModelVariant,
    /// Error returned by the sampler.
    pub error: PvaError,
}

/// Sampler outcome of one successfully fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitRecord {
    /// Posterior summaries.
    pub summary: PosteriorSummary,
    /// Convergence diagnostics.
    pub diagnostics: FitDiagnostics,
    /// Chains dropped after numerical failures.
    pub failed_chains: Vec<ChainFailure>,
}

/// Serializable outcome of a full analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// RFC 3339 timestamp of report creation.
    pub created_at: String,
    /// Shape of the analysed series.
    pub shape: SeriesShape,
    /// Master seed the run derived every chain from.
    pub master_seed: u64,
    /// One record per fitted model, in configuration order.
    pub fits: Vec<FitRecord>,
    /// Models whose fit failed.
    pub failures: Vec<ModelFailure>,
    /// Ranked model comparison.
    pub comparison: Comparison,
    /// Forecast risk of the top-ranked model.
    pub risk: ExceedanceReport,
    /// Every warning raised along the way.
    pub warnings: Vec<PvaWarning>,
}

impl AnalysisReport {
    /// Writes the report as pretty JSON.
    pub fn write(&self, path: &Path) -> Result<(), PvaError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                PvaError::Serde(
                    ErrorInfo::new("report-mkdir", err.to_string())
                        .with_context("path", parent.display().to_string()),
                )
            })?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|err| PvaError::serde("report-serialize", err))?;
        fs::write(path, json).map_err(|err| {
            PvaError::Serde(
                ErrorInfo::new("report-write", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }

    /// Loads a report written by [`AnalysisReport::write`].
    pub fn load(path: &Path) -> Result<Self, PvaError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            PvaError::Serde(
                ErrorInfo::new("report-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        serde_json::from_str(&contents).map_err(|err| {
            PvaError::Serde(
                ErrorInfo::new("report-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }

    /// Record of `variant`, if it was fitted.
    pub fn fit(&self, variant: ModelVariant) -> Option<&FitRecord> {
        self.fits
            .iter()
            .find(|record| record.summary.variant == variant)
    }
}
