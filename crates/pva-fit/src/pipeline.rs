use std::sync::Arc;

use pva_compare::compare;
use pva_core::errors::{ErrorInfo, PvaError};
use pva_core::TimeSeries;
use pva_mcmc::{sample, SamplerRun};
use pva_model::{ModelVariant, StateSpaceModel};
use pva_post::{PointwiseLogLik, PosteriorStore};
use pva_risk::evaluate;
use rayon::prelude::*;
use tracing::{error, info};

use crate::config::AnalysisConfig;
use crate::report::{AnalysisReport, FitRecord, ModelFailure};

/// Sampler output of one model together with its pooled posterior.
#[derive(Debug, Clone)]
pub struct ModelFit {
    /// Model that was fitted.
    pub variant: ModelVariant,
    /// Raw chains and diagnostics.
    pub run: SamplerRun,
    /// Draws pooled across chains.
    pub store: PosteriorStore,
}

impl ModelFit {
    /// Pointwise log-likelihood matrix used for comparison.
    pub fn pointwise_log_likelihood(&self) -> PointwiseLogLik {
        self.store.pointwise_log_likelihood()
    }

    fn record(&self) -> FitRecord {
        FitRecord {
            summary: self.store.summary(),
            diagnostics: self.run.diagnostics.clone(),
            failed_chains: self.run.failures.clone(),
        }
    }
}

/// In-memory result of [`run_analysis`].
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Successful fits in configuration order.
    pub fits: Vec<ModelFit>,
    /// Serializable report.
    pub report: AnalysisReport,
}

impl Analysis {
    /// Fit of `variant`, if it succeeded.
    pub fn fit(&self, variant: ModelVariant) -> Option<&ModelFit> {
        self.fits.iter().find(|fit| fit.variant == variant)
    }
}

/// Samples one model and pools its draws.
pub fn fit_model(
    series: Arc<TimeSeries>,
    variant: ModelVariant,
    config: &AnalysisConfig,
) -> Result<ModelFit, PvaError> {
    let model = StateSpaceModel::new(variant, Arc::clone(&series), config.priors.clone())?;
    let run = sample(&model, &config.sampler)?;
    let store = PosteriorStore::from_run(&run, series)?;
    info!(model = %variant, draws = store.len(), "model fit complete");
    Ok(ModelFit {
        variant,
        run,
        store,
    })
}

/// Fits every configured model concurrently. Each model succeeds or fails
/// on its own; results keep configuration order.
pub fn fit_all(
    series: Arc<TimeSeries>,
    config: &AnalysisConfig,
) -> Vec<(ModelVariant, Result<ModelFit, PvaError>)> {
    config
        .models
        .par_iter()
        .map(|&variant| (variant, fit_model(Arc::clone(&series), variant, config)))
        .collect()
}

/// Fits, compares and evaluates forecast risk on the top-ranked model.
///
/// Configuration problems fail before any sampling starts. A model whose
/// chains all fail numerically is reported in
/// [`AnalysisReport::failures`] and left out of the comparison.
pub fn run_analysis(
    series: Arc<TimeSeries>,
    config: &AnalysisConfig,
) -> Result<Analysis, PvaError> {
    config.validate()?;
    info!(
        models = config.models.len(),
        observed = series.horizon(),
        total = series.len(),
        seed = config.sampler.seed_policy.master_seed,
        "analysis started"
    );

    let mut fits = Vec::with_capacity(config.models.len());
    let mut failures = Vec::new();
    for (variant, result) in fit_all(Arc::clone(&series), config) {
        match result {
            Ok(fit) => fits.push(fit),
            Err(err @ PvaError::Numerical(_)) => {
                error!(model = %variant, error = %err, "model fit failed");
                failures.push(ModelFailure {
                    variant,
                    error: err,
                });
            }
            Err(err) => return Err(err),
        }
    }
    if fits.is_empty() {
        return Err(PvaError::Numerical(
            ErrorInfo::new("analysis-no-fits", "every model fit failed")
                .with_context("failures", failures.len().to_string()),
        ));
    }

    let matrices: Vec<PointwiseLogLik> = fits
        .iter()
        .map(ModelFit::pointwise_log_likelihood)
        .collect();
    let inputs: Vec<(ModelVariant, &PointwiseLogLik)> = fits
        .iter()
        .zip(&matrices)
        .map(|(fit, matrix)| (fit.variant, matrix))
        .collect();
    let comparison = compare(&inputs, &config.comparison)?;

    let best = comparison
        .best()
        .and_then(|entry| fits.iter().find(|fit| fit.variant == entry.variant))
        .ok_or_else(|| {
            PvaError::numerical("analysis-ranking", "comparison produced no ranking")
        })?;
    let risk = evaluate(&best.store, &config.risk)?;

    let mut warnings = Vec::new();
    for fit in &fits {
        warnings.extend(fit.run.warnings.iter().cloned());
    }
    warnings.extend(comparison.warnings.iter().cloned());

    let report = AnalysisReport {
        created_at: chrono::Utc::now().to_rfc3339(),
        shape: series.shape(),
        master_seed: config.sampler.seed_policy.master_seed,
        fits: fits.iter().map(ModelFit::record).collect(),
        failures,
        comparison,
        risk,
        warnings,
    };
    if let Some(path) = &config.report_file {
        report.write(path)?;
    }
    info!(
        best = %best.variant,
        warnings = report.warnings.len(),
        "analysis finished"
    );
    Ok(Analysis { fits, report })
}
