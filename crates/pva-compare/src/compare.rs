use pva_core::errors::{ErrorInfo, PvaError, PvaWarning};
use pva_core::RngHandle;
use pva_model::ModelVariant;
use pva_post::PointwiseLogLik;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ComparisonConfig;
use crate::loo::{psis_loo, LooSummary};
use crate::weights::{pseudo_bma_weights, stacking_weights};

/// One row of the ranked comparison table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    /// Model the row describes.
    pub variant: ModelVariant,
    /// Position in the table, starting at 1 for the lowest LOOIC.
    pub rank: usize,
    /// Leave-one-out information criterion.
    pub looic: f64,
    /// Standard error of the LOOIC.
    pub looic_se: f64,
    /// Difference to the best LOOIC in the table.
    pub delta_looic: f64,
    /// Leave-one-out expected log predictive density.
    pub elpd_loo: f64,
    /// Standard error of `elpd_loo`.
    pub elpd_se: f64,
    /// Effective number of parameters.
    pub p_loo: f64,
    /// Stacking weight.
    pub stacking_weight: f64,
    /// Pseudo-BMA weight.
    pub pseudo_bma_weight: f64,
    /// Largest Pareto shape across points.
    pub max_pareto_k: f64,
    /// Time indices whose Pareto shape exceeded the threshold.
    pub unreliable_indices: Vec<usize>,
}

/// Ranked model comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Rows ordered by ascending LOOIC.
    pub entries: Vec<ComparisonEntry>,
    /// Per-model PSIS-LOO detail in input order.
    pub loo: Vec<LooSummary>,
    /// Reliability warnings for points with a large Pareto shape.
    pub warnings: Vec<PvaWarning>,
}

impl Comparison {
    /// Lowest-LOOIC entry.
    pub fn best(&self) -> Option<&ComparisonEntry> {
        self.entries.first()
    }

    /// Entry of `variant`, if compared.
    pub fn entry(&self, variant: ModelVariant) -> Option<&ComparisonEntry> {
        self.entries.iter().find(|entry| entry.variant == variant)
    }

    /// Variants in rank order.
    pub fn ranking(&self) -> Vec<ModelVariant> {
        self.entries.iter().map(|entry| entry.variant).collect()
    }
}

/// Compares models from their pointwise log-likelihood matrices.
///
/// Every model must cover the same observed time indices. Large Pareto
/// shapes produce warnings, never errors.
pub fn compare(
    models: &[(ModelVariant, &PointwiseLogLik)],
    config: &ComparisonConfig,
) -> Result<Comparison, PvaError> {
    config.validate()?;
    let Some((_, reference)) = models.first() else {
        return Err(PvaError::Configuration(
            ErrorInfo::new("compare-empty", "no models to compare")
                .with_hint("fit at least one model before comparing"),
        ));
    };
    for (index, (variant, loglik)) in models.iter().enumerate() {
        if loglik.indices != reference.indices {
            return Err(PvaError::Configuration(
                ErrorInfo::new("compare-points", "models cover different observed points")
                    .with_context("model", variant.as_str())
                    .with_context("expected", reference.points().to_string())
                    .with_context("found", loglik.points().to_string()),
            ));
        }
        if models[..index].iter().any(|(other, _)| other == variant) {
            return Err(PvaError::Configuration(
                ErrorInfo::new("compare-duplicate", "model supplied more than once")
                    .with_context("model", variant.as_str()),
            ));
        }
    }

    let loo = models
        .iter()
        .map(|(variant, loglik)| psis_loo(*variant, loglik))
        .collect::<Result<Vec<_>, _>>()?;

    let mut warnings = Vec::new();
    for summary in &loo {
        let flagged = summary.unreliable_indices(config.k_threshold);
        if flagged.is_empty() {
            continue;
        }
        let indices: Vec<String> = flagged.iter().map(|index| index.to_string()).collect();
        let warning = PvaWarning::ComparisonReliability(
            ErrorInfo::new("pareto-k", "Pareto shape above threshold")
                .with_context("model", summary.variant.as_str())
                .with_context("indices", indices.join(","))
                .with_context("max_k", format!("{:.3}", summary.max_pareto_k()))
                .with_context("threshold", config.k_threshold.to_string()),
        );
        warn!(model = %summary.variant, %warning, "unreliable leave-one-out estimate");
        warnings.push(warning);
    }

    let elpd: Vec<Vec<f64>> = loo.iter().map(LooSummary::pointwise_elpd).collect();
    let stacking = stacking_weights(
        &elpd,
        config.stacking_max_iterations,
        config.stacking_tolerance,
    );
    let mut rng = RngHandle::from_seed(config.bootstrap_seed);
    let pseudo_bma = pseudo_bma_weights(
        &elpd,
        config.pseudo_bma,
        config.bootstrap_samples,
        &mut rng,
    );

    let mut entries: Vec<ComparisonEntry> = loo
        .iter()
        .enumerate()
        .map(|(index, summary)| ComparisonEntry {
            variant: summary.variant,
            rank: 0,
            looic: summary.looic,
            looic_se: summary.looic_se,
            delta_looic: 0.0,
            elpd_loo: summary.elpd_loo,
            elpd_se: summary.elpd_se,
            p_loo: summary.p_loo,
            stacking_weight: stacking[index],
            pseudo_bma_weight: pseudo_bma[index],
            max_pareto_k: summary.max_pareto_k(),
            unreliable_indices: summary.unreliable_indices(config.k_threshold),
        })
        .collect();
    entries.sort_by(|a, b| a.looic.total_cmp(&b.looic));
    let best = entries.first().map_or(0.0, |entry| entry.looic);
    for (position, entry) in entries.iter_mut().enumerate() {
        entry.rank = position + 1;
        entry.delta_looic = entry.looic - best;
    }
    if let Some(top) = entries.first() {
        info!(
            best = %top.variant,
            looic = top.looic,
            models = entries.len(),
            "model comparison finished"
        );
    }
    Ok(Comparison {
        entries,
        loo,
        warnings,
    })
}
