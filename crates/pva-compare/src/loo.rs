use pva_core::errors::{ErrorInfo, PvaError};
use pva_mcmc::effective_sample_size;
use pva_model::ModelVariant;
use pva_post::PointwiseLogLik;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::psis::{log_sum_exp, psis_smooth};

/// Leave-one-out result for one observed time step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointwiseLoo {
    /// Zero-based time index of the observation.
    pub index: usize,
    /// Leave-one-out expected log predictive density.
    pub elpd: f64,
    /// Effective number of parameters contributed by the point.
    pub p_loo: f64,
    /// Pareto shape of the smoothed importance weights.
    pub pareto_k: f64,
    /// Relative efficiency used for the tail length.
    pub r_eff: f64,
}

/// PSIS-LOO estimate for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LooSummary {
    /// Model the estimate belongs to.
    pub variant: ModelVariant,
    /// Sum of pointwise elpd.
    pub elpd_loo: f64,
    /// Standard error of `elpd_loo`.
    pub elpd_se: f64,
    /// Effective number of parameters.
    pub p_loo: f64,
    /// `-2 · elpd_loo`; lower is better.
    pub looic: f64,
    /// Standard error of `looic`.
    pub looic_se: f64,
    /// Per-point values in column order.
    pub pointwise: Vec<PointwiseLoo>,
}

impl LooSummary {
    /// Pointwise elpd values in column order.
    pub fn pointwise_elpd(&self) -> Vec<f64> {
        self.pointwise.iter().map(|point| point.elpd).collect()
    }

    /// Largest Pareto shape over every point.
    pub fn max_pareto_k(&self) -> f64 {
        self.pointwise
            .iter()
            .map(|point| point.pareto_k)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Time indices whose Pareto shape exceeds `threshold`.
    pub fn unreliable_indices(&self, threshold: f64) -> Vec<usize> {
        self.pointwise
            .iter()
            .filter(|point| point.pareto_k.is_nan() || point.pareto_k > threshold)
            .map(|point| point.index)
            .collect()
    }
}

/// Relative efficiency of `exp(column)`: chain-aware ESS divided by the draw
/// count. Falls back to 1 when the ESS is undefined.
pub fn relative_efficiency(column: &[f64], rows_by_chain: &[Vec<usize>]) -> f64 {
    let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let chains: Vec<Vec<f64>> = rows_by_chain
        .iter()
        .map(|rows| rows.iter().map(|&row| (column[row] - max).exp()).collect())
        .collect();
    let slices: Vec<&[f64]> = chains.iter().map(Vec::as_slice).collect();
    let ess = effective_sample_size(&slices);
    let r_eff = ess / column.len() as f64;
    if r_eff.is_finite() && r_eff > 0.0 {
        r_eff
    } else {
        1.0
    }
}

/// Pareto smoothed importance sampling leave-one-out estimate of `loglik`.
pub fn psis_loo(variant: ModelVariant, loglik: &PointwiseLogLik) -> Result<LooSummary, PvaError> {
    let draws = loglik.draws();
    let points = loglik.points();
    if draws < 2 || points == 0 {
        return Err(PvaError::Configuration(
            ErrorInfo::new("loo-shape", "log-likelihood matrix is too small")
                .with_context("model", variant.as_str())
                .with_context("draws", draws.to_string())
                .with_context("points", points.to_string()),
        ));
    }
    if let Some((row, _)) = loglik
        .values
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != points || row.iter().any(|value| !value.is_finite()))
    {
        return Err(PvaError::Numerical(
            ErrorInfo::new("loo-loglik", "log-likelihood row is malformed or not finite")
                .with_context("model", variant.as_str())
                .with_context("row", row.to_string()),
        ));
    }

    let rows_by_chain = loglik.rows_by_chain();
    let ln_draws = (draws as f64).ln();
    let pointwise: Vec<PointwiseLoo> = (0..points)
        .into_par_iter()
        .map(|point| {
            let column = loglik.column(point);
            let r_eff = relative_efficiency(&column, &rows_by_chain);
            let log_ratios: Vec<f64> = column.iter().map(|ll| -ll).collect();
            let smoothed = psis_smooth(&log_ratios, r_eff);
            let weighted: Vec<f64> = smoothed
                .log_weights
                .iter()
                .zip(&column)
                .map(|(lw, ll)| lw + ll)
                .collect();
            let elpd = log_sum_exp(&weighted);
            let lpd = log_sum_exp(&column) - ln_draws;
            PointwiseLoo {
                index: loglik.indices[point],
                elpd,
                p_loo: lpd - elpd,
                pareto_k: smoothed.pareto_k,
                r_eff,
            }
        })
        .collect();

    let n = points as f64;
    let elpd_loo: f64 = pointwise.iter().map(|point| point.elpd).sum();
    let mean = elpd_loo / n;
    let variance = if points > 1 {
        pointwise
            .iter()
            .map(|point| (point.elpd - mean) * (point.elpd - mean))
            .sum::<f64>()
            / (n - 1.0)
    } else {
        0.0
    };
    let elpd_se = (n * variance).sqrt();
    Ok(LooSummary {
        variant,
        elpd_loo,
        elpd_se,
        p_loo: pointwise.iter().map(|point| point.p_loo).sum(),
        looic: -2.0 * elpd_loo,
        looic_se: 2.0 * elpd_se,
        pointwise,
    })
}
