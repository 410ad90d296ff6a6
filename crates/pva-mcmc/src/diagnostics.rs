//! Multi-chain convergence diagnostics.
//!
//! Effective sample size follows the Geyer initial monotone sequence over the
//! chain-averaged autocorrelation; R-hat is the split-chain potential scale
//! reduction factor.

use indexmap::IndexMap;
use pva_core::errors::{ErrorInfo, PvaWarning};
use serde::{Deserialize, Serialize};

use crate::chain::Chain;
use crate::config::DiagnosticsConfig;

/// Diagnostics for one scalar quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterDiagnostics {
    /// Effective sample size across all chains.
    pub ess: f64,
    /// Split R-hat; `NaN` when fewer than two chains survive.
    pub rhat: f64,
}

/// Diagnostics for a whole model fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitDiagnostics {
    /// Hyperparameters in canonical order.
    pub parameters: IndexMap<String, ParameterDiagnostics>,
    /// One entry per latent state.
    pub states: Vec<ParameterDiagnostics>,
}

impl FitDiagnostics {
    /// Computes diagnostics for every hyperparameter and latent state.
    pub fn from_chains(chains: &[Chain]) -> Self {
        let mut parameters = IndexMap::new();
        if let Some(first) = chains.first().and_then(|chain| chain.draws.first()) {
            for (name, _) in first.params.named_values() {
                let traces: Vec<Vec<f64>> =
                    chains.iter().map(|chain| chain.parameter_trace(name)).collect();
                parameters.insert(name.to_string(), diagnose(&traces));
            }
        }
        let len = chains
            .first()
            .and_then(|chain| chain.draws.first())
            .map_or(0, |draw| draw.states.len());
        let states = (0..len)
            .map(|index| {
                let traces: Vec<Vec<f64>> =
                    chains.iter().map(|chain| chain.state_trace(index)).collect();
                diagnose(&traces)
            })
            .collect();
        Self { parameters, states }
    }

    /// Largest R-hat over every quantity, ignoring undefined values.
    pub fn max_rhat(&self) -> f64 {
        self.all()
            .map(|diag| diag.rhat)
            .filter(|rhat| rhat.is_finite())
            .fold(f64::NAN, f64::max)
    }

    /// Smallest ESS over every quantity.
    pub fn min_ess(&self) -> f64 {
        self.all().map(|diag| diag.ess).fold(f64::NAN, f64::min)
    }

    fn all(&self) -> impl Iterator<Item = &ParameterDiagnostics> {
        self.parameters.values().chain(self.states.iter())
    }

    /// Compares the diagnostics against thresholds and reports every breach
    /// as a non-convergence warning.
    pub fn assess(&self, thresholds: &DiagnosticsConfig) -> Vec<PvaWarning> {
        let mut warnings = Vec::new();
        for (name, diag) in &self.parameters {
            if let Some(info) = breach(name, diag, thresholds) {
                warnings.push(PvaWarning::NonConvergence(info));
            }
        }
        let offending: Vec<usize> = self
            .states
            .iter()
            .enumerate()
            .filter(|(_, diag)| breach("state", diag, thresholds).is_some())
            .map(|(index, _)| index)
            .collect();
        if !offending.is_empty() {
            let indices: Vec<String> = offending.iter().map(|index| index.to_string()).collect();
            warnings.push(PvaWarning::NonConvergence(
                ErrorInfo::new("latent-convergence", "latent states exceed diagnostic thresholds")
                    .with_context("indices", indices.join(","))
                    .with_context("max_rhat", format!("{:.4}", self.max_rhat()))
                    .with_context("min_ess", format!("{:.1}", self.min_ess())),
            ));
        }
        warnings
    }
}

fn breach(
    name: &str,
    diag: &ParameterDiagnostics,
    thresholds: &DiagnosticsConfig,
) -> Option<ErrorInfo> {
    if diag.rhat.is_nan() {
        return Some(
            ErrorInfo::new("rhat-undefined", "split R-hat needs two chains with four draws each")
                .with_context("parameter", name),
        );
    }
    if diag.rhat > thresholds.max_rhat {
        return Some(
            ErrorInfo::new("rhat", "split R-hat above threshold")
                .with_context("parameter", name)
                .with_context("rhat", format!("{:.4}", diag.rhat))
                .with_context("threshold", thresholds.max_rhat.to_string()),
        );
    }
    if diag.ess < thresholds.min_ess {
        return Some(
            ErrorInfo::new("ess", "effective sample size below threshold")
                .with_context("parameter", name)
                .with_context("ess", format!("{:.1}", diag.ess))
                .with_context("threshold", thresholds.min_ess.to_string()),
        );
    }
    None
}

/// ESS and split R-hat of one quantity given its per-chain traces.
pub fn diagnose(traces: &[Vec<f64>]) -> ParameterDiagnostics {
    let slices: Vec<&[f64]> = traces.iter().map(Vec::as_slice).collect();
    ParameterDiagnostics {
        ess: effective_sample_size(&slices),
        rhat: split_rhat(&slices),
    }
}

/// Multi-chain effective sample size.
///
/// Chains are truncated to the shortest length. A constant quantity is
/// treated as independent and returns the total draw count.
pub fn effective_sample_size(chains: &[&[f64]]) -> f64 {
    let n = chains.iter().map(|chain| chain.len()).min().unwrap_or(0);
    let m = chains.len();
    if m == 0 || n < 4 {
        return (m * n) as f64;
    }
    let chains: Vec<&[f64]> = chains.iter().map(|chain| &chain[..n]).collect();
    let total = (m * n) as f64;

    let means: Vec<f64> = chains.iter().map(|chain| mean(chain)).collect();
    let within = chains
        .iter()
        .zip(&means)
        .map(|(chain, &mu)| variance(chain, mu))
        .sum::<f64>()
        / m as f64;
    let between_over_n = if m > 1 { variance(&means, mean(&means)) } else { 0.0 };
    let var_plus = within * (n as f64 - 1.0) / n as f64 + between_over_n;
    if var_plus.is_nan() || var_plus <= 1e-300 {
        return total;
    }

    let rho = |lag: usize| -> f64 {
        let acov = chains
            .iter()
            .zip(&means)
            .map(|(chain, &mu)| autocovariance(chain, mu, lag))
            .sum::<f64>()
            / m as f64;
        1.0 - (within - acov) / var_plus
    };

    // Geyer initial positive and monotone sequence of paired sums.
    let mut tau = -1.0;
    let mut previous_pair = f64::INFINITY;
    let mut lag = 0;
    while lag + 1 < n {
        let pair = rho(lag) + rho(lag + 1);
        if pair <= 0.0 {
            break;
        }
        let pair = pair.min(previous_pair);
        tau += 2.0 * pair;
        previous_pair = pair;
        lag += 2;
    }
    let tau = tau.max(1.0 / total.log10().max(1.0));
    total / tau
}

/// Split R-hat: each chain is halved, then the potential scale reduction of
/// the resulting `2m` sequences is returned. `NaN` with fewer than two chains
/// or fewer than four draws per chain.
pub fn split_rhat(chains: &[&[f64]]) -> f64 {
    let n = chains.iter().map(|chain| chain.len()).min().unwrap_or(0);
    if chains.len() < 2 || n < 4 {
        return f64::NAN;
    }
    let half = n / 2;
    let halves: Vec<&[f64]> = chains
        .iter()
        .flat_map(|chain| [&chain[..half], &chain[n - half..n]])
        .collect();
    let means: Vec<f64> = halves.iter().map(|chain| mean(chain)).collect();
    let within = halves
        .iter()
        .zip(&means)
        .map(|(chain, &mu)| variance(chain, mu))
        .sum::<f64>()
        / halves.len() as f64;
    let between_over_n = variance(&means, mean(&means));
    if within <= 0.0 {
        return if between_over_n <= 0.0 { 1.0 } else { f64::INFINITY };
    }
    let var_plus = within * (half as f64 - 1.0) / half as f64 + between_over_n;
    (var_plus / within).sqrt()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance with the `n - 1` denominator.
fn variance(values: &[f64], mu: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / (values.len() - 1) as f64
}

fn autocovariance(values: &[f64], mu: f64, lag: usize) -> f64 {
    let n = values.len();
    if lag >= n {
        return 0.0;
    }
    (0..n - lag)
        .map(|i| (values[i] - mu) * (values[i + lag] - mu))
        .sum::<f64>()
        / n as f64
}
