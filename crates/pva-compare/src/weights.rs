use pva_core::RngHandle;
use rand_distr::{Distribution, Exp1};

use crate::config::PseudoBmaMethod;

/// Stacking weights maximizing `Σ_i ln Σ_k w_k exp(elpd[k][i])` over the
/// simplex, found with the EM fixed point `w_k ← mean_i(w_k p_ki / Σ_j w_j p_ji)`.
///
/// `elpd` holds one row of pointwise values per model; every row has the
/// same length.
pub fn stacking_weights(elpd: &[Vec<f64>], max_iterations: usize, tolerance: f64) -> Vec<f64> {
    let models = elpd.len();
    if models <= 1 {
        return vec![1.0; models];
    }
    let points = elpd[0].len();
    if points == 0 {
        return vec![1.0 / models as f64; models];
    }
    // Per-point rescaling leaves the objective's maximizer unchanged.
    let densities: Vec<Vec<f64>> = {
        let maxima: Vec<f64> = (0..points)
            .map(|i| elpd.iter().map(|row| row[i]).fold(f64::NEG_INFINITY, f64::max))
            .collect();
        elpd.iter()
            .map(|row| row.iter().zip(&maxima).map(|(value, max)| (value - max).exp()).collect())
            .collect()
    };

    let mut weights = vec![1.0 / models as f64; models];
    for _ in 0..max_iterations {
        let mut next = vec![0.0; models];
        for i in 0..points {
            let mixture: f64 = (0..models).map(|k| weights[k] * densities[k][i]).sum();
            if mixture <= 0.0 {
                continue;
            }
            for k in 0..models {
                next[k] += weights[k] * densities[k][i] / mixture;
            }
        }
        let total: f64 = next.iter().sum();
        if total <= 0.0 {
            break;
        }
        let change = next
            .iter_mut()
            .zip(&weights)
            .map(|(value, previous)| {
                *value /= total;
                (*value - previous).abs()
            })
            .fold(0.0, f64::max);
        weights = next;
        if change < tolerance {
            break;
        }
    }
    weights
}

/// Pseudo-BMA weights from pointwise elpd, one row per model.
///
/// The bootstrap variant draws Dirichlet(1, …, 1) point weights `α` as
/// normalized unit exponentials, scores model `k` by `n Σ_i α_i elpd[k][i]`
/// and averages the softmax of the scores over `samples` replicates.
pub fn pseudo_bma_weights(
    elpd: &[Vec<f64>],
    method: PseudoBmaMethod,
    samples: usize,
    rng: &mut RngHandle,
) -> Vec<f64> {
    let models = elpd.len();
    if models <= 1 {
        return vec![1.0; models];
    }
    match method {
        PseudoBmaMethod::Plain => {
            let totals: Vec<f64> = elpd.iter().map(|row| row.iter().sum()).collect();
            softmax(&totals)
        }
        PseudoBmaMethod::BayesianBootstrap => {
            let points = elpd[0].len();
            let mut average = vec![0.0; models];
            let mut alpha = vec![0.0; points];
            for _ in 0..samples {
                for value in &mut alpha {
                    *value = Exp1.sample(rng.inner_mut());
                }
                let total: f64 = alpha.iter().sum();
                let scores: Vec<f64> = elpd
                    .iter()
                    .map(|row| {
                        points as f64
                            * row.iter().zip(&alpha).map(|(e, a)| e * a / total).sum::<f64>()
                    })
                    .collect();
                for (acc, weight) in average.iter_mut().zip(softmax(&scores)) {
                    *acc += weight;
                }
            }
            let samples = samples.max(1) as f64;
            average.iter().map(|value| value / samples).collect()
        }
    }
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|score| (score - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.iter().map(|value| value / total).collect()
}
