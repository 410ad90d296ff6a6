//! Pareto smoothed importance sampling.
//!
//! The largest importance ratios are replaced by expected order statistics of
//! a generalized Pareto distribution fitted to the tail, then truncated at
//! `S^{3/4}` times the mean weight. The fitted shape `k̂` doubles as a
//! reliability diagnostic.

/// Smallest tail for which a Pareto fit is attempted.
pub const MIN_TAIL: usize = 5;

const GRID_MIN_POINTS: usize = 30;
const SHAPE_PRIOR: f64 = 3.0;
const WIP_PSEUDO_COUNT: f64 = 10.0;
const WIP_PRIOR_K: f64 = 0.5;

/// Smoothed and normalized log weights of one point.
#[derive(Debug, Clone, PartialEq)]
pub struct PsisResult {
    /// Log weights normalized so that their exponentials sum to one.
    pub log_weights: Vec<f64>,
    /// Estimated Pareto shape; infinite when the tail was too short to fit.
    pub pareto_k: f64,
}

/// Number of draws in the smoothed tail:
/// `⌈min(0.2 S, 3 √(S / r_eff))⌉`.
pub fn tail_length(draws: usize, r_eff: f64) -> usize {
    let s = draws as f64;
    (0.2 * s).min(3.0 * (s / r_eff).sqrt()).ceil() as usize
}

/// Numerically stable `ln Σ exp(values)`.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

/// Smooths the log importance ratios of one point.
pub fn psis_smooth(log_ratios: &[f64], r_eff: f64) -> PsisResult {
    let draws = log_ratios.len();
    let max = log_ratios.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut log_weights: Vec<f64> = log_ratios.iter().map(|lr| lr - max).collect();
    let tail = tail_length(draws, r_eff).min(draws.saturating_sub(1));

    let mut pareto_k = f64::INFINITY;
    if tail >= MIN_TAIL {
        let mut order: Vec<usize> = (0..draws).collect();
        order.sort_by(|&a, &b| log_weights[a].total_cmp(&log_weights[b]));
        let tail_ids = &order[draws - tail..];
        let cutoff = log_weights[order[draws - tail - 1]];
        let tail_values: Vec<f64> = tail_ids.iter().map(|&id| log_weights[id]).collect();
        let spread = tail_values[tail - 1] - tail_values[0];
        if spread.abs() > f64::EPSILON / 100.0 {
            let (k, smoothed) = smooth_tail(&tail_values, cutoff);
            pareto_k = k;
            if let Some(smoothed) = smoothed {
                for (&id, value) in tail_ids.iter().zip(smoothed) {
                    log_weights[id] = value;
                }
            }
        }
    }

    let upper = log_sum_exp(&log_weights) + 0.75 * (draws as f64).ln() - (draws as f64).ln();
    for weight in &mut log_weights {
        *weight = weight.min(upper);
    }
    let total = log_sum_exp(&log_weights);
    for weight in &mut log_weights {
        *weight -= total;
    }
    PsisResult {
        log_weights,
        pareto_k,
    }
}

/// Fits the tail above `cutoff` and returns its shape plus the smoothed log
/// values when the fit is usable. `tail` is sorted ascending.
fn smooth_tail(tail: &[f64], cutoff: f64) -> (f64, Option<Vec<f64>>) {
    let exp_cutoff = cutoff.exp();
    let excess: Vec<f64> = tail.iter().map(|value| value.exp() - exp_cutoff).collect();
    let (k, sigma) = gpd_fit(&excess);
    if !(k.is_finite() && sigma.is_finite()) {
        return (k, None);
    }
    let len = tail.len() as f64;
    let smoothed = (0..tail.len())
        .map(|j| {
            let p = (j as f64 + 0.5) / len;
            (gpd_quantile(p, k, sigma) + exp_cutoff).ln()
        })
        .collect();
    (k, Some(smoothed))
}

/// Zhang–Stephens empirical Bayes fit of a generalized Pareto distribution
/// with the weakly informative prior on the shape. `sorted` must be
/// ascending exceedances. Returns `(k, σ)`; `k` is infinite when the sample
/// is degenerate.
pub fn gpd_fit(sorted: &[f64]) -> (f64, f64) {
    let n = sorted.len();
    if n < 2 {
        return (f64::INFINITY, f64::NAN);
    }
    let largest = sorted[n - 1];
    let quartile = sorted[((n as f64 / 4.0 + 0.5).floor() as usize).max(1) - 1];
    if quartile.is_nan() || quartile <= 0.0 || largest <= 0.0 {
        return (f64::INFINITY, f64::NAN);
    }
    let grid = GRID_MIN_POINTS + (n as f64).sqrt().floor() as usize;
    let thetas: Vec<f64> = (1..=grid)
        .map(|j| {
            1.0 / largest
                + (1.0 - (grid as f64 / (j as f64 - 0.5)).sqrt()) / SHAPE_PRIOR / quartile
        })
        .collect();
    let profile: Vec<f64> = thetas
        .iter()
        .map(|&theta| {
            let k = mean_log1p(sorted, theta);
            n as f64 * ((-theta / k).ln() - k - 1.0)
        })
        .collect();
    let normaliser = log_sum_exp(&profile);
    let mut weights: Vec<f64> = profile.iter().map(|l| (l - normaliser).exp()).collect();
    for weight in &mut weights {
        if weight.is_nan() || *weight < 10.0 * f64::EPSILON {
            *weight = 0.0;
        }
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return (f64::INFINITY, f64::NAN);
    }
    let theta_hat = thetas
        .iter()
        .zip(&weights)
        .map(|(theta, weight)| theta * weight / total)
        .sum::<f64>();
    let k = mean_log1p(sorted, theta_hat);
    let sigma = -k / theta_hat;
    let n = n as f64;
    let k = (k * n + WIP_PSEUDO_COUNT * WIP_PRIOR_K) / (n + WIP_PSEUDO_COUNT);
    (k, sigma)
}

fn mean_log1p(values: &[f64], theta: f64) -> f64 {
    values.iter().map(|x| (-theta * x).ln_1p()).sum::<f64>() / values.len() as f64
}

/// Quantile function of the generalized Pareto distribution with location 0.
pub fn gpd_quantile(p: f64, k: f64, sigma: f64) -> f64 {
    if k.abs() < 1e-12 {
        -sigma * (-p).ln_1p()
    } else {
        sigma * (-k * (-p).ln_1p()).exp_m1() / k
    }
}
