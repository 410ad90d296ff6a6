use serde::{Deserialize, Serialize};

/// Probability levels reported for every time step.
pub const QUANTILE_LEVELS: [f64; 7] = [0.025, 0.05, 0.20, 0.50, 0.80, 0.95, 0.975];

/// Quantile of already sorted values using linear interpolation between
/// order statistics (`h = (n - 1) p`). `NaN` for an empty slice.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let h = (n - 1) as f64 * p.clamp(0.0, 1.0);
            let lower = h.floor() as usize;
            let upper = (lower + 1).min(n - 1);
            sorted[lower] + (h - lower as f64) * (sorted[upper] - sorted[lower])
        }
    }
}

/// Sorts a copy of `values` and evaluates every level in `levels`.
pub fn quantiles(values: &[f64], levels: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    levels
        .iter()
        .map(|&level| quantile_sorted(&sorted, level))
        .collect()
}

/// Per-step latent quantiles of one model: one row per time step, one column
/// per level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantileTable {
    /// Probability levels, ascending.
    pub levels: Vec<f64>,
    /// Calendar year of each row.
    pub years: Vec<i32>,
    /// Quantile values, `rows[t][j]` at step `t` and level `levels[j]`.
    pub rows: Vec<Vec<f64>>,
}

impl QuantileTable {
    /// Number of time steps.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Quantiles at time step `index`.
    pub fn row(&self, index: usize) -> Option<&[f64]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// One level across every step, e.g. the median trajectory.
    pub fn column(&self, level: f64) -> Option<Vec<f64>> {
        let position = self
            .levels
            .iter()
            .position(|candidate| (candidate - level).abs() < 1e-12)?;
        Some(self.rows.iter().map(|row| row[position]).collect())
    }

    /// Median trajectory.
    pub fn median(&self) -> Option<Vec<f64>> {
        self.column(0.5)
    }
}
