use serde::{Deserialize, Serialize};

/// Pointwise predictive log-likelihood of one model fit.
///
/// Rows are pooled draws, columns are observed time steps excluding the
/// first. The first step is anchored to its own observation by the initial
/// state prior, so it never enters model comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointwiseLogLik {
    /// Zero-based time index of each column.
    pub indices: Vec<usize>,
    /// Chain id of each row.
    pub chain_ids: Vec<usize>,
    /// `values[s][i]`: log density of observation `indices[i]` under draw `s`.
    pub values: Vec<Vec<f64>>,
}

impl PointwiseLogLik {
    /// Number of draws (rows).
    pub fn draws(&self) -> usize {
        self.values.len()
    }

    /// Number of observed points (columns).
    pub fn points(&self) -> usize {
        self.indices.len()
    }

    /// Every draw's value at column `point`.
    pub fn column(&self, point: usize) -> Vec<f64> {
        self.values.iter().map(|row| row[point]).collect()
    }

    /// Row indices grouped by chain, chains in ascending id order.
    pub fn rows_by_chain(&self) -> Vec<Vec<usize>> {
        let mut ids: Vec<usize> = self.chain_ids.clone();
        ids.sort_unstable();
        ids.dedup();
        ids.iter()
            .map(|id| {
                self.chain_ids
                    .iter()
                    .enumerate()
                    .filter(|(_, chain)| *chain == id)
                    .map(|(row, _)| row)
                    .collect()
            })
            .collect()
    }

    /// Sum over points of the per-row log-likelihood.
    pub fn row_totals(&self) -> Vec<f64> {
        self.values.iter().map(|row| row.iter().sum()).collect()
    }
}
