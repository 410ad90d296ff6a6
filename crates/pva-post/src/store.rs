use std::sync::Arc;

use indexmap::IndexMap;
use pva_core::errors::{ErrorInfo, PvaError, PvaWarning};
use pva_core::TimeSeries;
use pva_mcmc::{Draw, SamplerRun};
use pva_model::density::normal_ln_pdf;
use pva_model::ModelVariant;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::loglik::PointwiseLogLik;
use crate::quantile::{quantiles, QuantileTable, QUANTILE_LEVELS};

/// Posterior summary of one hyperparameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSummary {
    /// Posterior mean.
    pub mean: f64,
    /// Posterior standard deviation.
    pub sd: f64,
    /// Quantiles at [`QUANTILE_LEVELS`].
    pub quantiles: Vec<f64>,
}

/// Serializable per-model summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorSummary {
    /// Model the summary belongs to.
    pub variant: ModelVariant,
    /// Pooled draw count.
    pub draws: usize,
    /// Latent state quantiles for every time step.
    pub states: QuantileTable,
    /// Hyperparameter summaries in canonical order.
    pub hyperparameters: IndexMap<String, ParameterSummary>,
    /// Convergence warnings carried over from the sampler.
    pub warnings: Vec<PvaWarning>,
}

/// Draws of one model fit pooled across chains.
#[derive(Debug, Clone)]
pub struct PosteriorStore {
    variant: ModelVariant,
    series: Arc<TimeSeries>,
    draws: Vec<Draw>,
    chain_ids: Vec<usize>,
    warnings: Vec<PvaWarning>,
}

impl PosteriorStore {
    /// Pools every completed chain of `run`.
    ///
    /// Fails when the run retained no draws or when a latent path does not
    /// match the series length.
    pub fn from_run(run: &SamplerRun, series: Arc<TimeSeries>) -> Result<Self, PvaError> {
        let mut draws = Vec::with_capacity(run.draw_count());
        let mut chain_ids = Vec::with_capacity(run.draw_count());
        for chain in &run.chains {
            for draw in &chain.draws {
                if draw.states.len() != series.len() {
                    return Err(PvaError::Configuration(
                        ErrorInfo::new("store-path-length", "latent path does not match the series")
                            .with_context("model", run.variant.as_str())
                            .with_context("chain", chain.index.to_string())
                            .with_context("expected", series.len().to_string())
                            .with_context("found", draw.states.len().to_string()),
                    ));
                }
                draws.push(draw.clone());
                chain_ids.push(chain.index);
            }
        }
        if draws.is_empty() {
            return Err(PvaError::Configuration(
                ErrorInfo::new("store-empty", "no posterior draws to pool")
                    .with_context("model", run.variant.as_str()),
            ));
        }
        debug!(model = %run.variant, draws = draws.len(), "posterior pooled");
        Ok(Self {
            variant: run.variant,
            series,
            draws,
            chain_ids,
            warnings: run.warnings.clone(),
        })
    }

    /// Model the draws belong to.
    pub fn variant(&self) -> ModelVariant {
        self.variant
    }

    /// Series the model was fitted to.
    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    /// Pooled draw count.
    pub fn len(&self) -> usize {
        self.draws.len()
    }

    /// Always false for a constructed store.
    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    /// Pooled draws in chain order.
    pub fn draws(&self) -> &[Draw] {
        &self.draws
    }

    /// Chain id of every pooled draw.
    pub fn chain_ids(&self) -> &[usize] {
        &self.chain_ids
    }

    /// Sampler warnings carried with the draws.
    pub fn warnings(&self) -> &[PvaWarning] {
        &self.warnings
    }

    /// Every draw of the latent state at zero-based `index`.
    pub fn state_draws(&self, index: usize) -> Result<Vec<f64>, PvaError> {
        if index >= self.series.len() {
            return Err(PvaError::Configuration(
                ErrorInfo::new("state-index", "time index outside the series")
                    .with_context("index", index.to_string())
                    .with_context("len", self.series.len().to_string()),
            ));
        }
        Ok(self.draws.iter().map(|draw| draw.states[index]).collect())
    }

    /// Draws of the latent state at the final forecast step.
    pub fn final_state_draws(&self) -> Vec<f64> {
        self.draws
            .iter()
            .filter_map(|draw| draw.states.last().copied())
            .collect()
    }

    /// Hyperparameter draws keyed by name in canonical order.
    pub fn hyperparameter_draws(&self) -> IndexMap<String, Vec<f64>> {
        let mut out: IndexMap<String, Vec<f64>> = IndexMap::new();
        for draw in &self.draws {
            for (name, value) in draw.params.named_values() {
                out.entry(name.to_string()).or_default().push(value);
            }
        }
        out
    }

    /// Latent quantiles at every step for the standard levels.
    pub fn quantile_table(&self) -> QuantileTable {
        let rows = (0..self.series.len())
            .into_par_iter()
            .map(|index| {
                let column: Vec<f64> = self.draws.iter().map(|draw| draw.states[index]).collect();
                quantiles(&column, &QUANTILE_LEVELS)
            })
            .collect();
        QuantileTable {
            levels: QUANTILE_LEVELS.to_vec(),
            years: self.series.years(),
            rows,
        }
    }

    /// Mean, sd and quantiles of every hyperparameter.
    pub fn hyperparameter_summaries(&self) -> IndexMap<String, ParameterSummary> {
        self.hyperparameter_draws()
            .into_iter()
            .map(|(name, values)| (name, summarise(&values)))
            .collect()
    }

    /// Pointwise predictive log-likelihood of observed steps `1..H` (zero
    /// based) under every draw's latent state and observation sd.
    pub fn pointwise_log_likelihood(&self) -> PointwiseLogLik {
        let horizon = self.series.horizon();
        let indices: Vec<usize> = (1..horizon)
            .filter(|&index| self.series.value(index).is_some())
            .collect();
        let observations: Vec<f64> = indices
            .iter()
            .filter_map(|&index| self.series.value(index))
            .collect();
        let values = self
            .draws
            .par_iter()
            .map(|draw| {
                indices
                    .iter()
                    .zip(&observations)
                    .map(|(&index, &y)| normal_ln_pdf(y, draw.states[index], draw.params.obs_sd))
                    .collect()
            })
            .collect();
        PointwiseLogLik {
            indices,
            chain_ids: self.chain_ids.clone(),
            values,
        }
    }

    /// Bundles the quantile table and hyperparameter summaries.
    pub fn summary(&self) -> PosteriorSummary {
        PosteriorSummary {
            variant: self.variant,
            draws: self.len(),
            states: self.quantile_table(),
            hyperparameters: self.hyperparameter_summaries(),
            warnings: self.warnings.clone(),
        }
    }
}

fn summarise(values: &[f64]) -> ParameterSummary {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let sd = if values.len() > 1 {
        (values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1.0)).sqrt()
    } else {
        0.0
    };
    ParameterSummary {
        mean,
        sd,
        quantiles: quantiles(values, &QUANTILE_LEVELS),
    }
}
