#![deny(missing_docs)]

//! Pooled posterior draws and the summaries derived from them.
//!
//! A [`PosteriorStore`] owns the draws of one model fit, pooled across
//! chains with their chain ids retained. Quantile tables, hyperparameter
//! summaries and the pointwise log-likelihood matrix consumed by model
//! comparison are all computed from it without touching the chains.

/// Pointwise predictive log-likelihood matrix.
pub mod loglik;
/// Linear-interpolation quantiles and per-step quantile tables.
pub mod quantile;
/// Pooled draw store.
pub mod store;

pub use loglik::PointwiseLogLik;
pub use quantile::{quantile_sorted, quantiles, QuantileTable, QUANTILE_LEVELS};
pub use store::{ParameterSummary, PosteriorStore, PosteriorSummary};
