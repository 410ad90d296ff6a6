#![deny(missing_docs)]

//! Leave-one-out model comparison for the fitted state-space variants.
//!
//! Each model contributes its pointwise log-likelihood matrix. Pareto
//! smoothed importance sampling turns the matrix into leave-one-out
//! predictive densities, from which LOOIC, stacking weights and pseudo-BMA
//! weights are derived.

/// Comparison orchestration and the ranked table.
pub mod compare;
/// YAML configuration schema and defaults.
pub mod config;
/// PSIS-LOO per model.
pub mod loo;
/// Pareto smoothed importance sampling.
pub mod psis;
/// Stacking and pseudo-BMA weights.
pub mod weights;

pub use compare::{compare, Comparison, ComparisonEntry};
pub use config::{ComparisonConfig, PseudoBmaMethod};
pub use loo::{psis_loo, relative_efficiency, LooSummary, PointwiseLoo};
pub use psis::{gpd_fit, gpd_quantile, log_sum_exp, psis_smooth, tail_length, PsisResult};
pub use weights::{pseudo_bma_weights, stacking_weights};
