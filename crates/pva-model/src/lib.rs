#![deny(missing_docs)]

//! Model definitions for the Level, Drift and Gompertz state-space variants.
//!
//! All variants share the observation layer `y_t ~ N(x_t, σ_obs²)` and differ
//! only in their [`Transition`]. [`StateSpaceModel`] combines a variant with a
//! series and priors into the unnormalised log posterior the sampler targets.

/// Log-density helpers.
pub mod density;
/// Model binding and synthetic data generation.
pub mod model;
/// Hyperparameter container.
pub mod params;
/// Prior hyperparameters.
pub mod priors;
/// Variant tags and transition objects.
pub mod variant;

pub use model::{simulate, StateSpaceModel, SyntheticSeries};
pub use params::ParameterSet;
pub use priors::Priors;
pub use variant::{Drift, Gompertz, Level, ModelVariant, Transition};
