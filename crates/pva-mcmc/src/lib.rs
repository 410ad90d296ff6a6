#![deny(missing_docs)]

//! Deterministic multi-chain Gibbs sampler for the PVA state-space models.

/// Per-chain output types.
pub mod chain;
/// YAML configuration schema and defaults.
pub mod config;
/// Deterministic seed derivation helpers.
pub mod determinism;
/// ESS and split R-hat.
pub mod diagnostics;
/// Gibbs sweep and the single-chain driver.
pub mod kernel;
/// Draw files and run manifests.
pub mod persist;
/// Parallel chain execution and merging.
pub mod sampler;

pub use chain::{Chain, ChainStats, Draw};
pub use config::{DiagnosticsConfig, LatentUpdate, OutputConfig, SamplerConfig, SeedPolicy};
pub use diagnostics::{effective_sample_size, split_rhat, FitDiagnostics, ParameterDiagnostics};
pub use kernel::run_chain;
pub use persist::{load_chain, write_run, RunManifest};
pub use sampler::{sample, ChainFailure, SamplerRun};
