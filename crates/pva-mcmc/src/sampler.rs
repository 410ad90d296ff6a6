use pva_core::errors::{ErrorInfo, PvaError, PvaWarning};
use pva_model::{ModelVariant, StateSpaceModel};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::chain::Chain;
use crate::config::SamplerConfig;
use crate::diagnostics::FitDiagnostics;
use crate::kernel;
use crate::persist;

/// A chain that failed with a numerical error and was dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainFailure {
    /// Index of the failed chain.
    pub index: usize,
    /// Error that ended the chain.
    pub error: PvaError,
}

/// Merged result of every chain of one model fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerRun {
    /// Model that was sampled.
    pub variant: ModelVariant,
    /// Completed chains ordered by index.
    pub chains: Vec<Chain>,
    /// Chains dropped after a numerical failure.
    pub failures: Vec<ChainFailure>,
    /// Convergence diagnostics over the completed chains.
    pub diagnostics: FitDiagnostics,
    /// Non-convergence warnings.
    pub warnings: Vec<PvaWarning>,
}

impl SamplerRun {
    /// True when no convergence warning was raised.
    pub fn converged(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Total number of retained draws across chains.
    pub fn draw_count(&self) -> usize {
        self.chains.iter().map(Chain::len).sum()
    }
}

/// Samples the posterior of `model` with `config.chains` independent chains.
///
/// Chains run concurrently and are merged once every chain has returned. A
/// chain that fails numerically is dropped and reported in
/// [`SamplerRun::failures`]; the call only fails when every chain fails or
/// the configuration is invalid.
pub fn sample(model: &StateSpaceModel, config: &SamplerConfig) -> Result<SamplerRun, PvaError> {
    config.validate()?;
    let variant = model.variant();
    info!(
        model = %variant,
        chains = config.chains,
        iterations = config.iterations,
        burn_in = config.burn_in,
        thinning = config.thinning,
        "sampling started"
    );

    let results = run_chains(model, config)?;

    let (chains, failures) = merge_chains(variant, results)?;

    let diagnostics = FitDiagnostics::from_chains(&chains);
    let warnings = diagnostics.assess(&config.diagnostics);
    for warning in &warnings {
        warn!(model = %variant, %warning, "convergence diagnostic");
    }

    let run = SamplerRun {
        variant,
        chains,
        failures,
        diagnostics,
        warnings,
    };
    if config.output.run_directory.is_some() {
        persist::write_run(&run, config)?;
    }
    info!(
        model = %variant,
        draws = run.draw_count(),
        max_rhat = run.diagnostics.max_rhat(),
        "sampling finished"
    );
    Ok(run)
}

/// Splits per-chain results into completed chains and numerical failures.
///
/// Any other error family aborts the fit. With no completed chain the first
/// failure is returned.
fn merge_chains(
    variant: ModelVariant,
    results: Vec<Result<Chain, PvaError>>,
) -> Result<(Vec<Chain>, Vec<ChainFailure>), PvaError> {
    let mut chains = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(chain) => chains.push(chain),
            Err(err @ PvaError::Numerical(_)) => {
                error!(model = %variant, chain = index, error = %err, "chain dropped");
                failures.push(ChainFailure { index, error: err });
            }
            Err(err) => return Err(err),
        }
    }
    if chains.is_empty() {
        let first = failures.into_iter().next().map(|failure| failure.error);
        return Err(first.unwrap_or_else(|| {
            PvaError::Numerical(
                ErrorInfo::new("no-chains", "no chain completed")
                    .with_context("model", variant.as_str()),
            )
        }));
    }
    Ok((chains, failures))
}

fn run_chains(
    model: &StateSpaceModel,
    config: &SamplerConfig,
) -> Result<Vec<Result<Chain, PvaError>>, PvaError> {
    let work = || -> Vec<Result<Chain, PvaError>> {
        (0..config.chains)
            .into_par_iter()
            .map(|index| kernel::run_chain(model, config, index))
            .collect()
    };
    if config.workers == 0 {
        return Ok(work());
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .build()
        .map_err(|err| {
            PvaError::Configuration(
                ErrorInfo::new("thread-pool", err.to_string())
                    .with_context("workers", config.workers.to_string()),
            )
        })?;
    Ok(pool.install(work))
}
