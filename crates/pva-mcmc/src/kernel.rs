//! Gibbs kernel: one sweep updates the latent path, the regression
//! coefficients, σ_proc and σ_obs in that order.
//!
//! σ_proc moves jointly with the path. A random-walk Metropolis step on
//! log σ_proc targets the Kalman filter likelihood with the path integrated
//! out, and an accepted move is followed by a fresh backward-sampled path.

use nalgebra::{Cholesky, Matrix2, Vector2};
use pva_core::errors::{ErrorInfo, PvaError};
use pva_core::RngHandle;
use pva_model::density::{normal_ln_pdf, uniform_ln_pdf};
use pva_model::{ModelVariant, ParameterSet, StateSpaceModel};
use rand_distr::{Distribution, StandardNormal};
use tracing::{debug, info};

use crate::chain::{Chain, ChainStats, Draw};
use crate::config::{LatentUpdate, SamplerConfig};
use crate::determinism;

/// Acceptance rate targeted while tuning the random-walk proposals.
pub const TARGET_ACCEPTANCE: f64 = 0.44;
/// Iterations between two step-size adjustments during tuning.
pub const ADAPT_WINDOW: usize = 50;

const MIN_STEP: f64 = 1e-3;
const MAX_STEP: f64 = 5.0;

/// Runs one chain to completion and returns its retained draws.
pub fn run_chain(
    model: &StateSpaceModel,
    config: &SamplerConfig,
    index: usize,
) -> Result<Chain, PvaError> {
    let variant = model.variant();
    let seed = determinism::chain_seed(config.seed_policy.master_seed, variant, index);
    let mut rng = RngHandle::from_seed(seed);
    let mut state = ChainState::initialise(model, config, &mut rng);
    let mut workspace = FilterWorkspace::new(model.len());
    info!(model = %variant, chain = index, seed, "chain started");

    for iteration in 0..config.tuning {
        state
            .sweep(model, config, &mut workspace, &mut rng)
            .map_err(|err| chain_context(err, variant, index, iteration))?;
        if (iteration + 1) % ADAPT_WINDOW == 0 {
            state.obs_walk.adapt();
            state.proc_walk.adapt();
        }
    }
    if config.tuning > 0 {
        debug!(
            model = %variant,
            chain = index,
            obs_step = state.obs_walk.step,
            proc_step = state.proc_walk.step,
            "tuning finished"
        );
    }
    state.obs_walk.reset();
    state.proc_walk.reset();

    let mut draws = Vec::with_capacity(config.draws_per_chain());
    for iteration in 0..config.iterations {
        state
            .sweep(model, config, &mut workspace, &mut rng)
            .map_err(|err| chain_context(err, variant, index, config.tuning + iteration))?;
        if iteration >= config.burn_in && (iteration - config.burn_in + 1) % config.thinning == 0 {
            draws.push(Draw {
                params: state.params,
                states: state.states.clone(),
            });
        }
    }

    let stats = ChainStats {
        acceptance_rate: state.obs_walk.acceptance_rate(),
        step_size: state.obs_walk.step,
        proc_acceptance_rate: state.proc_walk.acceptance_rate(),
        proc_step_size: state.proc_walk.step,
        retries: state.retries,
        iterations: config.tuning + config.iterations,
    };
    info!(
        model = %variant,
        chain = index,
        draws = draws.len(),
        acceptance = stats.acceptance_rate,
        proc_acceptance = stats.proc_acceptance_rate,
        retries = stats.retries,
        "chain finished"
    );
    Ok(Chain {
        variant,
        index,
        seed,
        draws,
        stats,
    })
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn chain_context(err: PvaError, variant: ModelVariant, chain: usize, iteration: usize) -> PvaError {
    let decorate = |info: ErrorInfo| {
        info.with_context("model", variant.as_str())
            .with_context("chain", chain.to_string())
            .with_context("iteration", iteration.to_string())
    };
    match err {
        PvaError::Configuration(info) => PvaError::Configuration(decorate(info)),
        PvaError::Numerical(info) => PvaError::Numerical(decorate(info)),
        PvaError::Serde(info) => PvaError::Serde(decorate(info)),
    }
}

fn gauss(rng: &mut RngHandle) -> f64 {
    StandardNormal.sample(rng.inner_mut())
}

fn non_finite(code: &str, message: &str) -> PvaError {
    PvaError::Numerical(
        ErrorInfo::new(code, message)
            .with_hint("re-run with a different seed or more informative settings"),
    )
}

fn retries_exhausted(code: &str, message: &str, max_retries: usize) -> PvaError {
    PvaError::Numerical(
        ErrorInfo::new(code, message).with_context("max_retries", max_retries.to_string()),
    )
}

/// Adaptive state of one random-walk Metropolis step on a log scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomWalk {
    /// Current proposal scale.
    pub step: f64,
    accepted: usize,
    proposed: usize,
    window_accepted: usize,
    window_proposed: usize,
}

impl RandomWalk {
    /// Walk with scale `step` and empty counters.
    pub fn new(step: f64) -> Self {
        Self {
            step,
            accepted: 0,
            proposed: 0,
            window_accepted: 0,
            window_proposed: 0,
        }
    }

    fn record(&mut self, accepted: bool) {
        self.proposed += 1;
        self.window_proposed += 1;
        if accepted {
            self.accepted += 1;
            self.window_accepted += 1;
        }
    }

    /// Share of accepted proposals since the last reset.
    pub fn acceptance_rate(&self) -> f64 {
        ratio(self.accepted, self.proposed)
    }

    /// Rescales the proposal toward the target acceptance rate using the
    /// most recent window.
    pub fn adapt(&mut self) {
        if self.window_proposed > 0 {
            let rate = ratio(self.window_accepted, self.window_proposed);
            let factor = (2.0 * (rate - TARGET_ACCEPTANCE)).exp();
            self.step = (self.step * factor).clamp(MIN_STEP, MAX_STEP);
        }
        self.window_accepted = 0;
        self.window_proposed = 0;
    }

    fn reset(&mut self) {
        *self = Self::new(self.step);
    }
}

/// Mutable state of a single chain.
#[derive(Debug, Clone)]
pub struct ChainState {
    /// Current latent path.
    pub states: Vec<f64>,
    /// Current hyperparameters.
    pub params: ParameterSet,
    /// Random walk on log σ_obs.
    pub obs_walk: RandomWalk,
    /// Random walk on log σ_proc.
    pub proc_walk: RandomWalk,
    retries: usize,
}

impl ChainState {
    /// Dispersed starting point: jittered data for the path, prior-scale
    /// draws for the hyperparameters.
    pub fn initialise(
        model: &StateSpaceModel,
        config: &SamplerConfig,
        rng: &mut RngHandle,
    ) -> Self {
        let series = model.series();
        let last = series
            .value(series.horizon() - 1)
            .unwrap_or_else(|| series.first());
        let states = (0..series.len())
            .map(|index| series.value(index).unwrap_or(last) + 0.1 * gauss(rng))
            .collect();
        let priors = model.priors();
        let obs_sd = priors.obs_sd_mean * (0.1 * gauss(rng)).exp();
        let proc_sd = 0.05 + 0.45 * rng.unit();
        let b0 = 0.05 * gauss(rng);
        let b1 = 0.01 * gauss(rng);
        Self {
            states,
            params: ParameterSet::for_variant(model.variant(), obs_sd, proc_sd, b0, b1),
            obs_walk: RandomWalk::new(config.proposal_scale),
            proc_walk: RandomWalk::new(config.proposal_scale),
            retries: 0,
        }
    }

    /// Non-finite attempts retried so far.
    pub fn retries(&self) -> usize {
        self.retries
    }

    /// Performs one full Gibbs sweep.
    pub fn sweep(
        &mut self,
        model: &StateSpaceModel,
        config: &SamplerConfig,
        workspace: &mut FilterWorkspace,
        rng: &mut RngHandle,
    ) -> Result<(), PvaError> {
        match config.latent_update {
            LatentUpdate::Block => self.update_states_block(model, config, workspace, rng)?,
            LatentUpdate::SingleSite => self.update_states_single_site(model, rng)?,
        }
        self.update_coefficients(model, rng)?;
        self.update_proc_sd(model, config, workspace, rng)?;
        self.update_obs_sd(model, config, rng)
    }

    /// Forward-filtering backward-sampling draw of the whole latent path.
    pub fn update_states_block(
        &mut self,
        model: &StateSpaceModel,
        config: &SamplerConfig,
        workspace: &mut FilterWorkspace,
        rng: &mut RngHandle,
    ) -> Result<(), PvaError> {
        forward_filter(model, &self.params, workspace);
        self.backward_sample(model, config, workspace, rng)
    }

    /// Draws the path from the filtered moments held in `workspace`, which
    /// must come from a forward pass at the current parameters.
    fn backward_sample(
        &mut self,
        model: &StateSpaceModel,
        config: &SamplerConfig,
        workspace: &mut FilterWorkspace,
        rng: &mut RngHandle,
    ) -> Result<(), PvaError> {
        let (a, c) = model.transition().coefficients(&self.params);
        let q = self.params.proc_sd * self.params.proc_sd;
        let FilterWorkspace { mean, var, path } = workspace;
        let n = path.len();
        for _ in 0..config.max_retries {
            path[n - 1] = mean[n - 1] + var[n - 1].sqrt() * gauss(rng);
            for t in (0..n - 1).rev() {
                let denom = c * c * var[t] + q;
                let gain = var[t] * c / denom;
                let smoothed = mean[t] + gain * (path[t + 1] - a - c * mean[t]);
                path[t] = smoothed + (var[t] * q / denom).sqrt() * gauss(rng);
            }
            if path.iter().all(|value| value.is_finite()) {
                self.states.copy_from_slice(path);
                return Ok(());
            }
            self.retries += 1;
        }
        Err(retries_exhausted(
            "latent-block",
            "every latent path draw was non-finite",
            config.max_retries,
        ))
    }

    /// Component-wise update. Interior states combine the pull of both
    /// neighbours; the first state is anchored by its prior and the last has
    /// no downstream term.
    pub fn update_states_single_site(
        &mut self,
        model: &StateSpaceModel,
        rng: &mut RngHandle,
    ) -> Result<(), PvaError> {
        let series = model.series();
        let (a, c) = model.transition().coefficients(&self.params);
        let q = self.params.proc_sd * self.params.proc_sd;
        let r = self.params.obs_sd * self.params.obs_sd;
        let k2 = model.priors().known_sd * model.priors().known_sd;
        let n = self.states.len();

        for t in 0..n {
            let (mut precision, mut weighted) = if t == 0 {
                (1.0 / k2, series.first() / k2)
            } else {
                (1.0 / q, (a + c * self.states[t - 1]) / q)
            };
            if t + 1 < n {
                precision += c * c / q;
                weighted += c * (self.states[t + 1] - a) / q;
            }
            if let Some(y) = series.value(t) {
                precision += 1.0 / r;
                weighted += y / r;
            }
            let draw = weighted / precision + gauss(rng) / precision.sqrt();
            if !draw.is_finite() {
                return Err(PvaError::Numerical(
                    ErrorInfo::new("latent-site", "latent state draw is not finite")
                        .with_context("index", t.to_string()),
                ));
            }
            self.states[t] = draw;
        }
        Ok(())
    }

    /// Conjugate Gaussian update of `b0` (Drift) or `(b0, b1)` (Gompertz).
    pub fn update_coefficients(
        &mut self,
        model: &StateSpaceModel,
        rng: &mut RngHandle,
    ) -> Result<(), PvaError> {
        let q = self.params.proc_sd * self.params.proc_sd;
        let prior_precision = 1.0 / model.priors().coefficient_variance;
        match model.variant() {
            ModelVariant::Level => Ok(()),
            ModelVariant::Drift => {
                let transitions = (self.states.len() - 1) as f64;
                let increments: f64 = self.states.windows(2).map(|p| p[1] - p[0]).sum();
                let precision = prior_precision + transitions / q;
                let mean = increments / q / precision;
                let b0 = mean + gauss(rng) / precision.sqrt();
                if !b0.is_finite() {
                    return Err(non_finite("drift-update", "drift draw is not finite"));
                }
                self.params.b0 = Some(b0);
                Ok(())
            }
            ModelVariant::Gompertz => {
                let mut cross = Matrix2::zeros();
                let mut response = Vector2::zeros();
                for pair in self.states.windows(2) {
                    let row = Vector2::new(1.0, pair[0]);
                    cross += row * row.transpose();
                    response += row * (pair[1] - pair[0]);
                }
                let precision = Matrix2::identity() * prior_precision + cross / q;
                let chol = Cholesky::new(precision).ok_or_else(|| {
                    non_finite("gompertz-update", "coefficient precision is not positive definite")
                })?;
                let mean = chol.solve(&(response / q));
                let noise = Vector2::new(gauss(rng), gauss(rng));
                let offset = chol
                    .l()
                    .transpose()
                    .solve_upper_triangular(&noise)
                    .ok_or_else(|| non_finite("gompertz-update", "triangular solve failed"))?;
                let coefficients = mean + offset;
                if !(coefficients[0].is_finite() && coefficients[1].is_finite()) {
                    return Err(non_finite("gompertz-update", "coefficient draw is not finite"));
                }
                self.params.b0 = Some(coefficients[0]);
                self.params.b1 = Some(coefficients[1]);
                Ok(())
            }
        }
    }

    /// Joint move of σ_proc and the path.
    ///
    /// The log σ_proc proposal is accepted against the filter likelihood of
    /// the observations under the uniform prior, so a near-deterministic path
    /// never pins σ_proc. An accepted move redraws the path at the new σ_proc;
    /// a rejected one leaves both unchanged.
    pub fn update_proc_sd(
        &mut self,
        model: &StateSpaceModel,
        config: &SamplerConfig,
        workspace: &mut FilterWorkspace,
        rng: &mut RngHandle,
    ) -> Result<(), PvaError> {
        let upper = model.priors().proc_sd_upper;
        let log_target = |log_lik: f64, sd: f64| log_lik + uniform_ln_pdf(sd, 0.0, upper) + sd.ln();
        let current = log_target(
            forward_filter(model, &self.params, workspace),
            self.params.proc_sd,
        );
        if !current.is_finite() {
            return Err(non_finite(
                "proc-sd-current",
                "filter likelihood at the current process sd is not finite",
            ));
        }
        let log_sd = self.params.proc_sd.ln();
        for _ in 0..config.max_retries {
            let candidate = ParameterSet {
                proc_sd: (log_sd + self.proc_walk.step * gauss(rng)).exp(),
                ..self.params
            };
            if !(candidate.proc_sd > 0.0 && candidate.proc_sd < upper) {
                self.proc_walk.record(false);
                return Ok(());
            }
            let proposed = log_target(
                forward_filter(model, &candidate, workspace),
                candidate.proc_sd,
            );
            if !proposed.is_finite() {
                self.retries += 1;
                continue;
            }
            let accepted = rng.unit().ln() < proposed - current;
            self.proc_walk.record(accepted);
            if accepted {
                self.params = candidate;
                self.backward_sample(model, config, workspace, rng)?;
            }
            return Ok(());
        }
        Err(retries_exhausted(
            "proc-sd-retries",
            "every process sd proposal had a non-finite likelihood",
            config.max_retries,
        ))
    }

    /// Random-walk Metropolis on log σ_obs against the full log posterior.
    pub fn update_obs_sd(
        &mut self,
        model: &StateSpaceModel,
        config: &SamplerConfig,
        rng: &mut RngHandle,
    ) -> Result<(), PvaError> {
        let log_sd = self.params.obs_sd.ln();
        let current = model.log_posterior(&self.params, &self.states) + log_sd;
        if !current.is_finite() {
            return Err(non_finite("obs-sd-current", "current log posterior is not finite"));
        }
        for _ in 0..config.max_retries {
            let candidate_log_sd = log_sd + self.obs_walk.step * gauss(rng);
            let candidate = ParameterSet {
                obs_sd: candidate_log_sd.exp(),
                ..self.params
            };
            let proposed = model.log_posterior(&candidate, &self.states) + candidate_log_sd;
            if !proposed.is_finite() {
                self.retries += 1;
                continue;
            }
            let accepted = rng.unit().ln() < proposed - current;
            self.obs_walk.record(accepted);
            if accepted {
                self.params = candidate;
            }
            return Ok(());
        }
        Err(retries_exhausted(
            "obs-sd-retries",
            "every σ_obs proposal had a non-finite density",
            config.max_retries,
        ))
    }
}

/// Kalman forward pass at `params`. Leaves the filtered means and variances
/// in `workspace` and returns the log likelihood of the observations with the
/// path integrated out.
pub fn forward_filter(
    model: &StateSpaceModel,
    params: &ParameterSet,
    workspace: &mut FilterWorkspace,
) -> f64 {
    let series = model.series();
    let (a, c) = model.transition().coefficients(params);
    let q = params.proc_sd * params.proc_sd;
    let r = params.obs_sd * params.obs_sd;

    let mut pred_mean = series.first();
    let mut pred_var = model.priors().known_sd * model.priors().known_sd;
    let mut log_lik = 0.0;
    for t in 0..workspace.path.len() {
        let (mean, var) = match series.value(t) {
            Some(y) => {
                let total = pred_var + r;
                log_lik += normal_ln_pdf(y, pred_mean, total.sqrt());
                (
                    pred_mean + pred_var / total * (y - pred_mean),
                    pred_var * r / total,
                )
            }
            None => (pred_mean, pred_var),
        };
        workspace.mean[t] = mean;
        workspace.var[t] = var;
        pred_mean = a + c * mean;
        pred_var = c * c * var + q;
    }
    log_lik
}

/// Reusable buffers for the forward filter and the backward draw.
#[derive(Debug, Clone)]
pub struct FilterWorkspace {
    mean: Vec<f64>,
    var: Vec<f64>,
    path: Vec<f64>,
}

impl FilterWorkspace {
    /// Allocates buffers for a path of length `len`.
    pub fn new(len: usize) -> Self {
        Self {
            mean: vec![0.0; len],
            var: vec![0.0; len],
            path: vec![0.0; len],
        }
    }
}
