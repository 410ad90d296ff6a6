use std::sync::Arc;

use pva_core::errors::{ErrorInfo, PvaError};
use pva_core::{RngHandle, SeriesShape, TimeSeries};
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::density::{normal_ln_pdf, positive_normal_ln_pdf, uniform_ln_pdf};
use crate::params::ParameterSet;
use crate::priors::Priors;
use crate::variant::{ModelVariant, Transition};

/// A fully specified state-space model: variant, data and priors.
///
/// The series is shared behind an [`Arc`] so the three variants and all of
/// their chains read one copy of the data.
#[derive(Debug, Clone)]
pub struct StateSpaceModel {
    variant: ModelVariant,
    series: Arc<TimeSeries>,
    priors: Priors,
}

impl StateSpaceModel {
    /// Binds a variant to a series and a prior set.
    pub fn new(
        variant: ModelVariant,
        series: Arc<TimeSeries>,
        priors: Priors,
    ) -> Result<Self, PvaError> {
        priors.validate()?;
        Ok(Self {
            variant,
            series,
            priors,
        })
    }

    /// Variant tag.
    pub fn variant(&self) -> ModelVariant {
        self.variant
    }

    /// Transition object for the variant.
    pub fn transition(&self) -> &'static dyn Transition {
        self.variant.transition()
    }

    /// Observed data.
    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    /// Shared handle on the observed data.
    pub fn series_handle(&self) -> Arc<TimeSeries> {
        Arc::clone(&self.series)
    }

    /// Prior hyperparameters.
    pub fn priors(&self) -> &Priors {
        &self.priors
    }

    /// Number of latent states (T).
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Always false for a validated series.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Log prior of the hyperparameters, `-inf` outside support or when a
    /// coefficient required by the variant is missing.
    pub fn log_prior(&self, params: &ParameterSet) -> f64 {
        let priors = &self.priors;
        let mut lp = positive_normal_ln_pdf(params.obs_sd, priors.obs_sd_mean, priors.known_sd);
        lp += uniform_ln_pdf(params.proc_sd, 0.0, priors.proc_sd_upper);
        let coefficients = [params.b0, params.b1];
        for slot in coefficients.iter().take(self.variant.coefficient_count()) {
            match slot {
                Some(value) => lp += normal_ln_pdf(*value, 0.0, priors.coefficient_sd()),
                None => return f64::NEG_INFINITY,
            }
        }
        lp
    }

    /// Log density of the latent path given the hyperparameters, including
    /// the prior on the first state.
    pub fn log_process(&self, params: &ParameterSet, states: &[f64]) -> f64 {
        if states.len() != self.len() {
            return f64::NEG_INFINITY;
        }
        let transition = self.transition();
        let mut lp = normal_ln_pdf(states[0], self.series.first(), self.priors.known_sd);
        for pair in states.windows(2) {
            lp += transition.log_density(pair[1], pair[0], params);
        }
        lp
    }

    /// Log likelihood of the observed values. Absent years contribute nothing.
    pub fn log_likelihood(&self, params: &ParameterSet, states: &[f64]) -> f64 {
        states
            .iter()
            .enumerate()
            .filter_map(|(index, state)| {
                self.series
                    .value(index)
                    .map(|y| normal_ln_pdf(y, *state, params.obs_sd))
            })
            .sum()
    }

    /// Unnormalised joint log posterior of hyperparameters and latent path.
    pub fn log_posterior(&self, params: &ParameterSet, states: &[f64]) -> f64 {
        let prior = self.log_prior(params);
        if !prior.is_finite() {
            return f64::NEG_INFINITY;
        }
        prior + self.log_process(params, states) + self.log_likelihood(params, states)
    }
}

/// Synthetic series together with the latent path that generated it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSeries {
    /// Generated observations (observed prefix only).
    pub series: TimeSeries,
    /// Latent path over every time step, forecast steps included.
    pub states: Vec<f64>,
}

/// Simulates a series from the variant's generative model.
///
/// Zero standard deviations are allowed and produce a deterministic path.
pub fn simulate(
    variant: ModelVariant,
    params: &ParameterSet,
    initial: f64,
    start_year: i32,
    shape: SeriesShape,
    rng: &mut RngHandle,
) -> Result<SyntheticSeries, PvaError> {
    if params.obs_sd < 0.0 || params.proc_sd < 0.0 || !params.is_finite() || !initial.is_finite()
    {
        return Err(PvaError::Configuration(
            ErrorInfo::new(
                "simulate-params",
                "simulation parameters must be finite and non-negative",
            )
            .with_context("variant", variant.as_str()),
        ));
    }
    let transition = variant.transition();
    let mut states = Vec::with_capacity(shape.total());
    states.push(initial);
    for _ in 1..shape.total() {
        let previous = states[states.len() - 1];
        let noise: f64 = StandardNormal.sample(rng.inner_mut());
        states.push(transition.mean(previous, params) + params.proc_sd * noise);
    }
    let observed: Vec<f64> = states
        .iter()
        .take(shape.observed)
        .map(|state| {
            let noise: f64 = StandardNormal.sample(rng.inner_mut());
            state + params.obs_sd * noise
        })
        .collect();
    let series = TimeSeries::from_observed(start_year, &observed, shape)?;
    Ok(SyntheticSeries { series, states })
}
