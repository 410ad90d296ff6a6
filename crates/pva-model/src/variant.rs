use std::fmt::{self, Debug, Display};
use std::str::FromStr;

use pva_core::errors::{ErrorInfo, PvaError};
use serde::{Deserialize, Serialize};

use crate::density::normal_ln_pdf;
use crate::params::ParameterSet;

/// The three supported population-dynamics models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelVariant {
    /// Random walk without drift.
    Level,
    /// Random walk with constant drift `b0`.
    Drift,
    /// Stochastic Gompertz growth with density dependence `b1`.
    Gompertz,
}

impl ModelVariant {
    /// Every variant in canonical order.
    pub const ALL: [ModelVariant; 3] = [
        ModelVariant::Level,
        ModelVariant::Drift,
        ModelVariant::Gompertz,
    ];

    /// Stable identifier used in reports and file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelVariant::Level => "level",
            ModelVariant::Drift => "drift",
            ModelVariant::Gompertz => "gompertz",
        }
    }

    /// Transition object implementing this variant's state equation.
    pub fn transition(&self) -> &'static dyn Transition {
        match self {
            ModelVariant::Level => &Level,
            ModelVariant::Drift => &Drift,
            ModelVariant::Gompertz => &Gompertz,
        }
    }

    /// Number of regression coefficients (`b0`, `b1`) the variant carries.
    pub fn coefficient_count(&self) -> usize {
        match self {
            ModelVariant::Level => 0,
            ModelVariant::Drift => 1,
            ModelVariant::Gompertz => 2,
        }
    }

    /// Position of the variant within [`ModelVariant::ALL`].
    pub fn index(&self) -> usize {
        match self {
            ModelVariant::Level => 0,
            ModelVariant::Drift => 1,
            ModelVariant::Gompertz => 2,
        }
    }
}

impl Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelVariant {
    type Err = PvaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "level" => Ok(ModelVariant::Level),
            "drift" => Ok(ModelVariant::Drift),
            "gompertz" => Ok(ModelVariant::Gompertz),
            other => Err(PvaError::Configuration(
                ErrorInfo::new("unknown-variant", "unknown model variant")
                    .with_context("variant", other)
                    .with_hint("expected one of level, drift, gompertz"),
            )),
        }
    }
}

/// Linear-Gaussian state equation `x_t = a + c * x_{t-1} + e`, `e ~ N(0, σ_proc²)`.
///
/// All three variants fit this form, which lets the sampler run exact block
/// updates of the latent path from the coefficients alone.
pub trait Transition: Debug + Send + Sync {
    /// Variant tag implemented by this transition.
    fn variant(&self) -> ModelVariant;

    /// Returns `(a, c)` for the given parameters.
    fn coefficients(&self, params: &ParameterSet) -> (f64, f64);

    /// Conditional mean of the next state.
    fn mean(&self, previous: f64, params: &ParameterSet) -> f64 {
        let (a, c) = self.coefficients(params);
        a + c * previous
    }

    /// Log density of `next` given `previous`.
    fn log_density(&self, next: f64, previous: f64, params: &ParameterSet) -> f64 {
        normal_ln_pdf(next, self.mean(previous, params), params.proc_sd)
    }
}

/// `x_t ~ N(x_{t-1}, σ_proc²)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Level;

/// `x_t ~ N(x_{t-1} + b0, σ_proc²)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Drift;

/// `x_t ~ N(x_{t-1} + b0 + b1 x_{t-1}, σ_proc²)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gompertz;

impl Transition for Level {
    fn variant(&self) -> ModelVariant {
        ModelVariant::Level
    }

    fn coefficients(&self, _params: &ParameterSet) -> (f64, f64) {
        (0.0, 1.0)
    }
}

impl Transition for Drift {
    fn variant(&self) -> ModelVariant {
        ModelVariant::Drift
    }

    fn coefficients(&self, params: &ParameterSet) -> (f64, f64) {
        (params.b0.unwrap_or(0.0), 1.0)
    }
}

impl Transition for Gompertz {
    fn variant(&self) -> ModelVariant {
        ModelVariant::Gompertz
    }

    fn coefficients(&self, params: &ParameterSet) -> (f64, f64) {
        (params.b0.unwrap_or(0.0), 1.0 + params.b1.unwrap_or(0.0))
    }
}
