use pva_core::errors::{ErrorInfo, PvaError};
use serde::{Deserialize, Serialize};

/// Prior hyperparameters shared by the three variants.
///
/// `known_sd` is the literature-derived observation uncertainty `k`. It sets
/// both the spread of the first latent state around the first observation and
/// the spread of the informative prior on σ_obs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Priors {
    /// Known standard deviation `k`.
    #[serde(default = "default_known_sd")]
    pub known_sd: f64,
    /// Prior mean of σ_obs.
    #[serde(default = "default_obs_sd_mean")]
    pub obs_sd_mean: f64,
    /// Upper bound of the uniform prior on σ_proc.
    #[serde(default = "default_proc_sd_upper")]
    pub proc_sd_upper: f64,
    /// Variance of the vague normal priors on `b0` and `b1`.
    #[serde(default = "default_coefficient_variance")]
    pub coefficient_variance: f64,
}

fn default_known_sd() -> f64 {
    0.1
}

fn default_obs_sd_mean() -> f64 {
    0.44
}

fn default_proc_sd_upper() -> f64 {
    100.0
}

fn default_coefficient_variance() -> f64 {
    1000.0
}

impl Default for Priors {
    fn default() -> Self {
        Self {
            known_sd: default_known_sd(),
            obs_sd_mean: default_obs_sd_mean(),
            proc_sd_upper: default_proc_sd_upper(),
            coefficient_variance: default_coefficient_variance(),
        }
    }
}

impl Priors {
    /// Checks every hyperparameter is finite and strictly positive.
    pub fn validate(&self) -> Result<(), PvaError> {
        let fields = [
            ("known_sd", self.known_sd),
            ("obs_sd_mean", self.obs_sd_mean),
            ("proc_sd_upper", self.proc_sd_upper),
            ("coefficient_variance", self.coefficient_variance),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(PvaError::Configuration(
                    ErrorInfo::new("prior-invalid", "prior hyperparameter must be positive")
                        .with_context("field", name)
                        .with_context("value", value.to_string()),
                ));
            }
        }
        Ok(())
    }

    /// Standard deviation of the coefficient priors.
    pub fn coefficient_sd(&self) -> f64 {
        self.coefficient_variance.sqrt()
    }
}
