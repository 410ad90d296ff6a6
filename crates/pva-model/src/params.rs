use serde::{Deserialize, Serialize};

use crate::variant::ModelVariant;

/// Hyperparameter values for one posterior draw.
///
/// `b0` is present for [`ModelVariant::Drift`] and [`ModelVariant::Gompertz`],
/// `b1` only for [`ModelVariant::Gompertz`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    /// Observation standard deviation (σ_obs).
    pub obs_sd: f64,
    /// Process standard deviation (σ_proc).
    pub proc_sd: f64,
    /// Drift intercept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b0: Option<f64>,
    /// Density-dependence slope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b1: Option<f64>,
}

impl ParameterSet {
    /// Builds a parameter set carrying exactly the coefficients `variant` uses.
    /// Coefficients the variant does not use are dropped.
    pub fn for_variant(variant: ModelVariant, obs_sd: f64, proc_sd: f64, b0: f64, b1: f64) -> Self {
        Self {
            obs_sd,
            proc_sd,
            b0: (variant.coefficient_count() >= 1).then_some(b0),
            b1: (variant.coefficient_count() >= 2).then_some(b1),
        }
    }

    /// Flattened `(name, value)` pairs in canonical order.
    pub fn named_values(&self) -> Vec<(&'static str, f64)> {
        let mut values = vec![("sigma_obs", self.obs_sd), ("sigma_proc", self.proc_sd)];
        if let Some(b0) = self.b0 {
            values.push(("b0", b0));
        }
        if let Some(b1) = self.b1 {
            values.push(("b1", b1));
        }
        values
    }

    /// True when every present value is finite.
    pub fn is_finite(&self) -> bool {
        self.named_values().iter().all(|(_, value)| value.is_finite())
    }
}
