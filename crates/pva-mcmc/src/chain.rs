use pva_model::{ModelVariant, ParameterSet};
use serde::{Deserialize, Serialize};

/// One retained posterior draw: hyperparameters plus the latent path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draw {
    /// Hyperparameter values.
    pub params: ParameterSet,
    /// Latent log-abundance at every time step.
    pub states: Vec<f64>,
}

/// Per-chain sampler statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainStats {
    /// Acceptance rate of the σ_obs Metropolis step after tuning.
    pub acceptance_rate: f64,
    /// Random-walk scale frozen at the end of tuning.
    pub step_size: f64,
    /// Acceptance rate of the joint σ_proc and path move after tuning.
    #[serde(default)]
    pub proc_acceptance_rate: f64,
    /// Frozen random-walk scale of the log σ_proc proposal.
    #[serde(default)]
    pub proc_step_size: f64,
    /// Number of non-finite attempts that were retried.
    pub retries: usize,
    /// Iterations executed, tuning included.
    pub iterations: usize,
}

/// Output of one completed chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    /// Model the chain sampled.
    pub variant: ModelVariant,
    /// Index within the model's chain set.
    pub index: usize,
    /// Seed of the chain's random stream.
    pub seed: u64,
    /// Retained draws in iteration order.
    pub draws: Vec<Draw>,
    /// Sampler statistics.
    pub stats: ChainStats,
}

impl Chain {
    /// Number of retained draws.
    pub fn len(&self) -> usize {
        self.draws.len()
    }

    /// True when the chain retained nothing.
    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    /// Trace of a named hyperparameter (`sigma_obs`, `sigma_proc`, `b0`, `b1`).
    /// Empty when the variant does not carry the parameter.
    pub fn parameter_trace(&self, name: &str) -> Vec<f64> {
        self.draws
            .iter()
            .filter_map(|draw| {
                draw.params
                    .named_values()
                    .into_iter()
                    .find(|(candidate, _)| *candidate == name)
                    .map(|(_, value)| value)
            })
            .collect()
    }

    /// Trace of the latent state at `index`.
    pub fn state_trace(&self, index: usize) -> Vec<f64> {
        self.draws
            .iter()
            .filter_map(|draw| draw.states.get(index).copied())
            .collect()
    }
}
