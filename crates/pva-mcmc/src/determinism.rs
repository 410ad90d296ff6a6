use pva_core::derive_substream_seed;
use pva_model::ModelVariant;

/// Derives the deterministic seed used for one model fit.
pub fn model_seed(master_seed: u64, variant: ModelVariant) -> u64 {
    derive_substream_seed(master_seed, variant.index() as u64)
}

/// Derives the deterministic seed for a chain within a model fit.
pub fn chain_seed(master_seed: u64, variant: ModelVariant, chain_index: usize) -> u64 {
    derive_substream_seed(model_seed(master_seed, variant), chain_index as u64)
}
