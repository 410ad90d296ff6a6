use std::fs;
use std::path::{Path, PathBuf};

use pva_core::errors::{ErrorInfo, PvaError};
use serde::{Deserialize, Serialize};

/// YAML-configurable parameters governing the sampler for one model fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Number of independent chains (at least two).
    #[serde(default = "default_chains")]
    pub chains: usize,
    /// Total iterations per chain, burn-in included.
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// Number of initial iterations discarded.
    #[serde(default = "default_burn_in")]
    pub burn_in: usize,
    /// Keep every `thinning`-th post burn-in iteration.
    #[serde(default = "default_thinning")]
    pub thinning: usize,
    /// Adaptation iterations run before `iterations`; never recorded.
    #[serde(default = "default_tuning")]
    pub tuning: usize,
    /// Attempts per step before a non-finite density fails the chain.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Update scheme for the latent path.
    #[serde(default)]
    pub latent_update: LatentUpdate,
    /// Initial random-walk scale of the log σ_obs and log σ_proc proposals.
    #[serde(default = "default_proposal_scale")]
    pub proposal_scale: f64,
    /// Worker threads for chain execution (0 uses the global pool).
    #[serde(default)]
    pub workers: usize,
    /// Convergence thresholds.
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    /// Master seed and substream policy.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Optional raw draw persistence.
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_chains() -> usize {
    3
}

fn default_iterations() -> usize {
    5_000
}

fn default_burn_in() -> usize {
    1_000
}

fn default_thinning() -> usize {
    1
}

fn default_tuning() -> usize {
    500
}

fn default_max_retries() -> usize {
    100
}

fn default_proposal_scale() -> f64 {
    0.1
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            chains: default_chains(),
            iterations: default_iterations(),
            burn_in: default_burn_in(),
            thinning: default_thinning(),
            tuning: default_tuning(),
            max_retries: default_max_retries(),
            latent_update: LatentUpdate::default(),
            proposal_scale: default_proposal_scale(),
            workers: 0,
            diagnostics: DiagnosticsConfig::default(),
            seed_policy: SeedPolicy::default(),
            output: OutputConfig::default(),
        }
    }
}

impl SamplerConfig {
    /// Parses a configuration from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, PvaError> {
        serde_yaml::from_str(text).map_err(|err| PvaError::serde("sampler-config-parse", err))
    }

    /// Loads a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, PvaError> {
        let text = fs::read_to_string(path).map_err(|err| {
            PvaError::Serde(
                ErrorInfo::new("sampler-config-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Self::from_yaml_str(&text)
    }

    /// Number of draws each chain retains: `(iterations - burn_in) / thinning`.
    pub fn draws_per_chain(&self) -> usize {
        self.iterations.saturating_sub(self.burn_in) / self.thinning.max(1)
    }

    /// Rejects settings that cannot produce a usable run.
    pub fn validate(&self) -> Result<(), PvaError> {
        let invalid = |field: &str, value: String, hint: &str| {
            PvaError::Configuration(
                ErrorInfo::new("sampler-config", "invalid sampler setting")
                    .with_context("field", field)
                    .with_context("value", value)
                    .with_hint(hint),
            )
        };
        if self.chains < 2 {
            return Err(invalid(
                "chains",
                self.chains.to_string(),
                "at least two chains are needed for convergence diagnostics",
            ));
        }
        if self.thinning == 0 {
            return Err(invalid("thinning", "0".into(), "use a thinning of at least 1"));
        }
        if self.burn_in >= self.iterations {
            return Err(invalid(
                "burn_in",
                self.burn_in.to_string(),
                "burn-in must be smaller than the iteration count",
            ));
        }
        if self.draws_per_chain() == 0 {
            return Err(invalid(
                "thinning",
                self.thinning.to_string(),
                "thinning leaves no retained draws",
            ));
        }
        if self.max_retries == 0 {
            return Err(invalid("max_retries", "0".into(), "allow at least one attempt"));
        }
        if !(self.proposal_scale.is_finite() && self.proposal_scale > 0.0) {
            return Err(invalid(
                "proposal_scale",
                self.proposal_scale.to_string(),
                "proposal scale must be positive",
            ));
        }
        Ok(())
    }
}

/// Latent path update scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LatentUpdate {
    /// Forward-filtering backward-sampling of the whole path at once.
    #[default]
    Block,
    /// One conditional draw per time step, sweeping forward.
    SingleSite,
}

/// Thresholds beyond which a fit is flagged as not converged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Largest acceptable split R-hat.
    #[serde(default = "default_max_rhat")]
    pub max_rhat: f64,
    /// Smallest acceptable effective sample size.
    #[serde(default = "default_min_ess")]
    pub min_ess: f64,
}

fn default_max_rhat() -> f64 {
    1.1
}

fn default_min_ess() -> f64 {
    100.0
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            max_rhat: default_max_rhat(),
            min_ess: default_min_ess(),
        }
    }
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed used for the run.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label recorded in manifests.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x0000_0000_0001_9900_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}

/// Output directory layout for persisted draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory for run artefacts; nothing is written when unset.
    #[serde(default)]
    pub run_directory: Option<PathBuf>,
    /// Manifest filename prefix relative to `run_directory`.
    #[serde(default = "default_manifest_filename")]
    pub manifest_file: PathBuf,
    /// Subdirectory holding per-chain draw files.
    #[serde(default = "default_draws_dir")]
    pub draws_dir: PathBuf,
}

fn default_manifest_filename() -> PathBuf {
    PathBuf::from("manifest.json")
}

fn default_draws_dir() -> PathBuf {
    PathBuf::from("draws")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            run_directory: None,
            manifest_file: default_manifest_filename(),
            draws_dir: default_draws_dir(),
        }
    }
}
