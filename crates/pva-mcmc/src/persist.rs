use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use pva_core::errors::{ErrorInfo, PvaError, PvaWarning};
use pva_model::ModelVariant;
use serde::{Deserialize, Serialize};

use crate::chain::Chain;
use crate::config::SamplerConfig;
use crate::sampler::SamplerRun;

/// Structured manifest describing a finished model fit on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    /// Model the run sampled.
    pub variant: ModelVariant,
    /// Configuration used for the run.
    pub config: SamplerConfig,
    /// Master seed used to derive chain substreams.
    pub master_seed: u64,
    /// Optional seed label captured from the configuration.
    pub seed_label: Option<String>,
    /// RFC 3339 timestamp of when the manifest was written.
    pub created_at: String,
    /// Draw files relative to the run directory, one per completed chain.
    pub chain_files: Vec<PathBuf>,
    /// Hyperparameter trace files relative to the run directory.
    pub trace_files: Vec<PathBuf>,
    /// Indices of chains dropped after numerical failures.
    pub failed_chains: Vec<usize>,
    /// Convergence warnings raised for the run.
    pub warnings: Vec<PvaWarning>,
}

impl RunManifest {
    /// Writes the manifest to a JSON file.
    pub fn write(&self, path: &Path) -> Result<(), PvaError> {
        write_json(path, self, "manifest")
    }

    /// Loads a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, PvaError> {
        read_json(path, "manifest")
    }
}

/// Writes every chain's draws, a hyperparameter trace CSV per chain and the
/// manifest below `config.output.run_directory`. Returns the manifest path,
/// or `None` when no run directory is configured.
pub fn write_run(run: &SamplerRun, config: &SamplerConfig) -> Result<Option<PathBuf>, PvaError> {
    let Some(run_dir) = &config.output.run_directory else {
        return Ok(None);
    };
    let model_dir = run_dir.join(run.variant.as_str());
    let mut chain_files = Vec::with_capacity(run.chains.len());
    let mut trace_files = Vec::with_capacity(run.chains.len());
    for chain in &run.chains {
        let relative = config
            .output
            .draws_dir
            .join(format!("chain_{:02}.json", chain.index));
        write_json(&model_dir.join(&relative), chain, "draws")?;
        chain_files.push(relative);

        let trace = config
            .output
            .draws_dir
            .join(format!("trace_{:02}.csv", chain.index));
        write_trace_csv(chain, &model_dir.join(&trace)).map_err(|err| {
            PvaError::Serde(
                ErrorInfo::new("trace-write", err.to_string())
                    .with_context("path", model_dir.join(&trace).display().to_string()),
            )
        })?;
        trace_files.push(trace);
    }
    let manifest = RunManifest {
        variant: run.variant,
        config: config.clone(),
        master_seed: config.seed_policy.master_seed,
        seed_label: config.seed_policy.label.clone(),
        created_at: chrono::Utc::now().to_rfc3339(),
        chain_files,
        trace_files,
        failed_chains: run.failures.iter().map(|failure| failure.index).collect(),
        warnings: run.warnings.clone(),
    };
    let path = model_dir.join(&config.output.manifest_file);
    manifest.write(&path)?;
    Ok(Some(path))
}

/// Loads a chain previously written by [`write_run`].
pub fn load_chain(path: &Path) -> Result<Chain, PvaError> {
    read_json(path, "draws")
}

/// Writes the hyperparameter trace of a chain as CSV, one row per draw.
pub fn write_trace_csv(chain: &Chain, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = BufWriter::new(File::create(path)?);
    let names: Vec<&str> = chain
        .draws
        .first()
        .map(|draw| draw.params.named_values().iter().map(|(name, _)| *name).collect())
        .unwrap_or_default();
    writeln!(file, "draw,{}", names.join(","))?;
    for (index, draw) in chain.draws.iter().enumerate() {
        let values: Vec<String> = draw
            .params
            .named_values()
            .iter()
            .map(|(_, value)| format!("{value:.8}"))
            .collect();
        writeln!(file, "{},{}", index, values.join(","))?;
    }
    file.flush()
}

fn write_json<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<(), PvaError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            PvaError::Serde(
                ErrorInfo::new(format!("{what}-mkdir"), err.to_string())
                    .with_context("path", parent.display().to_string()),
            )
        })?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|err| {
        PvaError::Serde(
            ErrorInfo::new(format!("{what}-serialize"), err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    fs::write(path, json).map_err(|err| {
        PvaError::Serde(
            ErrorInfo::new(format!("{what}-write"), err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path, what: &str) -> Result<T, PvaError> {
    let contents = fs::read_to_string(path).map_err(|err| {
        PvaError::Serde(
            ErrorInfo::new(format!("{what}-read"), err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    serde_json::from_str(&contents).map_err(|err| {
        PvaError::Serde(
            ErrorInfo::new(format!("{what}-parse"), err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })
}
