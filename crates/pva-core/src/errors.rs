//! Error families and warnings reported by every stage of a fit.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Code, message and key/value context of an error or warning.
///
/// Context keys name the affected model, chain, time index or setting so a
/// failed fit can be traced back without re-running it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Short kebab-case code, e.g. `series-length`.
    pub code: String,
    /// What went wrong.
    pub message: String,
    /// Affected model, chain, index or setting.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Suggested fix, when one is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Payload without context or hint.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Records `key = value`, replacing an earlier value for `key`.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.context.insert(key.into(), value.into());
        self
    }

    /// Attaches a remediation hint.
    pub fn with_hint(self, hint: impl Into<String>) -> Self {
        Self {
            hint: Some(hint.into()),
            ..self
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if !self.context.is_empty() {
            let pairs: Vec<String> = self
                .context
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect();
            write!(f, " ({})", pairs.join(" "))?;
        }
        match &self.hint {
            Some(hint) => write!(f, "; hint: {hint}"),
            None => Ok(()),
        }
    }
}

/// Canonical error type for the PVA engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum PvaError {
    /// Malformed input series or invalid settings, raised before sampling.
    #[error("configuration error: {0}")]
    Configuration(ErrorInfo),
    /// Non-finite density that persisted past the retry budget of a chain.
    #[error("numerical error: {0}")]
    Numerical(ErrorInfo),
    /// Serialization, schema and filesystem errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl PvaError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            PvaError::Configuration(info) | PvaError::Numerical(info) | PvaError::Serde(info) => {
                info
            }
        }
    }

    /// Shorthand for a configuration error with the given code and message.
    pub fn configuration(code: impl Into<String>, message: impl Into<String>) -> Self {
        PvaError::Configuration(ErrorInfo::new(code, message))
    }

    /// Shorthand for a numerical error with the given code and message.
    pub fn numerical(code: impl Into<String>, message: impl Into<String>) -> Self {
        PvaError::Numerical(ErrorInfo::new(code, message))
    }

    /// Shorthand for a serde/IO error carrying the source error text.
    pub fn serde(code: impl Into<String>, err: impl ToString) -> Self {
        PvaError::Serde(ErrorInfo::new(code, err.to_string()))
    }
}

/// Non-fatal diagnostics attached to results as metadata.
///
/// Downstream stages still run when a warning is present, but they should
/// surface it so consumers know the numbers may be unreliable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "kebab-case")]
pub enum PvaWarning {
    /// Convergence diagnostics (R-hat, ESS) exceeded their thresholds.
    NonConvergence(ErrorInfo),
    /// Pareto shape diagnostics flagged unreliable importance sampling.
    ComparisonReliability(ErrorInfo),
}

impl PvaWarning {
    /// Returns the payload describing the warning.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            PvaWarning::NonConvergence(info) | PvaWarning::ComparisonReliability(info) => info,
        }
    }
}

impl fmt::Display for PvaWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PvaWarning::NonConvergence(info) => write!(f, "non-convergence: {info}"),
            PvaWarning::ComparisonReliability(info) => {
                write!(f, "comparison reliability: {info}")
            }
        }
    }
}
