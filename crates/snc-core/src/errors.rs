//! Structured error types shared across SNC crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`SncError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (identifiers, stage numbers, paths, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the SNC pipeline.
///
/// None of the variants are retried by the run controller: an error aborts
/// the current run configuration and the experiment loop moves on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum SncError {
    /// Malformed, out-of-range or unsupported settings.
    #[error("configuration error: {0}")]
    Configuration(ErrorInfo),
    /// A cached run configuration could not be reconciled with the intended one.
    #[error("consistency error: {0}")]
    Consistency(ErrorInfo),
    /// A graph role or stage marker is missing at a stage boundary.
    #[error("structural integrity error: {0}")]
    StructuralIntegrity(ErrorInfo),
    /// An artifact has a graph or simulator representation the consumer cannot handle.
    #[error("unsupported type error: {0}")]
    UnsupportedType(ErrorInfo),
    /// A simulation, rendering or scoring collaborator failed.
    #[error("simulation error: {0}")]
    Simulation(ErrorInfo),
    /// The operator (or the configured policy) declined to continue.
    #[error("aborted: {0}")]
    Aborted(ErrorInfo),
    /// Serialization, schema and filesystem errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl SncError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            SncError::Configuration(info)
            | SncError::Consistency(info)
            | SncError::StructuralIntegrity(info)
            | SncError::UnsupportedType(info)
            | SncError::Simulation(info)
            | SncError::Aborted(info)
            | SncError::Serde(info) => info,
        }
    }

    /// Adds a context entry to the payload, keeping the variant.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let info = match &mut self {
            SncError::Configuration(info)
            | SncError::Consistency(info)
            | SncError::StructuralIntegrity(info)
            | SncError::UnsupportedType(info)
            | SncError::Simulation(info)
            | SncError::Aborted(info)
            | SncError::Serde(info) => info,
        };
        info.context.insert(key.into(), value.into());
        self
    }

    /// Shorthand for a configuration error.
    pub fn configuration(code: &str, message: impl Into<String>) -> Self {
        SncError::Configuration(ErrorInfo::new(code, message))
    }

    /// Shorthand for a structural integrity error.
    pub fn structural(code: &str, message: impl Into<String>) -> Self {
        SncError::StructuralIntegrity(ErrorInfo::new(code, message))
    }

    /// Wraps an IO or (de)serialization failure.
    pub fn serde(code: &str, err: impl ToString) -> Self {
        SncError::Serde(ErrorInfo::new(code, err.to_string()))
    }
}
