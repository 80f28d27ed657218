//! Unified error handling for the report workflow
//!
//! Every failure the workflow can surface maps onto a small, user-visible
//! taxonomy (`ErrorKind`) that is persisted with a failed run's status.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ReportResult<T> = Result<T, ReportError>;

/// User-visible failure taxonomy.
///
/// A failed run records the kind of the last error alongside its status so
/// that callers can tell a bad configuration from a transient backend fault
/// without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Provider name outside the supported set. Fatal, never retried.
    UnsupportedProvider,
    /// A search request failed at the gateway level.
    ProviderRequestFailed,
    /// LLM backend fault (transport, rate limit, or unusable output).
    LlmCallFailed,
    /// Checkpoint store I/O failed.
    CheckpointFailed,
    /// Bad run configuration.
    InvalidConfig,
    /// Invalid caller input (empty query batch, unknown run id, ...).
    InvalidInput,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::UnsupportedProvider => "unsupported_provider",
            ErrorKind::ProviderRequestFailed => "provider_request_failed",
            ErrorKind::LlmCallFailed => "llm_call_failed",
            ErrorKind::CheckpointFailed => "checkpoint_failed",
            ErrorKind::InvalidConfig => "invalid_config",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Internal => "internal",
        };
        write!(f, "{}", name)
    }
}

/// Main error type for the Reportify system
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Unsupported search provider: {provider}")]
    UnsupportedProvider { provider: String },

    #[error("Search error: {message}")]
    Search { message: String },

    #[error("LLM error: {message}")]
    Llm {
        message: String,
        provider: Option<String>,
        model: Option<String>,
    },

    /// The LLM returned output that failed schema validation. Propagates as
    /// an LLM-call failure; the core never retries on its own.
    #[error("Malformed structured output: {message}")]
    MalformedOutput { message: String },

    #[error("Checkpoint error: {message}")]
    Checkpoint { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReportError {
    pub fn search<S: Into<String>>(message: S) -> Self {
        Self::Search {
            message: message.into(),
        }
    }

    pub fn llm<S: Into<String>>(message: S) -> Self {
        Self::Llm {
            message: message.into(),
            provider: None,
            model: None,
        }
    }

    /// LLM error attributed to a specific backend model.
    pub fn llm_for<S: Into<String>>(message: S, provider: &str, model: &str) -> Self {
        Self::Llm {
            message: message.into(),
            provider: Some(provider.to_string()),
            model: Some(model.to_string()),
        }
    }

    pub fn malformed_output<S: Into<String>>(message: S) -> Self {
        Self::MalformedOutput {
            message: message.into(),
        }
    }

    pub fn checkpoint<S: Into<String>>(message: S) -> Self {
        Self::Checkpoint {
            message: message.into(),
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Map this error onto the user-visible taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReportError::UnsupportedProvider { .. } => ErrorKind::UnsupportedProvider,
            ReportError::Search { .. } => ErrorKind::ProviderRequestFailed,
            // Schema-invalid output is reported as an LLM-call failure.
            ReportError::Llm { .. } | ReportError::MalformedOutput { .. } => {
                ErrorKind::LlmCallFailed
            }
            ReportError::Checkpoint { .. } => ErrorKind::CheckpointFailed,
            ReportError::Config { .. } => ErrorKind::InvalidConfig,
            ReportError::Validation { .. } | ReportError::NotFound { .. } => {
                ErrorKind::InvalidInput
            }
            ReportError::Internal { .. }
            | ReportError::Io(_)
            | ReportError::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Whether a retry at the caller's discretion could plausibly succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ReportError::Llm { .. } | ReportError::MalformedOutput { .. } | ReportError::Search { .. }
        )
    }
}
