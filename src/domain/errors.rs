//! Domain errors for the permuter harness.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::models::ClientName;

/// Failures surfaced by a model client.
#[derive(Debug, Error)]
pub enum ModelCallError {
    #[error("Rate limited by provider")]
    RateLimited,

    #[error("Request timed out")]
    Timeout,

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API key not set (expected in ${0})")]
    MissingApiKey(String),
}

impl ModelCallError {
    /// Only rate limiting is retried; every other failure fails the unit.
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

impl From<reqwest::Error> for ModelCallError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Domain-level errors that can occur while running the harness.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Required source missing or empty: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Missing {artifact}; run `permuter {step}` first")]
    MissingPrerequisite { artifact: String, step: String },

    #[error("{client} client call failed: {source}")]
    ModelCall {
        client: ClientName,
        #[source]
        source: ModelCallError,
    },

    #[error("{step} aborted after {completed}/{total} units completed")]
    BatchAborted {
        step: String,
        completed: usize,
        total: usize,
    },

    #[error("Malformed artifact {}: {reason}", path.display())]
    MalformedArtifact { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DomainError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for DomainError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
