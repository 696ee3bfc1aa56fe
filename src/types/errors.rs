//! Error types for Concord.

use std::time::Duration;

use thiserror::Error;

/// Default result type for Concord.
pub type ConcordResult<T> = Result<T, ConcordError>;

/// Errors that can occur in Concord.
#[derive(Error, Debug)]
pub enum ConcordError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "cli")]
    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("Calibration store error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Model '{0}' query failed: {1}")]
    ModelQuery(String, String),

    /// A worker did not answer within its per-worker timeout.
    #[error("Worker '{worker}' timed out after {}ms", .timeout.as_millis())]
    WorkerTimeout { worker: String, timeout: Duration },

    /// A worker failed for a reason other than a timeout.
    #[error("Worker '{worker}' failed: {message}")]
    WorkerError { worker: String, message: String },

    /// Quorum was not met and partial results were not allowed.
    #[error("Need {required} responses, got {received}")]
    InsufficientResponses {
        required: usize,
        received: usize,
        errors: Vec<String>,
    },

    #[error("Malformed output from judge '{judge}': {reason}")]
    MalformedJudgeOutput { judge: String, reason: String },

    #[error("Verification of claim '{claim}' failed: {reason}")]
    VerificationFailure { claim: String, reason: String },

    #[error("{0}")]
    Other(String),
}

impl ConcordError {
    /// Creates a generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }

    /// Creates a configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Whether a fresh attempt could plausibly succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::WorkerTimeout { .. })
    }
}
