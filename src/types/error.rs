//! Error types for the question-to-answer pipeline.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` implementations.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, AskError>;

/// Every failure a question can run into.
///
/// Variants line up with the pipeline stages so the caller can tell which
/// external collaborator failed.
#[derive(Error, Debug)]
pub enum AskError {
    /// Missing or invalid environment configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// SSH connection, authentication or port binding failed
    #[error("Tunnel error: {0}")]
    TunnelError(String),

    /// Database connection through the tunnel failed
    #[error("Database connection failed: {0}")]
    ConnectionError(String),

    /// Schema could not be read
    #[error("Schema fetch failed: {0}")]
    SchemaFetchError(String),

    /// Language model request failed
    #[error("LLM request failed: {0}")]
    LlmError(String),

    /// Synthesized SQL failed on the database
    #[error("{0}")]
    ExecutionError(String),

    /// Result rendering failed
    #[error("Format error: {0}")]
    FormatError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// HTTP client error (model API)
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// CSV writer error
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AskError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create an execution error carrying the database's message verbatim.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::ExecutionError(msg.into())
    }

    /// Create a tunnel error.
    pub fn tunnel(msg: impl Into<String>) -> Self {
        Self::TunnelError(msg.into())
    }

    /// Message of an `ExecutionError`, `None` for every other variant.
    pub fn execution_message(&self) -> Option<&str> {
        match self {
            Self::ExecutionError(msg) => Some(msg),
            _ => None,
        }
    }

    /// Check whether this is a configuration problem.
    ///
    /// The CLI maps these to a distinct exit code.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::ConfigError(_))
    }
}

impl From<sqlx::Error> for AskError {
    fn from(err: sqlx::Error) -> Self {
        AskError::ExecutionError(err.to_string())
    }
}
