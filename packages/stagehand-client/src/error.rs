//! Error types for the Stagehand client.

use thiserror::Error;

/// Result type for Stagehand client operations.
pub type Result<T> = std::result::Result<T, StagehandError>;

/// Stagehand client errors.
#[derive(Debug, Error)]
pub enum StagehandError {
    /// Configuration error (missing server URL, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response from the server
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The server answered but reported the operation as failed
    #[error("Operation failed: {0}")]
    Operation(String),

    /// Parse error (invalid JSON, unexpected response format)
    #[error("Parse error: {0}")]
    Parse(String),
}
