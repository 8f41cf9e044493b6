//! Error types for Remindr
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in Remindr
#[derive(Debug, Error)]
pub enum RemindrError {
    /// A repeat rule that can never produce an occurrence
    #[error("Invalid repeat rule: {0}")]
    InvalidRule(String),

    /// An argument violated a documented precondition
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// Notification sink rejected a fired event
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Task snapshot could not be obtained
    #[error("Task source error: {0}")]
    Source(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Remindr operations
pub type Result<T> = std::result::Result<T, RemindrError>;
