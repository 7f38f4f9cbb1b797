//! Centralized error types for CORE.

use corehub_redis::RedisError;
use thiserror::Error;

/// Main error type for CORE operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid state transition: cannot move from '{from}' to '{to}'")]
    InvalidStateTransition { from: String, to: String },

    #[error("Database error: {0}")]
    Database(RedisError),

    #[error("Meeting provider error: {0}")]
    Meeting(#[from] corehub_meeting::MeetingError),

    #[error("Mail delivery error: {0}")]
    Mail(String),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CORE operations.
pub type CoreResult<T> = Result<T, CoreError>;

impl From<RedisError> for CoreError {
    fn from(err: RedisError) -> Self {
        match err {
            RedisError::NotFound(msg) => Self::NotFound(msg),
            RedisError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Database(other),
        }
    }
}

impl CoreError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not-found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a forbidden error.
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Create an invalid transition error.
    pub fn transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidStateTransition { from: from.into(), to: to.into() }
    }
}

/// Reject blank required text.
pub(crate) fn require(value: &str, what: &str) -> CoreResult<()> {
    if value.trim().is_empty() {
        return Err(CoreError::validation(format!("{} is required", what)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_keep_their_meaning() {
        let err: CoreError = RedisError::NotFound("Lead not found: l1".into()).into();
        assert!(matches!(err, CoreError::NotFound(ref m) if m == "Lead not found: l1"));

        let err: CoreError = RedisError::Conflict("taken".into()).into();
        assert!(matches!(err, CoreError::Conflict(_)));

        let err: CoreError = RedisError::OperationFailed("x".into()).into();
        assert!(matches!(err, CoreError::Database(_)));
    }

    #[test]
    fn test_require_rejects_blank() {
        assert!(require("  ", "Name").is_err());
        assert!(require("Asha", "Name").is_ok());
    }
}
