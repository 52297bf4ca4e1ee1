//! Error types for s7s.
//!
//! Every error carries a machine-checkable code alongside the
//! human-readable message, so MCP clients can branch on outcomes
//! without parsing prose.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for s7s operations.
pub type Result<T> = std::result::Result<T, Error>;

/// s7s error types.
///
/// The first six variants are the pipeline taxonomy: validation,
/// security, and rate-limit errors are raised before any invocation is
/// attempted; the remaining execution variants describe how an
/// attempted invocation ended.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Blocked by security policy: {0}")]
    Security(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Shortcut not found: {0}")]
    NotFound(String),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Execution timed out: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment error: {0}")]
    Environment(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the error code for client-side parsing.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::Security(_) => "SECURITY_BLOCKED",
            Error::RateLimited(_) => "RATE_LIMITED",
            Error::NotFound(_) => "SHORTCUT_NOT_FOUND",
            Error::Execution(_) => "EXECUTION_ERROR",
            Error::Timeout(_) => "EXECUTION_TIMEOUT",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Environment(_) => "ENVIRONMENT_ERROR",
            Error::Json(_) => "JSON_ERROR",
            Error::Io(_) => "IO_ERROR",
        }
    }

    /// Convert to a structured JSON response.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        })
    }
}

/// Structured error descriptor embedded in execution results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl From<&Error> for ErrorInfo {
    fn from(err: &Error) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(Error::Timeout("5s".into()).code(), "EXECUTION_TIMEOUT");
        assert_eq!(Error::NotFound("x".into()).code(), "SHORTCUT_NOT_FOUND");
        assert_eq!(Error::Security("blocked".into()).code(), "SECURITY_BLOCKED");
        assert_eq!(Error::RateLimited("client".into()).code(), "RATE_LIMITED");
    }

    #[test]
    fn test_to_json_shape() {
        let json = Error::Validation("missing name".into()).to_json();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("missing name"));
    }

    #[test]
    fn test_error_info_from_error() {
        let err = Error::Execution("exit code 1".into());
        let info = ErrorInfo::from(&err);
        assert_eq!(info.code, "EXECUTION_ERROR");
        assert!(info.message.contains("exit code 1"));
    }
}
