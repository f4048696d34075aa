//! Error types for the config API.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error codes returned in failed responses.
///
/// These codes are stable and used for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed body, unknown method string, or non-mapping namespace.
    InvalidRequest,
    /// Caller has no access to the application.
    Unauthorized,
    /// The application does not exist.
    AppNotFound,
    /// A namespace validator rejected an entry.
    ValidationFailed,
    /// The configuration was rejected because its deployment failed.
    DeployFailed,
    /// Method not served on the config resource.
    MethodNotAllowed,
    /// Storage or serialization fault inside the control plane.
    Internal,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "INVALID_REQUEST"),
            Self::Unauthorized => write!(f, "UNAUTHORIZED"),
            Self::AppNotFound => write!(f, "APP_NOT_FOUND"),
            Self::ValidationFailed => write!(f, "VALIDATION_FAILED"),
            Self::DeployFailed => write!(f, "DEPLOY_FAILED"),
            Self::MethodNotAllowed => write!(f, "METHOD_NOT_ALLOWED"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Error payload of a failed response.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    /// Error code from the registry above.
    pub code: ErrorCode,
    /// Human-readable, single-line message. Must not leak scheduler
    /// internals or credential material.
    pub message: String,
    /// Optional machine-readable details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(code: ErrorCode, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Create an INVALID_REQUEST error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Create an UNAUTHORIZED error.
    pub fn unauthorized(identity: &str, app: &str) -> Self {
        Self::with_data(
            ErrorCode::Unauthorized,
            format!("'{}' does not have access to application '{}'", identity, app),
            serde_json::json!({ "identity": identity, "app": app }),
        )
    }

    /// Create an APP_NOT_FOUND error.
    pub fn app_not_found(app: &str) -> Self {
        Self::with_data(
            ErrorCode::AppNotFound,
            format!("application '{}' not found", app),
            serde_json::json!({ "app": app }),
        )
    }

    /// Create a VALIDATION_FAILED error.
    pub fn validation_failed(namespace: &str, key: &str, reason: &str) -> Self {
        Self::with_data(
            ErrorCode::ValidationFailed,
            reason,
            serde_json::json!({ "namespace": namespace, "key": key }),
        )
    }

    /// Create the generic DEPLOY_FAILED error. Scheduler detail stays in
    /// the server log.
    pub fn deploy_failed() -> Self {
        Self::new(
            ErrorCode::DeployFailed,
            "deployment failed for this configuration",
        )
    }

    /// Create a METHOD_NOT_ALLOWED error.
    pub fn method_not_allowed(method: &str) -> Self {
        Self::with_data(
            ErrorCode::MethodNotAllowed,
            format!("method {} is not allowed on the config resource", method),
            serde_json::json!({ "method": method, "allowed": ["GET", "POST"] }),
        )
    }

    /// Create an INTERNAL error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }
}
