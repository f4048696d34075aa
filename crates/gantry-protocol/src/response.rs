//! Response envelope.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};

/// Response status, mirroring the HTTP codes the transport will emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Ok,
    Created,
    BadRequest,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    Internal,
}

impl Status {
    /// Numeric HTTP code.
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::Created => 201,
            Status::BadRequest => 400,
            Status::Forbidden => 403,
            Status::NotFound => 404,
            Status::MethodNotAllowed => 405,
            Status::Internal => 500,
        }
    }
}

/// Response envelope for the config resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResponse {
    /// Response status.
    pub status: Status,
    /// Request ID echoed from the request.
    pub request_id: String,
    /// Whether the request succeeded.
    pub ok: bool,
    /// Success payload (present when ok=true).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// Error details (present when ok=false).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl ConfigResponse {
    /// Create a success response.
    pub fn success(status: Status, request_id: String, payload: serde_json::Value) -> Self {
        Self {
            status,
            request_id,
            ok: true,
            payload: Some(payload),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(status: Status, request_id: String, error: ApiError) -> Self {
        Self {
            status,
            request_id,
            ok: false,
            payload: None,
            error: Some(error),
        }
    }
}
