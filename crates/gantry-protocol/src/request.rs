//! Request envelope.

use crate::method::Method;
use serde::{Deserialize, Serialize};

/// A request against one application's config resource.
///
/// `identity` is the already-authenticated caller; authentication itself
/// happens upstream of this envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigRequest {
    /// Request method.
    pub method: Method,
    /// Target application id.
    pub app: String,
    /// Authenticated caller.
    pub identity: String,
    /// Caller-chosen request ID for correlation.
    pub request_id: String,
    /// Patch body. Ignored for anything but POST.
    #[serde(default)]
    pub body: serde_json::Value,
}

impl ConfigRequest {
    pub fn new(
        method: Method,
        app: impl Into<String>,
        identity: impl Into<String>,
        request_id: impl Into<String>,
        body: serde_json::Value,
    ) -> Self {
        Self {
            method,
            app: app.into(),
            identity: identity.into(),
            request_id: request_id.into(),
            body,
        }
    }

    /// Build a GET request (empty body).
    pub fn get(
        app: impl Into<String>,
        identity: impl Into<String>,
        request_id: impl Into<String>,
    ) -> Self {
        Self::new(Method::Get, app, identity, request_id, serde_json::Value::Null)
    }

    /// Build a POST request carrying a patch body.
    pub fn post(
        app: impl Into<String>,
        identity: impl Into<String>,
        request_id: impl Into<String>,
        body: serde_json::Value,
    ) -> Self {
        Self::new(Method::Post, app, identity, request_id, body)
    }
}
