//! Request dispatch for the config resource.
//!
//! `ConfigApi` is the authorization and shaping layer over the engine: it
//! resolves the application, enforces the access policy, routes by method,
//! and maps engine errors onto the stable wire codes. It returns complete
//! envelopes; nothing below it knows about statuses.

use crate::access::AccessPolicy;
use crate::engine::{CommitOutcome, ConfigEngine, EngineError};
use crate::snapshot::ConfigSnapshot;
use gantry_protocol::{ApiError, ConfigRequest, ConfigResponse, Method, Status};
use tracing::debug;

use crate::patch::ConfigPatch;

/// Generate a request id (ULID, lower-cased) for callers that do not
/// bring their own correlation ids.
pub fn generate_request_id() -> String {
    ulid::Ulid::new().to_string().to_lowercase()
}

/// One (status, error) pair on the failure path.
struct Failure {
    status: Status,
    error: ApiError,
}

impl Failure {
    fn new(status: Status, error: ApiError) -> Self {
        Self { status, error }
    }
}

pub struct ConfigApi {
    engine: ConfigEngine,
    policy: AccessPolicy,
}

impl ConfigApi {
    pub fn new(engine: ConfigEngine, policy: AccessPolicy) -> Self {
        Self { engine, policy }
    }

    pub fn engine(&self) -> &ConfigEngine {
        &self.engine
    }

    /// Serve one request. Always returns an envelope; failures are encoded,
    /// never panicked or dropped.
    pub fn dispatch(&self, request: &ConfigRequest) -> ConfigResponse {
        debug!(
            method = %request.method,
            app = %request.app,
            identity = %request.identity,
            request_id = %request.request_id,
            "config request"
        );
        match self.handle(request) {
            Ok((status, payload)) => {
                ConfigResponse::success(status, request.request_id.clone(), payload)
            }
            Err(failure) => {
                ConfigResponse::error(failure.status, request.request_id.clone(), failure.error)
            }
        }
    }

    fn handle(&self, request: &ConfigRequest) -> Result<(Status, serde_json::Value), Failure> {
        // Existence first, then access, then method. A caller without
        // access learns nothing beyond the 403.
        let record = self
            .engine
            .app(&request.app)
            .map_err(|_| Failure::new(Status::NotFound, ApiError::app_not_found(&request.app)))?;
        if !self.policy.can_access(&request.identity, &record) {
            return Err(Failure::new(
                Status::Forbidden,
                ApiError::unauthorized(&request.identity, &request.app),
            ));
        }
        match request.method {
            Method::Get => {
                let snapshot = self.engine.current(&request.app).map_err(internal)?;
                Ok((Status::Ok, encode(&snapshot)?))
            }
            Method::Post => self.handle_post(request),
            other => Err(Failure::new(
                Status::MethodNotAllowed,
                ApiError::method_not_allowed(other.as_str()),
            )),
        }
    }

    fn handle_post(&self, request: &ConfigRequest) -> Result<(Status, serde_json::Value), Failure> {
        let patch = ConfigPatch::from_body(&request.body).map_err(|e| {
            Failure::new(Status::BadRequest, ApiError::invalid_request(e.to_string()))
        })?;
        let CommitOutcome { snapshot, created } = self
            .engine
            .commit(&request.app, &request.identity, &patch)
            .map_err(|e| match e {
                EngineError::Validation(v) => Failure::new(
                    Status::BadRequest,
                    ApiError::validation_failed(v.namespace.as_str(), &v.key, &v.reason),
                ),
                EngineError::Deploy(_) => {
                    Failure::new(Status::BadRequest, ApiError::deploy_failed())
                }
                EngineError::UnknownApp(app) => {
                    Failure::new(Status::NotFound, ApiError::app_not_found(&app))
                }
                other => internal(other),
            })?;
        let status = if created { Status::Created } else { Status::Ok };
        Ok((status, encode(&snapshot)?))
    }
}

fn encode(snapshot: &ConfigSnapshot) -> Result<serde_json::Value, Failure> {
    serde_json::to_value(snapshot)
        .map_err(|e| Failure::new(Status::Internal, ApiError::internal(e.to_string())))
}

fn internal(error: EngineError) -> Failure {
    Failure::new(Status::Internal, ApiError::internal(error.to_string()))
}
