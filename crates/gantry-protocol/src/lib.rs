//! Gantry config API envelope.
//!
//! Typed request/response types for the application config resource. The
//! HTTP transport lives outside this workspace; this crate pins down the
//! method set, status codes, and the stable error vocabulary clients
//! automate against.

pub mod error;
pub mod method;
pub mod request;
pub mod response;

pub use error::{ApiError, ErrorCode};
pub use method::Method;
pub use request::ConfigRequest;
pub use response::{ConfigResponse, Status};

/// API generation the config resource belongs to.
pub const API_VERSION: &str = "v2";
