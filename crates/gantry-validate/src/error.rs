//! Validation error shared by all namespace validators.

use crate::Namespace;
use thiserror::Error;

/// A rejected configuration entry.
///
/// `reason` is a complete human-readable sentence; clients match on its
/// content, so the phrasing of established messages is stable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{namespace}: {reason}")]
pub struct ValidationError {
    /// Namespace the entry belongs to.
    pub namespace: Namespace,
    /// Offending key, exactly as submitted.
    pub key: String,
    /// Why the entry was rejected.
    pub reason: String,
}

impl ValidationError {
    pub fn new(
        namespace: Namespace,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            namespace,
            key: key.into(),
            reason: reason.into(),
        }
    }
}
