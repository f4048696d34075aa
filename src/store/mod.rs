//! Persistence boundary.
//!
//! The engine talks to storage through [`ConfigStore`] only; the real
//! control plane binds this to its database. [`MemoryStore`] is the
//! reference implementation used by tests, dry runs, and state replay.

mod memory;

pub use memory::MemoryStore;

use crate::snapshot::ConfigSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// An application known to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRecord {
    /// Application id (also its DNS-safe name).
    pub id: String,
    /// The user who created the application.
    pub owner: String,
    /// Users granted access by the owner.
    #[serde(default)]
    pub collaborators: BTreeSet<String>,
    /// When the application was created.
    pub created: DateTime<Utc>,
}

impl AppRecord {
    pub fn new(id: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
            collaborators: BTreeSet::new(),
            created: Utc::now(),
        }
    }
}

/// The latest deployable image recorded for an application. Its presence
/// is what allows a config commit to trigger a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRef {
    /// Container image reference.
    pub image: String,
    /// When the build was recorded.
    pub created: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("application '{0}' already exists")]
    AppExists(String),
    #[error("application '{0}' not found")]
    UnknownApp(String),
    #[error("config version '{0}' not found")]
    UnknownVersion(String),
}

/// Storage operations the engine needs. Implementations are shared across
/// threads; all methods take `&self`.
pub trait ConfigStore: Send + Sync {
    /// Register a new application.
    fn create_app(&self, app: &str, owner: &str) -> Result<AppRecord, StoreError>;

    /// Look up an application.
    fn get_app(&self, app: &str) -> Result<Option<AppRecord>, StoreError>;

    /// Grant a user access to an application.
    fn grant(&self, app: &str, identity: &str) -> Result<(), StoreError>;

    /// All applications, ordered by id.
    fn list_apps(&self) -> Result<Vec<AppRecord>, StoreError>;

    /// The most recently appended config version, if any.
    fn current_config(&self, app: &str) -> Result<Option<ConfigSnapshot>, StoreError>;

    /// Append a new config version to the application's chain.
    fn append_config(&self, snapshot: &ConfigSnapshot) -> Result<(), StoreError>;

    /// Remove one version from the chain. The previous version becomes
    /// current again; this is the compensating half of a failed deploy.
    fn delete_config(&self, app: &str, id: &str) -> Result<(), StoreError>;

    /// The full chain, oldest first.
    fn config_history(&self, app: &str) -> Result<Vec<ConfigSnapshot>, StoreError>;

    /// The latest build recorded for the application.
    fn latest_build(&self, app: &str) -> Result<Option<BuildRef>, StoreError>;

    /// Record a build for the application.
    fn set_build(&self, app: &str, image: &str) -> Result<BuildRef, StoreError>;
}
