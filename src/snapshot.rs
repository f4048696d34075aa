//! Immutable configuration snapshots.
//!
//! A snapshot is one version in an application's append-only config chain.
//! Snapshots are value types: once appended they are never mutated, and a
//! merge produces a successor with a fresh id rather than editing in place.

use chrono::{DateTime, Utc};
use gantry_validate::Namespace;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// One namespace's key/value pairs. BTreeMap keeps iteration and
/// serialization order deterministic, which the fingerprint relies on.
pub type NamespaceMap = BTreeMap<String, String>;

/// The env var that names the container port. Registry credentials are
/// only deployable when it is present.
pub const PORT_VAR: &str = "PORT";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("canonicalization failed: {0}")]
    Canonicalize(String),
}

/// A single immutable configuration version.
///
/// Field order here is the serialization order clients see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Version id (UUID v4).
    pub id: String,
    /// The caller whose request created this version.
    pub owner: String,
    /// When this version was created.
    pub created: DateTime<Utc>,
    /// Equal to `created`; versions are never edited.
    pub updated: DateTime<Utc>,
    /// Application this version belongs to.
    pub app: String,
    /// Environment variables.
    pub values: NamespaceMap,
    /// Per-process-type memory limits.
    pub memory: NamespaceMap,
    /// Per-process-type cpu limits.
    pub cpu: NamespaceMap,
    /// Scheduling tags.
    pub tags: NamespaceMap,
    /// Registry credentials (keys stored lower-case).
    pub registry: NamespaceMap,
}

impl ConfigSnapshot {
    /// The empty first version of an application's chain.
    pub fn empty(app: impl Into<String>, owner: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner: owner.into(),
            created: now,
            updated: now,
            app: app.into(),
            values: NamespaceMap::new(),
            memory: NamespaceMap::new(),
            cpu: NamespaceMap::new(),
            tags: NamespaceMap::new(),
            registry: NamespaceMap::new(),
        }
    }

    /// A new version carrying this one's maps, with a fresh id and
    /// timestamps and the acting caller as owner.
    pub fn successor(&self, owner: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner: owner.into(),
            created: now,
            updated: now,
            app: self.app.clone(),
            values: self.values.clone(),
            memory: self.memory.clone(),
            cpu: self.cpu.clone(),
            tags: self.tags.clone(),
            registry: self.registry.clone(),
        }
    }

    pub fn namespace(&self, ns: Namespace) -> &NamespaceMap {
        match ns {
            Namespace::Values => &self.values,
            Namespace::Memory => &self.memory,
            Namespace::Cpu => &self.cpu,
            Namespace::Tags => &self.tags,
            Namespace::Registry => &self.registry,
        }
    }

    pub fn namespace_mut(&mut self, ns: Namespace) -> &mut NamespaceMap {
        match ns {
            Namespace::Values => &mut self.values,
            Namespace::Memory => &mut self.memory,
            Namespace::Cpu => &mut self.cpu,
            Namespace::Tags => &mut self.tags,
            Namespace::Registry => &mut self.registry,
        }
    }

    /// Content fingerprint: SHA-256 hex digest of the RFC 8785 (JCS)
    /// canonical JSON of the five namespace maps. Version metadata (id,
    /// owner, timestamps) is excluded, so two versions with identical
    /// content share a fingerprint.
    pub fn fingerprint(&self) -> Result<String, SnapshotError> {
        let mut namespaces: BTreeMap<&str, &NamespaceMap> = BTreeMap::new();
        for ns in Namespace::ALL {
            namespaces.insert(ns.as_str(), self.namespace(ns));
        }
        let jcs = serde_json_canonicalizer::to_vec(&namespaces)
            .map_err(|e| SnapshotError::Canonicalize(e.to_string()))?;
        let mut hasher = Sha256::new();
        hasher.update(&jcs);
        Ok(hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for ConfigSnapshot {
    /// Short form used in logs and release names: `{app}-{id prefix}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.id.get(..7).unwrap_or(&self.id);
        write!(f, "{}-{}", self.app, short)
    }
}
