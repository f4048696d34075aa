//! Gantry Config - versioned configuration engine for a container platform
//!
//! This crate implements the config half of a platform control plane:
//! validated, namespaced configuration patches merged into immutable
//! versioned snapshots, with each accepted change triggering a bounded
//! deployment that is rolled back on failure.

pub mod access;
pub mod api;
pub mod engine;
pub mod merge;
pub mod mock;
pub mod patch;
pub mod publish;
pub mod release;
pub mod settings;
pub mod snapshot;
pub mod store;

pub use access::AccessPolicy;
pub use api::ConfigApi;
pub use engine::{merge_patch, CommitOutcome, ConfigEngine, EngineError};
pub use gantry_validate::{Namespace, ValidationError};
pub use mock::{FailurePlan, MockExecutor};
pub use patch::{ConfigPatch, PatchError, PatchOp};
pub use publish::{publish_state, PublishReport, StateFile};
pub use release::{DeployError, DeployPlan, DeploymentExecutor, ReleaseTrigger};
pub use settings::Settings;
pub use snapshot::{ConfigSnapshot, NamespaceMap};
pub use store::{AppRecord, BuildRef, ConfigStore, MemoryStore, StoreError};

pub use gantry_protocol as protocol;
