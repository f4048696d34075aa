//! State replay.
//!
//! After a restore or control-plane rebuild, the scheduler may be behind
//! the store. `publish_state` sweeps every application and pushes its
//! current config back out: stored maps are re-validated against the
//! current grammars, apps without builds are skipped with a note, and
//! per-app failures are collected without aborting the sweep.

use crate::release::{DeployPlan, ReleaseTrigger};
use crate::snapshot::{ConfigSnapshot, PORT_VAR};
use crate::store::{AppRecord, BuildRef, ConfigStore, MemoryStore, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// One application that could not be republished.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublishFailure {
    pub app: String,
    pub detail: String,
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishReport {
    /// Apps redeployed successfully.
    pub published: Vec<String>,
    /// Apps skipped because nothing was deployable (no config or no build).
    pub skipped: Vec<String>,
    /// Apps whose stored state failed validation or whose deploy failed.
    pub errors: Vec<PublishFailure>,
}

impl PublishReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Error)]
enum AppPublishError {
    #[error("stored config is no longer valid: {0}")]
    StaleConfig(String),
    #[error("{0}")]
    Deploy(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Replay every application's current config into the scheduler.
pub fn publish_state(
    store: &dyn ConfigStore,
    trigger: &ReleaseTrigger,
) -> Result<PublishReport, StoreError> {
    sweep(store, Some(trigger))
}

/// The validation half of a sweep: report what `publish_state` would do
/// without deploying anything.
pub fn check_state(store: &dyn ConfigStore) -> Result<PublishReport, StoreError> {
    sweep(store, None)
}

fn sweep(
    store: &dyn ConfigStore,
    trigger: Option<&ReleaseTrigger>,
) -> Result<PublishReport, StoreError> {
    let mut report = PublishReport::default();
    for app in store.list_apps()? {
        match publish_app(store, trigger, &app) {
            Ok(Some(config)) => {
                if trigger.is_some() {
                    info!(app = %app.id, config = %config, "republished");
                }
                report.published.push(app.id);
            }
            Ok(None) => {
                warn!(app = %app.id, "nothing deployable, skipping");
                report.skipped.push(app.id);
            }
            Err(e) => {
                warn!(app = %app.id, error = %e, "republish failed, continuing sweep");
                report.errors.push(PublishFailure {
                    app: app.id,
                    detail: e.to_string(),
                });
            }
        }
    }
    Ok(report)
}

/// Returns the republished snapshot, or None when the app has nothing
/// deployable.
fn publish_app(
    store: &dyn ConfigStore,
    trigger: Option<&ReleaseTrigger>,
    app: &AppRecord,
) -> Result<Option<ConfigSnapshot>, AppPublishError> {
    let Some(snapshot) = store.current_config(&app.id)? else {
        return Ok(None);
    };
    // Stored state may predate today's grammars; catch it here rather
    // than shipping it to the scheduler.
    for ns in gantry_validate::Namespace::ALL {
        gantry_validate::validate_map(ns, snapshot.namespace(ns))
            .map_err(|e| AppPublishError::StaleConfig(e.to_string()))?;
    }
    if !snapshot.registry.is_empty() && !snapshot.values.contains_key(PORT_VAR) {
        return Err(AppPublishError::StaleConfig(
            "registry credentials present without PORT".to_string(),
        ));
    }
    let Some(build) = store.latest_build(&app.id)? else {
        return Ok(None);
    };
    if let Some(trigger) = trigger {
        trigger
            .run(DeployPlan::new(&snapshot, &build))
            .map_err(|e| AppPublishError::Deploy(e.to_string()))?;
    }
    Ok(Some(snapshot))
}

#[derive(Debug, Error)]
pub enum StateFileError {
    #[error("failed to read state file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse state file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Serialized platform state: apps, full config chains (oldest first),
/// and the latest build per app. This is the interchange format the
/// `sync` command consumes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateFile {
    #[serde(default)]
    pub apps: Vec<AppRecord>,
    #[serde(default)]
    pub configs: Vec<ConfigSnapshot>,
    #[serde(default)]
    pub builds: BTreeMap<String, BuildRef>,
}

impl StateFile {
    pub fn load(path: &Path) -> Result<Self, StateFileError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Materialize the state into a fresh in-memory store.
    pub fn into_store(self) -> Result<MemoryStore, StateFileError> {
        let store = MemoryStore::new();
        for app in self.apps {
            store.insert_app(app);
        }
        for snapshot in &self.configs {
            store.append_config(snapshot)?;
        }
        for (app, build) in self.builds {
            store.insert_build(&app, build);
        }
        Ok(store)
    }

    /// Load a state file and materialize it in one step.
    pub fn load_store(path: &Path) -> Result<MemoryStore, StateFileError> {
        Self::load(path)?.into_store()
    }
}
