//! The commit pipeline.
//!
//! `ConfigEngine` owns the one mutating path in the system: merge a patch
//! over the current version, validate it, persist the result, and roll the
//! application onto it. Commits to the same application are serialized by
//! a per-app lock held from the current-version read through deploy and
//! rollback. Reads take the same lock, so a version whose deploy is still
//! in flight (and may yet roll back) is never served as current. Different
//! applications never wait on each other.

use crate::merge;
use crate::patch::ConfigPatch;
use crate::release::{DeployError, DeployPlan, ReleaseTrigger};
use crate::snapshot::{ConfigSnapshot, SnapshotError, PORT_VAR};
use crate::store::{AppRecord, ConfigStore, StoreError};
use gantry_validate::{Namespace, ValidationError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("application '{0}' not found")]
    UnknownApp(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Client-facing message stays generic; the cause is logged server-side.
    #[error("deployment failed for this configuration")]
    Deploy(#[source] DeployError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Result of a commit: the version now current, and whether this commit
/// created it.
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub snapshot: ConfigSnapshot,
    pub created: bool,
}

/// Merge `patch` over `current` into a candidate successor version.
/// Pure: nothing is persisted and nothing is deployed. `commit` runs this
/// under the app lock; the CLI uses it directly for previews.
pub fn merge_patch(
    current: &ConfigSnapshot,
    identity: &str,
    patch: &ConfigPatch,
) -> Result<ConfigSnapshot, ValidationError> {
    let mut next = current.successor(identity);
    for (ns, ops) in patch.namespaces() {
        *next.namespace_mut(ns) = merge::apply(ns, next.namespace(ns), ops)?;
    }

    // Cross-namespace rule: registry credentials are undeployable without
    // a known container port, whichever side the patch touched.
    if !next.registry.is_empty() && !next.values.contains_key(PORT_VAR) {
        return Err(ValidationError::new(
            Namespace::Registry,
            PORT_VAR,
            "registry credentials require PORT to be set in values",
        ));
    }
    Ok(next)
}

pub struct ConfigEngine {
    store: Arc<dyn ConfigStore>,
    trigger: ReleaseTrigger,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ConfigEngine {
    pub fn new(store: Arc<dyn ConfigStore>, trigger: ReleaseTrigger) -> Self {
        Self {
            store,
            trigger,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Register an application and seed its chain with an empty config, so
    /// a fresh app serves GET with a real version id.
    pub fn register_app(&self, app: &str, owner: &str) -> Result<AppRecord, EngineError> {
        let record = self.store.create_app(app, owner)?;
        self.store.append_config(&ConfigSnapshot::empty(app, owner))?;
        info!(app, owner, "application registered");
        Ok(record)
    }

    /// Look up an application, failing on unknown ids.
    pub fn app(&self, app: &str) -> Result<AppRecord, EngineError> {
        self.store
            .get_app(app)?
            .ok_or_else(|| EngineError::UnknownApp(app.to_string()))
    }

    /// The application's current config, read under the app lock so tentative
    /// versions mid-deploy are never visible. Falls back to a synthesized
    /// empty version for stores whose chains were loaded without one.
    pub fn current(&self, app: &str) -> Result<ConfigSnapshot, EngineError> {
        let record = self.app(app)?;
        let lock = self.app_lock(app);
        let _guard = lock.lock().unwrap();
        match self.store.current_config(app)? {
            Some(snapshot) => Ok(snapshot),
            None => Ok(ConfigSnapshot::empty(app, &record.owner)),
        }
    }

    /// The full version chain, oldest first, read under the app lock.
    pub fn history(&self, app: &str) -> Result<Vec<ConfigSnapshot>, EngineError> {
        self.app(app)?;
        let lock = self.app_lock(app);
        let _guard = lock.lock().unwrap();
        Ok(self.store.config_history(app)?)
    }

    fn app_lock(&self, app: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        Arc::clone(locks.entry(app.to_string()).or_default())
    }

    /// Merge `patch` over the application's current config and make the
    /// result current. No net change returns the current version as-is.
    /// When a build exists, the new version is deployed before the commit
    /// is acknowledged; a failed or timed-out deploy deletes the version
    /// and restores the previous one as current.
    pub fn commit(
        &self,
        app: &str,
        identity: &str,
        patch: &ConfigPatch,
    ) -> Result<CommitOutcome, EngineError> {
        let record = self.app(app)?;
        let lock = self.app_lock(app);
        let _guard = lock.lock().unwrap();

        let current = match self.store.current_config(app)? {
            Some(snapshot) => snapshot,
            None => ConfigSnapshot::empty(app, &record.owner),
        };

        let next = merge_patch(&current, identity, patch)?;

        let fingerprint = next.fingerprint()?;
        if fingerprint == current.fingerprint()? {
            debug!(app, fingerprint, "no net config change, keeping current version");
            return Ok(CommitOutcome {
                snapshot: current,
                created: false,
            });
        }

        self.store.append_config(&next)?;
        info!(app, config = %next, fingerprint, "config version created");

        if let Some(build) = self.store.latest_build(app)? {
            let plan = DeployPlan::new(&next, &build);
            if let Err(cause) = self.trigger.run(plan) {
                warn!(app, config = %next, %cause, "deploy failed, rolling back config version");
                self.store.delete_config(app, &next.id)?;
                return Err(EngineError::Deploy(cause));
            }
            info!(app, config = %next, image = %build.image, "deployed");
        }

        Ok(CommitOutcome {
            snapshot: next,
            created: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FailurePlan, MockExecutor};
    use crate::release::DeploymentExecutor;
    use crate::store::MemoryStore;
    use std::time::Duration;

    fn make_engine() -> (ConfigEngine, Arc<MemoryStore>, Arc<MockExecutor>) {
        let store = Arc::new(MemoryStore::new());
        let executor = Arc::new(MockExecutor::new());
        let trigger = ReleaseTrigger::new(Arc::clone(&executor) as Arc<dyn DeploymentExecutor>);
        let engine = ConfigEngine::new(Arc::clone(&store) as Arc<dyn ConfigStore>, trigger);
        (engine, store, executor)
    }

    fn set(ns: Namespace, key: &str, value: &str) -> ConfigPatch {
        let mut patch = ConfigPatch::default();
        patch.set(ns, key, value);
        patch
    }

    fn unset(ns: Namespace, key: &str) -> ConfigPatch {
        let mut patch = ConfigPatch::default();
        patch.unset(ns, key);
        patch
    }

    #[test]
    fn test_register_seeds_empty_config() {
        let (engine, _store, _executor) = make_engine();
        engine.register_app("shiny-owl", "alice").unwrap();
        let current = engine.current("shiny-owl").unwrap();
        assert!(current.values.is_empty());
        assert_eq!(current.owner, "alice");
        assert_eq!(engine.history("shiny-owl").unwrap().len(), 1);
    }

    #[test]
    fn test_commit_creates_new_version() {
        let (engine, _store, _executor) = make_engine();
        engine.register_app("shiny-owl", "alice").unwrap();
        let before = engine.current("shiny-owl").unwrap();

        let outcome = engine
            .commit("shiny-owl", "alice", &set(Namespace::Values, "FOO", "bar"))
            .unwrap();
        assert!(outcome.created);
        assert_ne!(outcome.snapshot.id, before.id);
        assert_eq!(outcome.snapshot.values.get("FOO"), Some(&"bar".to_string()));
        assert_eq!(engine.history("shiny-owl").unwrap().len(), 2);
    }

    #[test]
    fn test_overwrite_same_key_creates_version() {
        let (engine, _store, _executor) = make_engine();
        engine.register_app("shiny-owl", "alice").unwrap();
        let first = engine
            .commit("shiny-owl", "alice", &set(Namespace::Values, "FOO", "bar"))
            .unwrap();
        let second = engine
            .commit("shiny-owl", "alice", &set(Namespace::Values, "FOO", "baz"))
            .unwrap();
        assert!(second.created);
        assert_ne!(first.snapshot.id, second.snapshot.id);
        assert_eq!(second.snapshot.values.get("FOO"), Some(&"baz".to_string()));
    }

    #[test]
    fn test_noop_commit_keeps_current_version() {
        let (engine, _store, _executor) = make_engine();
        engine.register_app("shiny-owl", "alice").unwrap();
        let first = engine
            .commit("shiny-owl", "alice", &set(Namespace::Values, "FOO", "bar"))
            .unwrap();

        let repeat = engine
            .commit("shiny-owl", "alice", &set(Namespace::Values, "FOO", "bar"))
            .unwrap();
        assert!(!repeat.created);
        assert_eq!(repeat.snapshot.id, first.snapshot.id);
        assert_eq!(engine.history("shiny-owl").unwrap().len(), 2);
    }

    #[test]
    fn test_empty_patch_is_noop() {
        let (engine, _store, _executor) = make_engine();
        engine.register_app("shiny-owl", "alice").unwrap();
        let before = engine.current("shiny-owl").unwrap();
        let outcome = engine
            .commit("shiny-owl", "alice", &ConfigPatch::default())
            .unwrap();
        assert!(!outcome.created);
        assert_eq!(outcome.snapshot.id, before.id);
    }

    #[test]
    fn test_unset_then_reset_round_trips() {
        let (engine, _store, _executor) = make_engine();
        engine.register_app("shiny-owl", "alice").unwrap();
        engine
            .commit("shiny-owl", "alice", &set(Namespace::Values, "PORT", "5000"))
            .unwrap();
        let without = engine
            .commit("shiny-owl", "alice", &unset(Namespace::Values, "PORT"))
            .unwrap();
        assert!(without.created);
        assert!(!without.snapshot.values.contains_key("PORT"));
    }

    #[test]
    fn test_namespaces_stay_isolated() {
        let (engine, _store, _executor) = make_engine();
        engine.register_app("shiny-owl", "alice").unwrap();
        engine
            .commit("shiny-owl", "alice", &set(Namespace::Memory, "web", "1G"))
            .unwrap();
        let outcome = engine
            .commit("shiny-owl", "alice", &set(Namespace::Values, "FOO", "bar"))
            .unwrap();
        assert_eq!(outcome.snapshot.memory.get("web"), Some(&"1G".to_string()));
        assert_eq!(outcome.snapshot.values.get("FOO"), Some(&"bar".to_string()));
    }

    #[test]
    fn test_validation_failure_leaves_no_version() {
        let (engine, _store, _executor) = make_engine();
        engine.register_app("shiny-owl", "alice").unwrap();
        let err = engine
            .commit("shiny-owl", "alice", &set(Namespace::Cpu, "web", "not a number"))
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(engine.history("shiny-owl").unwrap().len(), 1);
    }

    #[test]
    fn test_registry_requires_port() {
        let (engine, _store, _executor) = make_engine();
        engine.register_app("shiny-owl", "alice").unwrap();

        let err = engine
            .commit("shiny-owl", "alice", &set(Namespace::Registry, "username", "bob"))
            .unwrap_err();
        match err {
            EngineError::Validation(e) => {
                assert_eq!(e.namespace, Namespace::Registry);
                assert!(e.reason.contains("PORT"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        engine
            .commit("shiny-owl", "alice", &set(Namespace::Values, "PORT", "80"))
            .unwrap();
        let outcome = engine
            .commit("shiny-owl", "alice", &set(Namespace::Registry, "username", "bob"))
            .unwrap();
        assert_eq!(
            outcome.snapshot.registry.get("username"),
            Some(&"bob".to_string())
        );
    }

    #[test]
    fn test_unsetting_port_with_registry_present_fails() {
        let (engine, _store, _executor) = make_engine();
        engine.register_app("shiny-owl", "alice").unwrap();
        let mut patch = ConfigPatch::default();
        patch.set(Namespace::Values, "PORT", "80");
        patch.set(Namespace::Registry, "username", "bob");
        engine.commit("shiny-owl", "alice", &patch).unwrap();

        let err = engine
            .commit("shiny-owl", "alice", &unset(Namespace::Values, "PORT"))
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        // Unsetting the credentials first makes the port removable.
        engine
            .commit("shiny-owl", "alice", &unset(Namespace::Registry, "username"))
            .unwrap();
        engine
            .commit("shiny-owl", "alice", &unset(Namespace::Values, "PORT"))
            .unwrap();
    }

    #[test]
    fn test_owner_is_acting_identity() {
        let (engine, store, _executor) = make_engine();
        engine.register_app("shiny-owl", "alice").unwrap();
        store.grant("shiny-owl", "carol").unwrap();
        let outcome = engine
            .commit("shiny-owl", "carol", &set(Namespace::Values, "FOO", "bar"))
            .unwrap();
        assert_eq!(outcome.snapshot.owner, "carol");
    }

    #[test]
    fn test_unknown_app_rejected() {
        let (engine, _store, _executor) = make_engine();
        let err = engine
            .commit("ghost", "alice", &set(Namespace::Values, "FOO", "bar"))
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownApp(_)));
        assert!(matches!(
            engine.current("ghost").unwrap_err(),
            EngineError::UnknownApp(_)
        ));
    }

    #[test]
    fn test_no_build_means_no_deploy() {
        let (engine, _store, executor) = make_engine();
        engine.register_app("shiny-owl", "alice").unwrap();
        engine
            .commit("shiny-owl", "alice", &set(Namespace::Values, "FOO", "bar"))
            .unwrap();
        assert_eq!(executor.call_count(), 0);
    }

    #[test]
    fn test_deploy_runs_with_build_present() {
        let (engine, store, executor) = make_engine();
        engine.register_app("shiny-owl", "alice").unwrap();
        store.set_build("shiny-owl", "registry/owl:v1").unwrap();
        let outcome = engine
            .commit("shiny-owl", "alice", &set(Namespace::Values, "PORT", "5000"))
            .unwrap();
        let deployed = executor.deployed();
        assert_eq!(deployed.len(), 1);
        assert_eq!(deployed[0].config_id, outcome.snapshot.id);
        assert_eq!(deployed[0].image, "registry/owl:v1");
        assert_eq!(deployed[0].env.get("PORT"), Some(&"5000".to_string()));
    }

    #[test]
    fn test_failed_deploy_rolls_back() {
        let (engine, store, executor) = make_engine();
        engine.register_app("shiny-owl", "alice").unwrap();
        engine
            .commit("shiny-owl", "alice", &set(Namespace::Values, "FOO", "bar"))
            .unwrap();
        let before = engine.current("shiny-owl").unwrap();

        store.set_build("shiny-owl", "registry/owl:v1").unwrap();
        executor.inject(FailurePlan::error("scheduler exploded"));
        let err = engine
            .commit("shiny-owl", "alice", &set(Namespace::Values, "FOO", "baz"))
            .unwrap_err();
        assert!(matches!(err, EngineError::Deploy(DeployError::Failed(_))));

        let after = engine.current("shiny-owl").unwrap();
        assert_eq!(after.id, before.id);
        assert_eq!(after.values.get("FOO"), Some(&"bar".to_string()));
        assert_eq!(engine.history("shiny-owl").unwrap().len(), 2);

        // The rolled-back content commits cleanly once the scheduler recovers.
        executor.clear();
        let retried = engine
            .commit("shiny-owl", "alice", &set(Namespace::Values, "FOO", "baz"))
            .unwrap();
        assert!(retried.created);
        assert_eq!(retried.snapshot.values.get("FOO"), Some(&"baz".to_string()));
    }

    #[test]
    fn test_timed_out_deploy_rolls_back() {
        let store = Arc::new(MemoryStore::new());
        let executor = Arc::new(MockExecutor::new());
        let trigger = ReleaseTrigger::with_timeout(
            Arc::clone(&executor) as Arc<dyn DeploymentExecutor>,
            Duration::from_millis(20),
        );
        let engine = ConfigEngine::new(Arc::clone(&store) as Arc<dyn ConfigStore>, trigger);

        engine.register_app("shiny-owl", "alice").unwrap();
        store.set_build("shiny-owl", "registry/owl:v1").unwrap();
        executor.inject(FailurePlan::delay(Duration::from_millis(200)));

        let before = engine.current("shiny-owl").unwrap();
        let err = engine
            .commit("shiny-owl", "alice", &set(Namespace::Values, "FOO", "bar"))
            .unwrap_err();
        assert!(matches!(err, EngineError::Deploy(DeployError::TimedOut(_))));
        assert_eq!(engine.current("shiny-owl").unwrap().id, before.id);
    }
}
