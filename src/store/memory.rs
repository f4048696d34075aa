//! In-memory reference store.

use super::{AppRecord, BuildRef, ConfigStore, StoreError};
use crate::snapshot::ConfigSnapshot;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    apps: HashMap<String, AppRecord>,
    /// Config chains by app id, oldest first. The last entry is current.
    chains: HashMap<String, Vec<ConfigSnapshot>>,
    builds: HashMap<String, BuildRef>,
}

/// HashMaps behind one Mutex. Good enough for tests and replay sweeps;
/// the per-app commit serialization lives in the engine, not here.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully-formed app record, collaborators and all. Used when
    /// loading persisted state; `create_app` is the runtime path.
    pub fn insert_app(&self, record: AppRecord) {
        let mut inner = self.inner.lock().unwrap();
        inner.chains.entry(record.id.clone()).or_default();
        inner.apps.insert(record.id.clone(), record);
    }

    /// Insert a build record verbatim, preserving its timestamp.
    pub fn insert_build(&self, app: &str, build: BuildRef) {
        self.inner.lock().unwrap().builds.insert(app.to_string(), build);
    }
}

impl ConfigStore for MemoryStore {
    fn create_app(&self, app: &str, owner: &str) -> Result<AppRecord, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.apps.contains_key(app) {
            return Err(StoreError::AppExists(app.to_string()));
        }
        let record = AppRecord::new(app, owner);
        inner.apps.insert(app.to_string(), record.clone());
        inner.chains.insert(app.to_string(), Vec::new());
        Ok(record)
    }

    fn get_app(&self, app: &str) -> Result<Option<AppRecord>, StoreError> {
        Ok(self.inner.lock().unwrap().apps.get(app).cloned())
    }

    fn grant(&self, app: &str, identity: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner
            .apps
            .get_mut(app)
            .ok_or_else(|| StoreError::UnknownApp(app.to_string()))?;
        record.collaborators.insert(identity.to_string());
        Ok(())
    }

    fn list_apps(&self) -> Result<Vec<AppRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut apps: Vec<AppRecord> = inner.apps.values().cloned().collect();
        apps.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(apps)
    }

    fn current_config(&self, app: &str) -> Result<Option<ConfigSnapshot>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let chain = inner
            .chains
            .get(app)
            .ok_or_else(|| StoreError::UnknownApp(app.to_string()))?;
        Ok(chain.last().cloned())
    }

    fn append_config(&self, snapshot: &ConfigSnapshot) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let chain = inner
            .chains
            .get_mut(&snapshot.app)
            .ok_or_else(|| StoreError::UnknownApp(snapshot.app.clone()))?;
        chain.push(snapshot.clone());
        Ok(())
    }

    fn delete_config(&self, app: &str, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let chain = inner
            .chains
            .get_mut(app)
            .ok_or_else(|| StoreError::UnknownApp(app.to_string()))?;
        let before = chain.len();
        chain.retain(|s| s.id != id);
        if chain.len() == before {
            return Err(StoreError::UnknownVersion(id.to_string()));
        }
        Ok(())
    }

    fn config_history(&self, app: &str) -> Result<Vec<ConfigSnapshot>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let chain = inner
            .chains
            .get(app)
            .ok_or_else(|| StoreError::UnknownApp(app.to_string()))?;
        Ok(chain.clone())
    }

    fn latest_build(&self, app: &str) -> Result<Option<BuildRef>, StoreError> {
        Ok(self.inner.lock().unwrap().builds.get(app).cloned())
    }

    fn set_build(&self, app: &str, image: &str) -> Result<BuildRef, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.apps.contains_key(app) {
            return Err(StoreError::UnknownApp(app.to_string()));
        }
        let build = BuildRef {
            image: image.to_string(),
            created: Utc::now(),
        };
        inner.builds.insert(app.to_string(), build.clone());
        Ok(build)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_snapshot(app: &str) -> ConfigSnapshot {
        ConfigSnapshot::empty(app, "autotest")
    }

    #[test]
    fn test_create_and_get_app() {
        let store = MemoryStore::new();
        let record = store.create_app("shiny-owl", "alice").unwrap();
        assert_eq!(record.owner, "alice");
        assert!(record.collaborators.is_empty());
        let found = store.get_app("shiny-owl").unwrap().unwrap();
        assert_eq!(found, record);
        assert!(store.get_app("missing").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_app_rejected() {
        let store = MemoryStore::new();
        store.create_app("shiny-owl", "alice").unwrap();
        let err = store.create_app("shiny-owl", "bob").unwrap_err();
        assert!(matches!(err, StoreError::AppExists(_)));
    }

    #[test]
    fn test_grant_adds_collaborator() {
        let store = MemoryStore::new();
        store.create_app("shiny-owl", "alice").unwrap();
        store.grant("shiny-owl", "carol").unwrap();
        let record = store.get_app("shiny-owl").unwrap().unwrap();
        assert!(record.collaborators.contains("carol"));
    }

    #[test]
    fn test_chain_append_and_current() {
        let store = MemoryStore::new();
        store.create_app("shiny-owl", "alice").unwrap();
        assert!(store.current_config("shiny-owl").unwrap().is_none());

        let first = make_snapshot("shiny-owl");
        let second = make_snapshot("shiny-owl");
        store.append_config(&first).unwrap();
        store.append_config(&second).unwrap();

        let current = store.current_config("shiny-owl").unwrap().unwrap();
        assert_eq!(current.id, second.id);
        let history = store.config_history("shiny-owl").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, first.id);
    }

    #[test]
    fn test_delete_restores_previous_current() {
        let store = MemoryStore::new();
        store.create_app("shiny-owl", "alice").unwrap();
        let first = make_snapshot("shiny-owl");
        let second = make_snapshot("shiny-owl");
        store.append_config(&first).unwrap();
        store.append_config(&second).unwrap();

        store.delete_config("shiny-owl", &second.id).unwrap();
        let current = store.current_config("shiny-owl").unwrap().unwrap();
        assert_eq!(current.id, first.id);

        let err = store.delete_config("shiny-owl", &second.id).unwrap_err();
        assert!(matches!(err, StoreError::UnknownVersion(_)));
    }

    #[test]
    fn test_unknown_app_errors() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.current_config("ghost").unwrap_err(),
            StoreError::UnknownApp(_)
        ));
        assert!(matches!(
            store.append_config(&make_snapshot("ghost")).unwrap_err(),
            StoreError::UnknownApp(_)
        ));
        assert!(matches!(
            store.set_build("ghost", "img").unwrap_err(),
            StoreError::UnknownApp(_)
        ));
    }

    #[test]
    fn test_builds() {
        let store = MemoryStore::new();
        store.create_app("shiny-owl", "alice").unwrap();
        assert!(store.latest_build("shiny-owl").unwrap().is_none());
        store.set_build("shiny-owl", "registry/owl:v1").unwrap();
        store.set_build("shiny-owl", "registry/owl:v2").unwrap();
        let build = store.latest_build("shiny-owl").unwrap().unwrap();
        assert_eq!(build.image, "registry/owl:v2");
    }

    #[test]
    fn test_list_apps_sorted() {
        let store = MemoryStore::new();
        store.create_app("zebra", "alice").unwrap();
        store.create_app("aardvark", "bob").unwrap();
        let apps = store.list_apps().unwrap();
        let ids: Vec<&str> = apps.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["aardvark", "zebra"]);
    }
}
