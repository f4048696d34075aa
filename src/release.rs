//! Deployment execution behind a bounded timeout.
//!
//! The scheduler is reached through [`DeploymentExecutor`], the one
//! blocking external call in the commit pipeline. [`ReleaseTrigger`] runs
//! it on a helper thread and gives up after a deadline; a timeout is
//! handled exactly like a failed deploy.

use crate::snapshot::{ConfigSnapshot, NamespaceMap};
use crate::store::BuildRef;
use serde::{Deserialize, Serialize};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Default deadline for a single deploy call.
pub const DEFAULT_DEPLOY_TIMEOUT: Duration = Duration::from_secs(120);

/// Everything the scheduler needs to roll an application onto a config
/// version: the image plus the full merged namespace content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployPlan {
    pub app: String,
    /// Config version being rolled out.
    pub config_id: String,
    /// Container image from the latest build.
    pub image: String,
    /// Environment for the containers.
    pub env: NamespaceMap,
    pub memory: NamespaceMap,
    pub cpu: NamespaceMap,
    pub tags: NamespaceMap,
    pub registry: NamespaceMap,
}

impl DeployPlan {
    pub fn new(snapshot: &ConfigSnapshot, build: &BuildRef) -> Self {
        Self {
            app: snapshot.app.clone(),
            config_id: snapshot.id.clone(),
            image: build.image.clone(),
            env: snapshot.values.clone(),
            memory: snapshot.memory.clone(),
            cpu: snapshot.cpu.clone(),
            tags: snapshot.tags.clone(),
            registry: snapshot.registry.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeployError {
    #[error("deploy failed: {0}")]
    Failed(String),
    #[error("deploy timed out after {0:?}")]
    TimedOut(Duration),
}

/// The scheduler seam. Implementations must tolerate being called from a
/// helper thread and may outlive a timed-out call.
pub trait DeploymentExecutor: Send + Sync {
    fn deploy(&self, plan: &DeployPlan) -> Result<(), DeployError>;
}

/// Runs deploys with a deadline.
pub struct ReleaseTrigger {
    executor: Arc<dyn DeploymentExecutor>,
    timeout: Duration,
}

impl ReleaseTrigger {
    pub fn new(executor: Arc<dyn DeploymentExecutor>) -> Self {
        Self::with_timeout(executor, DEFAULT_DEPLOY_TIMEOUT)
    }

    pub fn with_timeout(executor: Arc<dyn DeploymentExecutor>, timeout: Duration) -> Self {
        Self { executor, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one deploy to completion or deadline. On timeout the helper
    /// thread is left to finish on its own; the caller treats the version
    /// as failed either way.
    pub fn run(&self, plan: DeployPlan) -> Result<(), DeployError> {
        let (tx, rx) = mpsc::channel();
        let executor = Arc::clone(&self.executor);
        thread::spawn(move || {
            let result = executor.deploy(&plan);
            let _ = tx.send(result);
        });
        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(DeployError::TimedOut(self.timeout)),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(DeployError::Failed(
                "deploy worker exited without reporting a result".to_string(),
            )),
        }
    }
}
