//! Mock deployment executor.
//!
//! Used by tests to exercise the rollback and timeout paths, and by the
//! CLI `sync` command as its deploy target. Failure injection is
//! configuration, checked on every deploy call.

use crate::release::{DeployError, DeployPlan, DeploymentExecutor};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

/// Failure behavior for the mock executor.
#[derive(Debug, Clone, Default)]
pub struct FailurePlan {
    /// Error message to fail with (if any).
    pub message: Option<String>,
    /// Delay to add before responding.
    pub delay: Option<Duration>,
    /// Number of calls to fail before succeeding (None = always fail).
    pub fail_count: Option<u32>,
}

impl FailurePlan {
    /// Fail every deploy with this message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            delay: None,
            fail_count: None,
        }
    }

    /// Sleep before responding, then succeed. Pair with a short trigger
    /// timeout to exercise the deadline path.
    pub fn delay(duration: Duration) -> Self {
        Self {
            message: None,
            delay: Some(duration),
            fail_count: None,
        }
    }

    /// Limit the failure to the first `count` calls.
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }

    /// Sleep before the failure or success fires.
    pub fn with_delay(mut self, duration: Duration) -> Self {
        self.delay = Some(duration);
        self
    }
}

/// Records every successful deploy and fails on demand.
#[derive(Debug, Default)]
pub struct MockExecutor {
    deployed: Mutex<Vec<DeployPlan>>,
    failure: Mutex<Option<FailurePlan>>,
    calls: Mutex<u32>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the failure behavior for subsequent deploys.
    pub fn inject(&self, plan: FailurePlan) {
        *self.failure.lock().unwrap() = Some(plan);
    }

    /// Remove any configured failure.
    pub fn clear(&self) {
        *self.failure.lock().unwrap() = None;
        *self.calls.lock().unwrap() = 0;
    }

    /// Plans that deployed successfully, in order.
    pub fn deployed(&self) -> Vec<DeployPlan> {
        self.deployed.lock().unwrap().clone()
    }

    /// Number of successful deploys.
    pub fn deploy_count(&self) -> usize {
        self.deployed.lock().unwrap().len()
    }

    /// Number of deploy calls, successful or not.
    pub fn call_count(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

impl DeploymentExecutor for MockExecutor {
    fn deploy(&self, plan: &DeployPlan) -> Result<(), DeployError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        let failure = self.failure.lock().unwrap().clone();
        if let Some(config) = failure {
            if let Some(delay) = config.delay {
                thread::sleep(delay);
            }
            let active = match config.fail_count {
                Some(limit) => call <= limit,
                None => true,
            };
            if active {
                if let Some(message) = config.message {
                    return Err(DeployError::Failed(message));
                }
            }
        }
        self.deployed.lock().unwrap().push(plan.clone());
        Ok(())
    }
}
