//! Access policy for the config resource.
//!
//! Deny by default: a caller touches an application's config only as its
//! owner, as a granted collaborator, or as a platform administrator.

use crate::store::AppRecord;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    admins: BTreeSet<String>,
}

impl AccessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_admins<I, S>(admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            admins: admins.into_iter().map(Into::into).collect(),
        }
    }

    pub fn add_admin(&mut self, identity: impl Into<String>) {
        self.admins.insert(identity.into());
    }

    pub fn is_admin(&self, identity: &str) -> bool {
        self.admins.contains(identity)
    }

    /// Whether `identity` may read and write this application's config.
    /// Read and write carry the same requirement.
    pub fn can_access(&self, identity: &str, app: &AppRecord) -> bool {
        identity == app.owner || app.collaborators.contains(identity) || self.is_admin(identity)
    }
}
