//! Engine settings.
//!
//! A small TOML file tunes the deploy timeout and names the platform
//! administrators. Everything has a default so a missing file or an
//! empty one is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Deploy timeouts outside this range are almost certainly typos.
pub const MIN_DEPLOY_TIMEOUT_SECS: u64 = 1;
pub const MAX_DEPLOY_TIMEOUT_SECS: u64 = 3600;

const DEFAULT_DEPLOY_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReleaseSettings {
    /// How long a single deploy may run before it is treated as failed.
    #[serde(default = "default_deploy_timeout")]
    pub deploy_timeout_seconds: u64,
}

fn default_deploy_timeout() -> u64 {
    DEFAULT_DEPLOY_TIMEOUT_SECS
}

impl Default for ReleaseSettings {
    fn default() -> Self {
        Self {
            deploy_timeout_seconds: DEFAULT_DEPLOY_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AccessSettings {
    /// Identities allowed to operate on every application.
    #[serde(default)]
    pub admins: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub release: ReleaseSettings,
    #[serde(default)]
    pub access: AccessSettings,
}

impl Settings {
    /// Read and validate settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let secs = self.release.deploy_timeout_seconds;
        if !(MIN_DEPLOY_TIMEOUT_SECS..=MAX_DEPLOY_TIMEOUT_SECS).contains(&secs) {
            return Err(SettingsError::Invalid(format!(
                "deploy_timeout_seconds must be between {} and {}, got {}",
                MIN_DEPLOY_TIMEOUT_SECS, MAX_DEPLOY_TIMEOUT_SECS, secs
            )));
        }
        Ok(())
    }

    pub fn deploy_timeout(&self) -> Duration {
        Duration::from_secs(self.release.deploy_timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn load_str(text: &str) -> Result<Settings, SettingsError> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", text).unwrap();
        Settings::load(file.path())
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        let settings = load_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.deploy_timeout(), Duration::from_secs(120));
        assert!(settings.access.admins.is_empty());
    }

    #[test]
    fn test_full_file() {
        let settings = load_str(
            "[release]\n\
             deploy_timeout_seconds = 30\n\
             \n\
             [access]\n\
             admins = [\"root\", \"ops\"]\n",
        )
        .unwrap();
        assert_eq!(settings.deploy_timeout(), Duration::from_secs(30));
        assert_eq!(settings.access.admins, vec!["root", "ops"]);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = load_str("[release]\ndeploy_timeout_seconds = 0\n").unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));
        assert!(err.to_string().contains("between 1 and 3600"));
    }

    #[test]
    fn test_oversized_timeout_rejected() {
        let err = load_str("[release]\ndeploy_timeout_seconds = 86400\n").unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = load_str("[release]\ndeploy_timeout_minutes = 5\n").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }
}
