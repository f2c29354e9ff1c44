//! Updater settings loaded from `keepup.toml`.
//!
//! Every field has a default, so the file is optional and may name only the
//! keys a deployment wants to change:
//!
//! ```toml
//! staging_dir = ".update"
//! backup_dir = ".backup"
//! strict_rollback = true
//!
//! [network]
//! download_timeout_secs = 1200
//! ```

use crate::constants::{
    CHECK_TIMEOUT, CONNECT_TIMEOUT, DEFAULT_BACKUP_DIR, DEFAULT_RESERVED_PREFIX,
    DEFAULT_STAGING_DIR, DEFAULT_VERSION_FILE, DOWNLOAD_TIMEOUT, LOCK_TIMEOUT, NOTIFY_TIMEOUT,
    SETTINGS_FILE, default_user_agent,
};
use crate::core::KeepupError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Settings controlling where the updater keeps its files and how it behaves.
///
/// Paths are relative to the project root. See
/// [`UpdaterConfig`](super::UpdaterConfig) for the validated, resolved form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdaterSettings {
    /// Version descriptor file name.
    #[serde(default = "default_version_file")]
    pub version_file: String,

    /// Transient directory for the downloaded and extracted archive.
    #[serde(default = "default_staging_dir")]
    pub staging_dir: String,

    /// Transient directory for the critical-file snapshot.
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,

    /// Archive paths with a segment starting with this prefix are never merged.
    #[serde(default = "default_reserved_prefix")]
    pub reserved_prefix: String,

    /// Journal overwritten files so a failed merge also reverts non-critical files.
    #[serde(default = "default_strict_rollback")]
    pub strict_rollback: bool,

    /// Seconds to wait for another transaction to release the project lock.
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,

    /// Network timeouts and identification.
    #[serde(default)]
    pub network: NetworkSettings,
}

/// Network-related settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkSettings {
    /// Whole-request timeout for `keepup update`'s release check.
    #[serde(default = "default_check_timeout_secs")]
    pub check_timeout_secs: u64,

    /// Whole-request timeout for the startup notifier.
    #[serde(default = "default_notify_timeout_secs")]
    pub notify_timeout_secs: u64,

    /// Connect timeout for the archive download.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Overall deadline for the archive download.
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for UpdaterSettings {
    fn default() -> Self {
        Self {
            version_file: default_version_file(),
            staging_dir: default_staging_dir(),
            backup_dir: default_backup_dir(),
            reserved_prefix: default_reserved_prefix(),
            strict_rollback: default_strict_rollback(),
            lock_timeout_secs: default_lock_timeout_secs(),
            network: NetworkSettings::default(),
        }
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            check_timeout_secs: default_check_timeout_secs(),
            notify_timeout_secs: default_notify_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl UpdaterSettings {
    /// Loads `keepup.toml` from `project_root`, or the defaults if it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`KeepupError::ConfigError`] if the file exists but cannot be
    /// read or parsed, including unknown keys.
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = project_root.join(SETTINGS_FILE);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(&path).map_err(|e| KeepupError::ConfigError {
                file: SETTINGS_FILE.to_string(),
                reason: e.to_string(),
            })?;
        Self::from_toml(&content)
    }

    /// Parses settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            KeepupError::ConfigError {
                file: SETTINGS_FILE.to_string(),
                reason: e.message().to_string(),
            }
            .into()
        })
    }
}

impl NetworkSettings {
    /// Timeout for the explicit release check.
    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }

    /// Timeout for the startup notifier check.
    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs)
    }

    /// Connect timeout for the archive download.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Overall deadline for the archive download.
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

fn default_version_file() -> String {
    DEFAULT_VERSION_FILE.to_string()
}

fn default_staging_dir() -> String {
    DEFAULT_STAGING_DIR.to_string()
}

fn default_backup_dir() -> String {
    DEFAULT_BACKUP_DIR.to_string()
}

fn default_reserved_prefix() -> String {
    DEFAULT_RESERVED_PREFIX.to_string()
}

fn default_strict_rollback() -> bool {
    true
}

fn default_lock_timeout_secs() -> u64 {
    LOCK_TIMEOUT.as_secs()
}

fn default_check_timeout_secs() -> u64 {
    CHECK_TIMEOUT.as_secs()
}

fn default_notify_timeout_secs() -> u64 {
    NOTIFY_TIMEOUT.as_secs()
}

fn default_connect_timeout_secs() -> u64 {
    CONNECT_TIMEOUT.as_secs()
}

fn default_download_timeout_secs() -> u64 {
    DOWNLOAD_TIMEOUT.as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::find_kind;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = UpdaterSettings::default();
        assert_eq!(settings.version_file, "version.json");
        assert_eq!(settings.staging_dir, ".update");
        assert_eq!(settings.backup_dir, ".backup");
        assert_eq!(settings.reserved_prefix, ".");
        assert!(settings.strict_rollback);
        assert_eq!(settings.network.check_timeout(), Duration::from_secs(10));
        assert_eq!(settings.network.notify_timeout(), Duration::from_secs(5));
        assert!(settings.network.user_agent.starts_with("keepup/"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let settings = UpdaterSettings::load(temp.path()).unwrap();
        assert_eq!(settings, UpdaterSettings::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let settings = UpdaterSettings::from_toml(
            r#"
backup_dir = "_backup"
strict_rollback = false

[network]
download_timeout_secs = 30
"#,
        )
        .unwrap();

        assert_eq!(settings.backup_dir, "_backup");
        assert!(!settings.strict_rollback);
        assert_eq!(settings.staging_dir, ".update");
        assert_eq!(settings.network.download_timeout(), Duration::from_secs(30));
        assert_eq!(settings.network.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_unknown_key_is_config_error() {
        let err = UpdaterSettings::from_toml("stagingdir = \"x\"").unwrap_err();
        assert!(matches!(find_kind(&err), Some(KeepupError::ConfigError { .. })));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = UpdaterSettings::from_toml("backup_dir = [unterminated").unwrap_err();
        let kind = find_kind(&err).expect("classified error");
        assert!(matches!(kind, KeepupError::ConfigError { .. }));
        assert!(kind.is_config());
    }

    #[test]
    fn test_load_reads_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("keepup.toml"), "lock_timeout_secs = 1\n").unwrap();
        let settings = UpdaterSettings::load(temp.path()).unwrap();
        assert_eq!(settings.lock_timeout_secs, 1);
    }
}
