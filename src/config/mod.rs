//! Configuration for keepup
//!
//! Three inputs shape an update:
//!
//! 1. **Settings** (`keepup.toml`, optional) - where the updater keeps its
//!    transient directories, timeouts and rollback strictness
//! 2. **Version descriptor** (`version.json`) - the installed version, the
//!    release endpoint and the critical files
//! 3. **Command-line flags** - project directory and progress display
//!
//! [`UpdaterConfig`] resolves settings against a project root into explicit
//! absolute paths. It is built once and handed to the transaction, so nothing
//! in the update path depends on the process working directory or on fixed
//! directory names.
//!
//! # Examples
//!
//! ```rust,no_run
//! use keepup_cli::config::{UpdaterConfig, VersionDescriptor};
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = UpdaterConfig::for_project(Path::new("/opt/app"))?;
//! let descriptor = VersionDescriptor::load(&config)?;
//! println!("installed {} from {}", descriptor.version, descriptor.update_url);
//! # Ok(())
//! # }
//! ```

mod critical;
mod descriptor;
mod settings;

pub use critical::CriticalFileSet;
pub use descriptor::VersionDescriptor;
pub use settings::{NetworkSettings, UpdaterSettings};

use crate::constants::{
    EXTRACTED_DIR_NAME, JOURNAL_DIR_NAME, LOCK_FILE_NAME, SETTINGS_FILE, STAGED_ARCHIVE_NAME,
};
use crate::core::KeepupError;
use crate::utils::fs::{normalize_relative, paths_overlap};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolved runtime configuration for one project root.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Installation root. Every other path lives under it.
    pub project_root: PathBuf,
    /// Absolute path of the version descriptor.
    pub version_file: PathBuf,
    /// Absolute staging directory.
    pub staging_dir: PathBuf,
    /// Absolute backup directory.
    pub backup_dir: PathBuf,
    /// Staging directory relative to the root, `/`-joined.
    pub staging_rel: String,
    /// Backup directory relative to the root, `/`-joined.
    pub backup_rel: String,
    /// Segment prefix marking paths that are never merged.
    pub reserved_prefix: String,
    /// Whether the merger journals overwritten files for rollback.
    pub strict_rollback: bool,
    /// How long to wait for the project lock.
    pub lock_timeout: Duration,
    /// Network timeouts and user agent.
    pub network: NetworkSettings,
    /// Whether progress bars may be drawn.
    pub show_progress: bool,
}

impl UpdaterConfig {
    /// Loads `keepup.toml` from `project_root` (if present) and resolves it.
    pub fn for_project(project_root: &Path) -> Result<Self> {
        let settings = UpdaterSettings::load(project_root)?;
        Self::from_settings(project_root, settings)
    }

    /// Resolves the default settings against `project_root`.
    pub fn with_defaults(project_root: &Path) -> Result<Self> {
        Self::from_settings(project_root, UpdaterSettings::default())
    }

    /// Validates `settings` and resolves its paths against `project_root`.
    ///
    /// # Errors
    ///
    /// Returns [`KeepupError::ConfigError`] when the version file, staging or
    /// backup directory is not a relative path inside the root, when staging
    /// and backup overlap, or when the reserved prefix is empty.
    pub fn from_settings(project_root: &Path, settings: UpdaterSettings) -> Result<Self> {
        let project_root = std::path::absolute(project_root).map_err(|e| {
            KeepupError::ConfigError {
                file: SETTINGS_FILE.to_string(),
                reason: format!("cannot resolve project root {}: {e}", project_root.display()),
            }
        })?;

        let version_rel = relative_setting("version_file", &settings.version_file)?;
        let staging_rel = relative_setting("staging_dir", &settings.staging_dir)?;
        let backup_rel = relative_setting("backup_dir", &settings.backup_dir)?;

        if paths_overlap(&staging_rel, &backup_rel) {
            return Err(invalid_setting(
                "backup_dir",
                format!("'{backup_rel}' overlaps staging_dir '{staging_rel}'"),
            )
            .into());
        }
        if settings.reserved_prefix.is_empty() {
            return Err(invalid_setting("reserved_prefix", "must not be empty".to_string()).into());
        }

        Ok(Self {
            version_file: project_root.join(&version_rel),
            staging_dir: project_root.join(&staging_rel),
            backup_dir: project_root.join(&backup_rel),
            project_root,
            staging_rel,
            backup_rel,
            reserved_prefix: settings.reserved_prefix,
            strict_rollback: settings.strict_rollback,
            lock_timeout: Duration::from_secs(settings.lock_timeout_secs),
            network: settings.network,
            show_progress: true,
        })
    }

    /// Sets whether progress bars may be drawn.
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// The updater's own directories, relative and `/`-joined.
    pub fn reserved_dirs(&self) -> [&str; 2] {
        [self.staging_rel.as_str(), self.backup_rel.as_str()]
    }

    /// Lock file guarding this project root.
    pub fn lock_path(&self) -> PathBuf {
        self.project_root.join(LOCK_FILE_NAME)
    }

    /// Where the downloaded archive is staged.
    pub fn staged_archive_path(&self) -> PathBuf {
        self.staging_dir.join(STAGED_ARCHIVE_NAME)
    }

    /// Where the archive is extracted.
    pub fn extracted_dir(&self) -> PathBuf {
        self.staging_dir.join(EXTRACTED_DIR_NAME)
    }

    /// Where the merge journal keeps pre-images.
    pub fn journal_dir(&self) -> PathBuf {
        self.staging_dir.join(JOURNAL_DIR_NAME)
    }
}

fn relative_setting(key: &str, value: &str) -> Result<String, KeepupError> {
    normalize_relative(value).map_err(|reason| invalid_setting(key, format!("'{value}': {reason}")))
}

fn invalid_setting(key: &str, reason: String) -> KeepupError {
    KeepupError::ConfigError {
        file: SETTINGS_FILE.to_string(),
        reason: format!("{key} {reason}"),
    }
}
