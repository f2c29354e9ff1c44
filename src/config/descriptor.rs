//! The version descriptor shipped with the installed application.
//!
//! The descriptor is a JSON file at the project root:
//!
//! ```json
//! {
//!   "version": "1.0.0",
//!   "update_url": "https://api.github.com/repos/owner/app/releases/latest",
//!   "critical_files": ["config.json", "data/app.db"]
//! }
//! ```
//!
//! `critical_files` is optional; unknown fields are ignored so applications
//! can keep their own metadata in the same file.

use super::{CriticalFileSet, UpdaterConfig};
use crate::core::KeepupError;
use crate::version::Version;
use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RawDescriptor {
    version: String,
    update_url: String,
    #[serde(default)]
    critical_files: Vec<String>,
}

/// The installed version, where to look for releases, and what to protect.
///
/// Loaded once when a transaction opens and never re-read during it.
#[derive(Debug, Clone)]
pub struct VersionDescriptor {
    /// Installed version.
    pub version: Version,
    /// Release metadata endpoint.
    pub update_url: String,
    /// Files the update must not overwrite.
    pub critical_files: CriticalFileSet,
}

impl VersionDescriptor {
    /// Reads the descriptor named by `config`.
    ///
    /// # Errors
    ///
    /// Every failure is a configuration error: a missing or unreadable file
    /// and malformed JSON give [`KeepupError::ConfigError`]; a bad critical
    /// entry gives [`KeepupError::InvalidCriticalPath`].
    pub fn load(config: &UpdaterConfig) -> Result<Self> {
        let path = &config.version_file;
        let label = path.display().to_string();

        let content = std::fs::read_to_string(path).map_err(|e| KeepupError::ConfigError {
            file: label.clone(),
            reason: e.to_string(),
        })?;

        Self::parse(&content, &label, config)
    }

    /// Parses descriptor JSON. `label` names the source in errors.
    pub fn parse(content: &str, label: &str, config: &UpdaterConfig) -> Result<Self> {
        let raw: RawDescriptor =
            serde_json::from_str(content).map_err(|e| KeepupError::ConfigError {
                file: label.to_string(),
                reason: e.to_string(),
            })?;

        let version =
            raw.version.parse::<Version>().map_err(|e| KeepupError::ConfigError {
                file: label.to_string(),
                reason: e.to_string(),
            })?;

        if raw.update_url.trim().is_empty() {
            return Err(KeepupError::ConfigError {
                file: label.to_string(),
                reason: "update_url is empty".to_string(),
            }
            .into());
        }

        let critical_files =
            CriticalFileSet::new(&raw.critical_files, &config.reserved_dirs())
                .with_context(|| format!("Invalid critical_files in {label}"))?;

        Ok(Self {
            version,
            update_url: raw.update_url,
            critical_files,
        })
    }
}
