//! Temporary installations for tests.

use crate::config::UpdaterConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary project root with a `version.json`.
///
/// The root is a subdirectory of the temp dir, so tests can also create
/// siblings of the installation. Everything is removed on drop.
pub struct ProjectFixture {
    _temp: TempDir,
    root: PathBuf,
}

impl ProjectFixture {
    /// Creates a project at `version` whose releases are looked up at
    /// `update_url`.
    ///
    /// # Panics
    ///
    /// Panics if the temp directory cannot be set up.
    pub fn new(version: &str, update_url: &str, critical_files: &[&str]) -> Self {
        let temp = TempDir::new().expect("create temp dir");
        let root = temp.path().join("app");
        fs::create_dir_all(&root).expect("create project root");

        let descriptor = serde_json::json!({
            "version": version,
            "update_url": update_url,
            "critical_files": critical_files,
        });
        let content = serde_json::to_string_pretty(&descriptor).expect("serialize descriptor");
        fs::write(root.join("version.json"), content).expect("write version.json");

        Self {
            _temp: temp,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of `relative` inside the project.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Writes a file, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, content).expect("write fixture file");
    }

    /// Reads a file as UTF-8.
    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative))
            .unwrap_or_else(|e| panic!("read {relative}: {e}"))
    }

    /// Default configuration for this project, progress bars hidden.
    pub fn config(&self) -> UpdaterConfig {
        UpdaterConfig::for_project(&self.root).expect("resolve config").with_progress(false)
    }
}
