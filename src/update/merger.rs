//! Merging an extracted release into the live tree.
//!
//! The merge is an overlay: every regular file under the archive's single
//! top-level directory is copied to the same relative path under the project
//! root, replacing what is there. Files present only in the live tree are
//! left alone. Three kinds of archive paths are never written:
//!
//! - critical files, whose live copy always wins
//! - paths with any segment starting with the reserved prefix (`.` by
//!   default, so `.git/`, `.env` and the updater's own directories)
//! - the updater's staging and backup directories and its lock file, even
//!   under a custom reserved prefix
//!
//! Each file is written to a sibling temp file and renamed into place, so a
//! file is either fully old or fully new. The merge as a whole is not atomic;
//! a [`MergeJournal`] records enough to undo it.

use super::archive::find_single_root;
use super::journal::MergeJournal;
use crate::config::{CriticalFileSet, UpdaterConfig};
use crate::constants::LOCK_FILE_NAME;
use crate::core::KeepupError;
use crate::utils::fs::{atomic_copy, paths_overlap, relative_slash_path};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// What a merge wrote and what it left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedFiles {
    /// Files written into the live tree, in merge order.
    pub applied: Vec<String>,
    /// Archive files skipped because they are critical.
    pub skipped_critical: Vec<String>,
    /// Archive files skipped because they are reserved.
    pub skipped_reserved: Vec<String>,
}

#[derive(Debug)]
struct MergePlan {
    files: Vec<(String, PathBuf)>,
    skipped_critical: Vec<String>,
    skipped_reserved: Vec<String>,
}

/// Overlays extracted release files onto a project root.
#[derive(Debug, Clone)]
pub struct FileMerger {
    project_root: PathBuf,
    critical: CriticalFileSet,
    reserved_prefix: String,
    protected: Vec<String>,
}

impl FileMerger {
    pub fn new(config: &UpdaterConfig, critical: CriticalFileSet) -> Self {
        Self {
            project_root: config.project_root.clone(),
            critical,
            reserved_prefix: config.reserved_prefix.clone(),
            protected: vec![
                config.staging_rel.clone(),
                config.backup_rel.clone(),
                LOCK_FILE_NAME.to_string(),
            ],
        }
    }

    /// Merges the release extracted under `extracted`.
    ///
    /// The archive layout is checked before anything is written. When a
    /// journal is given, each file's prior state is recorded just before it
    /// is replaced.
    ///
    /// # Errors
    ///
    /// - [`KeepupError::StructuralError`] if `extracted` does not hold exactly
    ///   one top-level directory; the live tree is untouched
    /// - [`KeepupError::FileSystemError`] if a file cannot be written; files
    ///   merged before it stay merged until the journal is reverted
    pub fn apply(
        &self,
        extracted: &Path,
        mut journal: Option<&mut MergeJournal>,
    ) -> Result<AppliedFiles> {
        let release_root = find_single_root(extracted)?;
        let plan = self.plan(&release_root)?;
        debug!(
            files = plan.files.len(),
            critical = plan.skipped_critical.len(),
            reserved = plan.skipped_reserved.len(),
            "Merge planned"
        );

        let mut applied = Vec::with_capacity(plan.files.len());
        for (relative, source) in plan.files {
            if let Some(journal) = journal.as_deref_mut() {
                journal.record(&relative)?;
            }
            let target = self.project_root.join(&relative);
            atomic_copy(&source, &target).with_context(|| KeepupError::fs("apply", &target))?;
            applied.push(relative);
        }

        info!(files = applied.len(), "Release files merged");
        Ok(AppliedFiles {
            applied,
            skipped_critical: plan.skipped_critical,
            skipped_reserved: plan.skipped_reserved,
        })
    }

    fn plan(&self, release_root: &Path) -> Result<MergePlan> {
        let mut plan = MergePlan {
            files: Vec::new(),
            skipped_critical: Vec::new(),
            skipped_reserved: Vec::new(),
        };

        for entry in WalkDir::new(release_root).min_depth(1).sort_by_file_name() {
            let entry = entry.with_context(|| KeepupError::fs("read release", release_root))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(relative) = relative_slash_path(release_root, entry.path()) else {
                warn!(path = %entry.path().display(), "Skipping file with a non UTF-8 name");
                continue;
            };

            if self.critical.contains(&relative) {
                debug!(path = %relative, "Keeping live critical file");
                plan.skipped_critical.push(relative);
            } else if self.is_reserved(&relative) {
                debug!(path = %relative, "Skipping reserved path");
                plan.skipped_reserved.push(relative);
            } else {
                plan.files.push((relative, entry.into_path()));
            }
        }
        Ok(plan)
    }

    fn is_reserved(&self, relative: &str) -> bool {
        relative.split('/').any(|segment| segment.starts_with(&self.reserved_prefix))
            || self.protected.iter().any(|dir| paths_overlap(dir, relative))
    }
}
