//! The set of files an update must never overwrite.

use crate::core::KeepupError;
use crate::utils::fs::{normalize_relative, paths_overlap};
use std::collections::BTreeSet;

/// Project-relative paths protected from the update payload.
///
/// Entries are stored in normalized `/`-joined form, so `./data//db.sqlite`
/// and `data\db.sqlite` are the same member. Membership is an exact match on
/// that form: protecting `data` does not protect `data/db.sqlite` from the
/// merge, although the backup copies a directory entry recursively.
///
/// # Examples
///
/// ```rust
/// use keepup_cli::config::CriticalFileSet;
///
/// let set = CriticalFileSet::new(["config.json", "./data//db.sqlite"], &[".update", ".backup"]).unwrap();
/// assert!(set.contains("data/db.sqlite"));
/// assert!(!set.contains("app.bin"));
/// assert!(CriticalFileSet::new(["../secrets"], &[]).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CriticalFileSet {
    paths: BTreeSet<String>,
}

impl CriticalFileSet {
    /// Builds the set, validating every entry.
    ///
    /// `reserved_dirs` are the normalized staging and backup directories; an
    /// entry equal to one of them, inside one, or containing one is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`KeepupError::InvalidCriticalPath`] for the first entry that
    /// is empty, absolute, traverses upward, or overlaps a reserved directory.
    pub fn new<I, S>(entries: I, reserved_dirs: &[&str]) -> Result<Self, KeepupError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut paths = BTreeSet::new();
        for entry in entries {
            let raw = entry.as_ref();
            let normalized =
                normalize_relative(raw).map_err(|reason| KeepupError::InvalidCriticalPath {
                    path: raw.to_string(),
                    reason: reason.to_string(),
                })?;

            if let Some(dir) = reserved_dirs.iter().find(|dir| paths_overlap(&normalized, dir)) {
                return Err(KeepupError::InvalidCriticalPath {
                    path: raw.to_string(),
                    reason: format!("overlaps the updater's own directory '{dir}'"),
                });
            }

            paths.insert(normalized);
        }
        Ok(Self {
            paths,
        })
    }

    /// Exact membership test on a normalized relative path.
    pub fn contains(&self, relative: &str) -> bool {
        self.paths.contains(relative)
    }

    /// Iterates entries in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
