//! Release archive extraction and layout checks.
//!
//! Release archives produced by source-hosting endpoints (e.g. GitHub's
//! zipball) wrap the payload in a single top-level directory such as
//! `owner-repo-1a2b3c/`. [`find_single_root`] locates that directory and
//! rejects any other layout.

use crate::core::KeepupError;
use crate::utils::fs::{ensure_dir, ensure_parent_dir};
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// `st_mode` file type bits for a symbolic link.
const S_IFLNK: u32 = 0o120000;

/// `st_mode` file type mask.
const S_IFMT: u32 = 0o170000;

/// Extracts a zip archive on the blocking thread pool.
///
/// See [`extract_zip_blocking`].
pub async fn extract_zip(archive: &Path, dest: &Path) -> Result<usize> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || extract_zip_blocking(&archive, &dest))
        .await
        .context("spawn_blocking panicked")?
}

/// Extracts `archive` into `dest`, returning the number of files written.
///
/// Unix permission bits stored in the archive are applied to extracted
/// files. Symbolic link entries are skipped.
///
/// # Errors
///
/// Returns [`KeepupError::StructuralError`] if the file is not a readable zip
/// archive or an entry name would escape `dest` (absolute paths, `..`).
pub fn extract_zip_blocking(archive: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive)
        .with_context(|| format!("Failed to open archive: {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(io::BufReader::new(file)).map_err(|e| {
        KeepupError::StructuralError {
            reason: format!("not a valid zip archive: {e}"),
        }
    })?;

    ensure_dir(dest).with_context(|| KeepupError::fs("extract into", dest))?;

    let mut written = 0;
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(|e| KeepupError::StructuralError {
            reason: format!("unreadable archive entry #{index}: {e}"),
        })?;

        let Some(relative) = entry.enclosed_name() else {
            return Err(KeepupError::StructuralError {
                reason: format!("entry '{}' escapes the extraction directory", entry.name()),
            }
            .into());
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            ensure_dir(&target).with_context(|| KeepupError::fs("extract", &target))?;
            continue;
        }

        let mode = entry.unix_mode();
        if mode.is_some_and(|m| m & S_IFMT == S_IFLNK) {
            warn!(entry = entry.name(), "Skipping symbolic link in archive");
            continue;
        }

        ensure_parent_dir(&target).with_context(|| KeepupError::fs("extract", &target))?;
        let mut out =
            File::create(&target).with_context(|| KeepupError::fs("extract", &target))?;
        io::copy(&mut entry, &mut out).with_context(|| KeepupError::fs("extract", &target))?;

        #[cfg(unix)]
        if let Some(mode) = mode {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o7777))
                .with_context(|| KeepupError::fs("set permissions on", &target))?;
        }

        written += 1;
    }

    debug!(files = written, dest = %dest.display(), "Archive extracted");
    Ok(written)
}

/// Returns the single top-level directory of an extracted archive.
///
/// Only directories count: stray top-level files are ignored with a warning.
///
/// # Errors
///
/// Returns [`KeepupError::StructuralError`] when there are zero or several
/// top-level directories.
pub fn find_single_root(extracted: &Path) -> Result<PathBuf> {
    let mut dirs = Vec::new();
    let entries = fs::read_dir(extracted).with_context(|| KeepupError::fs("read", extracted))?;
    for entry in entries {
        let entry = entry.with_context(|| KeepupError::fs("read", extracted))?;
        let file_type =
            entry.file_type().with_context(|| KeepupError::fs("inspect", &entry.path()))?;
        if file_type.is_dir() {
            dirs.push(entry.path());
        } else {
            warn!(entry = %entry.file_name().to_string_lossy(), "Ignoring top-level file in archive");
        }
    }
    dirs.sort();

    match dirs.len() {
        1 => Ok(dirs.remove(0)),
        0 => Err(KeepupError::StructuralError {
            reason: "archive has no top-level directory".to_string(),
        }
        .into()),
        n => {
            let names: Vec<String> = dirs
                .iter()
                .filter_map(|d| d.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect();
            Err(KeepupError::StructuralError {
                reason: format!(
                    "archive has {n} top-level directories ({}), expected exactly one",
                    names.join(", ")
                ),
            }
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::find_kind;
    use crate::test_utils::{ArchiveEntry, build_archive};
    use tempfile::TempDir;

    fn write_archive(temp: &TempDir, entries: &[ArchiveEntry]) -> PathBuf {
        let path = temp.path().join("update.zip");
        std::fs::write(&path, build_archive(entries)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_extract_nested_files() {
        let temp = TempDir::new().unwrap();
        let archive = write_archive(
            &temp,
            &[
                ArchiveEntry::dir("repo-1.2.0/"),
                ArchiveEntry::file("repo-1.2.0/app.bin", b"binary"),
                ArchiveEntry::file("repo-1.2.0/lib/util.txt", b"util"),
            ],
        );
        let dest = temp.path().join("extracted");

        assert_eq!(extract_zip(&archive, &dest).await.unwrap(), 2);
        assert_eq!(std::fs::read(dest.join("repo-1.2.0/app.bin")).unwrap(), b"binary");
        assert_eq!(std::fs::read(dest.join("repo-1.2.0/lib/util.txt")).unwrap(), b"util");
    }

    #[test]
    fn test_blocked_extraction_is_file_system_error() {
        let temp = TempDir::new().unwrap();
        let archive = write_archive(&temp, &[ArchiveEntry::file("repo/app.bin", b"binary")]);
        let dest = temp.path().join("extracted");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("repo"), "not a directory").unwrap();

        let err = extract_zip_blocking(&archive, &dest).unwrap_err();

        assert!(matches!(find_kind(&err), Some(KeepupError::FileSystemError { .. })), "{err:#}");
        assert!(err.to_string().contains("app.bin"), "{err}");
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_applies_unix_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let archive = write_archive(
            &temp,
            &[ArchiveEntry::file("repo/run.sh", b"#!/bin/sh\n").with_mode(0o755)],
        );
        let dest = temp.path().join("out");

        extract_zip_blocking(&archive, &dest).unwrap();
        let mode = std::fs::metadata(dest.join("repo/run.sh")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_escaping_entry_is_structural_error() {
        let temp = TempDir::new().unwrap();
        let archive = write_archive(&temp, &[ArchiveEntry::file("../evil.txt", b"x")]);
        let dest = temp.path().join("out");

        let err = extract_zip_blocking(&archive, &dest).unwrap_err();
        assert!(matches!(find_kind(&err), Some(KeepupError::StructuralError { .. })));
        assert!(!temp.path().join("evil.txt").exists());
    }

    #[test]
    fn test_garbage_is_structural_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("update.zip");
        std::fs::write(&path, b"<html>not found</html>").unwrap();

        let err = extract_zip_blocking(&path, &temp.path().join("out")).unwrap_err();
        assert!(matches!(find_kind(&err), Some(KeepupError::StructuralError { .. })));
    }

    #[test]
    fn test_find_single_root() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("repo-1.2.0/src")).unwrap();
        std::fs::write(temp.path().join("pax_global_header"), "x").unwrap();

        let root = find_single_root(temp.path()).unwrap();
        assert_eq!(root, temp.path().join("repo-1.2.0"));
    }

    #[test]
    fn test_find_single_root_rejects_zero_and_two() {
        let empty = TempDir::new().unwrap();
        std::fs::write(empty.path().join("README.md"), "loose file").unwrap();
        let err = find_single_root(empty.path()).unwrap_err();
        assert!(matches!(find_kind(&err), Some(KeepupError::StructuralError { .. })));

        let two = TempDir::new().unwrap();
        std::fs::create_dir(two.path().join("a")).unwrap();
        std::fs::create_dir(two.path().join("b")).unwrap();
        let err = find_single_root(two.path()).unwrap_err();
        assert!(err.to_string().contains("2 top-level directories"));
    }
}
