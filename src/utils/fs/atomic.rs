//! Metadata-preserving and atomic file copies.
//!
//! Every copy the updater makes keeps the source's permission bits and
//! modification time. Copies into the live installation go through a sibling
//! temporary file and a rename, so a reader of the destination sees either
//! the old bytes or the new ones, never a half-written file.

use super::dirs::{ensure_dir, ensure_parent_dir};
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Copies `src` to `dst`, preserving permissions and modification time.
///
/// `dst` must not be an existing read-only file; use [`atomic_copy`] to
/// replace files in place.
///
/// # Returns
///
/// The number of bytes copied.
pub fn copy_preserving(src: &Path, dst: &Path) -> Result<u64> {
    let metadata =
        fs::metadata(src).with_context(|| format!("Failed to read metadata: {}", src.display()))?;

    let mut reader =
        File::open(src).with_context(|| format!("Failed to open: {}", src.display()))?;
    let mut writer =
        File::create(dst).with_context(|| format!("Failed to create: {}", dst.display()))?;
    let bytes = io::copy(&mut reader, &mut writer).with_context(|| {
        format!("Failed to copy file from {} to {}", src.display(), dst.display())
    })?;

    // Timestamps go on before permissions so read-only sources still work.
    if let Ok(modified) = metadata.modified() {
        writer
            .set_modified(modified)
            .with_context(|| format!("Failed to set modification time: {}", dst.display()))?;
    }
    writer.sync_all().with_context(|| format!("Failed to sync: {}", dst.display()))?;
    drop(writer);

    fs::set_permissions(dst, metadata.permissions())
        .with_context(|| format!("Failed to set permissions: {}", dst.display()))?;

    Ok(bytes)
}

/// Atomically replaces `dst` with a copy of `src`.
///
/// The copy is written to a hidden temporary file next to `dst` and then
/// renamed over it. Parent directories are created as needed. If `dst` is a
/// directory the rename fails and `dst` is left untouched.
///
/// # Examples
///
/// ```rust,no_run
/// use keepup_cli::utils::fs::atomic_copy;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// atomic_copy(Path::new(".update/extracted/app-1.2.0/app.bin"), Path::new("app.bin"))?;
/// # Ok(())
/// # }
/// ```
pub fn atomic_copy(src: &Path, dst: &Path) -> Result<u64> {
    ensure_parent_dir(dst)?;

    let temp_path = sibling_temp_path(dst);
    let result = copy_preserving(src, &temp_path).and_then(|bytes| {
        fs::rename(&temp_path, dst)
            .with_context(|| format!("Failed to rename temp file to: {}", dst.display()))?;
        Ok(bytes)
    });

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// Recursively copies a directory, preserving file metadata.
///
/// Only directories and regular files are copied; symlinks and special files
/// are skipped. Traversal is sorted so the copy order is deterministic.
///
/// # Returns
///
/// The number of files copied.
pub fn copy_dir_preserving(src: &Path, dst: &Path) -> Result<usize> {
    ensure_dir(dst)?;

    let mut copied = 0;
    for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
        let entry =
            entry.with_context(|| format!("Failed to read directory: {}", src.display()))?;
        let relative = entry.path().strip_prefix(src).with_context(|| {
            format!("{} is not under {}", entry.path().display(), src.display())
        })?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            ensure_dir(&target)?;
        } else if entry.file_type().is_file() {
            copy_preserving(entry.path(), &target)?;
            copied += 1;
        }
    }

    Ok(copied)
}

fn sibling_temp_path(dst: &Path) -> PathBuf {
    let name = dst.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    dst.with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple()))
}
