//! Relative path normalization.
//!
//! The updater identifies files by their path relative to the installation
//! root, always written with `/` separators. These helpers produce that form
//! from user input and from walked directory entries.

use std::path::{Component, Path};

/// Normalizes a user-supplied relative path into its `/`-joined form.
///
/// Backslashes are treated as separators. Empty segments and `.` segments
/// are dropped.
///
/// # Errors
///
/// Returns a short reason when the path is empty, absolute (including a
/// Windows drive prefix), or contains a `..` segment.
///
/// # Examples
///
/// ```rust
/// use keepup_cli::utils::fs::normalize_relative;
///
/// assert_eq!(normalize_relative("./config\\app.json").unwrap(), "config/app.json");
/// assert!(normalize_relative("../etc/passwd").is_err());
/// assert!(normalize_relative("/etc/passwd").is_err());
/// ```
pub fn normalize_relative(raw: &str) -> Result<String, &'static str> {
    let unified = raw.trim().replace('\\', "/");

    if unified.is_empty() {
        return Err("path is empty");
    }
    if unified.starts_with('/') || has_drive_prefix(&unified) {
        return Err("path must be relative to the installation root");
    }

    let mut segments = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err("path must not contain '..'"),
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Err("path refers to the installation root itself");
    }
    Ok(segments.join("/"))
}

/// Renders `path` relative to `base` with `/` separators.
///
/// Returns `None` when `path` is not under `base` or a component is not
/// valid UTF-8.
pub fn relative_slash_path(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => segments.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(segments.join("/"))
}

/// Whether two normalized relative paths are equal or one contains the other.
///
/// # Examples
///
/// ```rust
/// use keepup_cli::utils::fs::paths_overlap;
///
/// assert!(paths_overlap(".update", ".update/update.zip"));
/// assert!(!paths_overlap(".update", ".updates"));
/// ```
pub fn paths_overlap(a: &str, b: &str) -> bool {
    let inside = |child: &str, parent: &str| {
        child.strip_prefix(parent).is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    };
    inside(a, b) || inside(b, a)
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_normalize_relative_accepts() {
        assert_eq!(normalize_relative("config.json").unwrap(), "config.json");
        assert_eq!(normalize_relative("data//db.sqlite").unwrap(), "data/db.sqlite");
        assert_eq!(normalize_relative("./a/./b/").unwrap(), "a/b");
        assert_eq!(normalize_relative("dir\\file.txt").unwrap(), "dir/file.txt");
        assert_eq!(normalize_relative(" settings.ini ").unwrap(), "settings.ini");
    }

    #[test]
    fn test_normalize_relative_rejects() {
        assert!(normalize_relative("").is_err());
        assert!(normalize_relative("   ").is_err());
        assert!(normalize_relative(".").is_err());
        assert!(normalize_relative("/etc/passwd").is_err());
        assert!(normalize_relative("C:\\Windows\\system.ini").is_err());
        assert!(normalize_relative("a/../../b").is_err());
        assert!(normalize_relative("..").is_err());
    }

    #[test]
    fn test_paths_overlap() {
        assert!(paths_overlap("a", "a"));
        assert!(paths_overlap("a/b/c", "a/b"));
        assert!(!paths_overlap("ab", "a"));
        assert!(!paths_overlap("a/b", "a/c"));
    }

    #[test]
    fn test_relative_slash_path() {
        let base = PathBuf::from("/opt/app");
        assert_eq!(
            relative_slash_path(&base, &base.join("data").join("db.sqlite")).as_deref(),
            Some("data/db.sqlite")
        );
        assert_eq!(relative_slash_path(&base, Path::new("/other/x")), None);
        assert_eq!(relative_slash_path(&base, &base).as_deref(), Some(""));
    }
}
