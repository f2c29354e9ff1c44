//! Dotted-integer versions.
//!
//! Installed and released versions are dot-separated lists of non-negative
//! integers such as `1.2.0`. Comparison is numeric and component-wise, with
//! missing trailing components treated as zero, so `1.2` equals `1.2.0` and
//! `1.10` is newer than `1.9`.
//!
//! Release tags often carry a leading `v` (`v1.2.0`); [`Version::from_tag`]
//! strips it, while `str::parse` expects the bare number form used in
//! the version descriptor.
//!
//! # Examples
//!
//! ```rust
//! use keepup_cli::version::Version;
//!
//! let installed: Version = "1.0.0".parse().unwrap();
//! let latest = Version::from_tag("v1.2.0").unwrap();
//! assert!(latest > installed);
//! assert_eq!("1.2".parse::<Version>().unwrap(), "1.2.0".parse().unwrap());
//! ```

use crate::core::KeepupError;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A parsed dotted-integer version.
///
/// Equality follows the numeric ordering, not the textual form: trailing zero
/// components are insignificant. [`Display`](fmt::Display) renders the
/// components as parsed.
#[derive(Debug, Clone)]
pub struct Version {
    components: Vec<u64>,
}

impl Version {
    /// Parses a release tag, stripping a leading `v` or `V`.
    pub fn from_tag(tag: &str) -> Result<Self, KeepupError> {
        let trimmed = tag.trim();
        let bare = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        bare.parse().map_err(|e| match e {
            KeepupError::InvalidVersion {
                reason, ..
            } => KeepupError::InvalidVersion {
                version: tag.to_string(),
                reason,
            },
            other => other,
        })
    }

    /// The numeric components as parsed.
    pub fn components(&self) -> &[u64] {
        &self.components
    }
}

impl FromStr for Version {
    type Err = KeepupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = |reason: String| KeepupError::InvalidVersion {
            version: s.to_string(),
            reason,
        };

        if trimmed.is_empty() {
            return Err(invalid("version is empty".to_string()));
        }

        let components = trimmed
            .split('.')
            .enumerate()
            .map(|(index, segment)| {
                if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid(format!(
                        "segment {} ('{segment}') is not a non-negative integer",
                        index + 1
                    )));
                }
                segment.parse::<u64>().map_err(|e| invalid(format!("segment {}: {e}", index + 1)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            components,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for component in &self.components {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{component}")?;
            first = false;
        }
        Ok(())
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            let a = self.components.get(i).copied().unwrap_or(0);
            let b = other.components.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

/// Compares two version strings.
///
/// Both sides go through [`Version::from_tag`], so a leading `v` is accepted
/// on either.
///
/// # Errors
///
/// Returns [`KeepupError::InvalidVersion`] if either side does not parse.
///
/// # Examples
///
/// ```rust
/// use keepup_cli::version::compare_versions;
/// use std::cmp::Ordering;
///
/// assert_eq!(compare_versions("1.10", "1.9").unwrap(), Ordering::Greater);
/// assert_eq!(compare_versions("v2.0", "2.0.0").unwrap(), Ordering::Equal);
/// ```
pub fn compare_versions(a: &str, b: &str) -> Result<Ordering, KeepupError> {
    Ok(Version::from_tag(a)?.cmp(&Version::from_tag(b)?))
}
