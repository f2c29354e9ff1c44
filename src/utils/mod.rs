//! Cross-cutting utilities for keepup
//!
//! - [`fs`] - Atomic copies, directory helpers and relative path normalization
//! - [`progress`] - Progress bars and spinners for downloads and file work

pub mod fs;
pub mod progress;

pub use fs::{atomic_copy, ensure_dir, normalize_relative, remove_dir_all};
pub use progress::ProgressBar;
