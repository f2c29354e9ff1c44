//! File system utilities used by the update transaction
//!
//! # Key Features
//!
//! - **Atomic replacement**: live files are replaced through a temp file and rename
//! - **Metadata preservation**: copies keep permission bits and modification time
//! - **Normalized paths**: relative paths are compared in their `/`-joined form
//!
//! # Examples
//!
//! ```rust,no_run
//! use keepup_cli::utils::fs::{atomic_copy, ensure_dir, normalize_relative};
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! ensure_dir(Path::new(".backup"))?;
//! let rel = normalize_relative("config/app.json").expect("relative path");
//! atomic_copy(Path::new(&rel), &Path::new(".backup").join(&rel))?;
//! # Ok(())
//! # }
//! ```

pub mod atomic;
pub mod dirs;
pub mod paths;

pub use atomic::{atomic_copy, copy_dir_preserving, copy_preserving};
pub use dirs::{ensure_dir, ensure_parent_dir, remove_dir_all, remove_path};
pub use paths::{normalize_relative, paths_overlap, relative_slash_path};
