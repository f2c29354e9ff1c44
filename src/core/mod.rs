//! Core types for keepup
//!
//! This module holds the error vocabulary shared by every other module:
//! - [`KeepupError`] - Enumerated error kinds for every classified failure
//! - [`ErrorContext`] - User-friendly error wrapper with suggestions and details
//! - [`user_friendly_error`] - Convert any error to the user-facing format
//!
//! # Examples
//!
//! ```rust,no_run
//! use keepup_cli::core::{KeepupError, user_friendly_error};
//!
//! fn load() -> anyhow::Result<()> {
//!     Err(KeepupError::ConfigError {
//!         file: "version.json".into(),
//!         reason: "not found".into(),
//!     }
//!     .into())
//! }
//!
//! if let Err(e) = load() {
//!     user_friendly_error(e).display();
//! }
//! ```

pub mod error;
pub mod error_formatting;

pub use error::{ErrorContext, KeepupError, find_kind, root_kind};
pub use error_formatting::{create_error_context, user_friendly_error};
