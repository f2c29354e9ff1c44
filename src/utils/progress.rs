//! Progress indicators for long-running updater work
//!
//! Downloads show a byte-counting bar when the server declares a length and a
//! spinner otherwise; extraction and merging show a spinner with a message.
//! All indicators draw to stderr so stdout stays clean for scripts.
//!
//! # Environment Variables
//!
//! - `KEEPUP_NO_PROGRESS`: Set to any value to disable all progress indicators
//!
//! # Examples
//!
//! ```rust
//! use keepup_cli::utils::progress::ProgressBar;
//!
//! let bar = ProgressBar::new_bytes(1024, true);
//! bar.set_prefix("Downloading");
//! bar.inc(512);
//! bar.inc(512);
//! bar.finish_and_clear();
//! ```

use crate::constants::NO_PROGRESS_ENV;
use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;

/// Checks if progress bars are disabled through the environment.
fn is_progress_disabled() -> bool {
    std::env::var_os(NO_PROGRESS_ENV).is_some()
}

/// A progress indicator with consistent styling.
///
/// Wraps an `indicatif` bar. When progress is disabled (by the caller or by
/// `KEEPUP_NO_PROGRESS`) the inner bar is hidden and every call is a no-op,
/// so call sites never branch on visibility.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Creates a byte-counting bar for a transfer of known size.
    ///
    /// # Arguments
    ///
    /// * `total_bytes` - Declared size of the transfer
    /// * `enabled` - Whether the caller wants progress output at all
    pub fn new_bytes(total_bytes: u64, enabled: bool) -> Self {
        let bar = if !enabled || is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new(total_bytes);
            bar.set_style(download_style());
            bar
        };
        Self {
            inner: bar,
        }
    }

    /// Creates a spinner for work of unknown size.
    ///
    /// The spinner ticks every 100ms until finished.
    pub fn new_spinner(enabled: bool) -> Self {
        let bar = if !enabled || is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new_spinner();
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        Self {
            inner: bar,
        }
    }

    /// Creates a bar that never draws.
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    /// Sets the message displayed after the bar.
    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Sets the prefix displayed before the bar.
    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.inner.set_prefix(prefix.into());
    }

    /// Advances the bar by `delta` units.
    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    /// Current position of the bar.
    ///
    /// Hidden bars still count, which lets tests observe progress.
    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    /// Whether the bar is hidden.
    pub fn is_hidden(&self) -> bool {
        self.inner.is_hidden()
    }

    /// Finishes the bar and leaves `msg` on its line.
    pub fn finish_with_message(&self, msg: impl Into<String>) {
        self.inner.finish_with_message(msg.into());
    }

    /// Finishes the bar and removes it from the terminal.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

fn download_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template(
            "{prefix:.bold.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
        )
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
        .progress_chars("━╸━")
}

fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::default_spinner()
        .template("{prefix:.bold} {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}
