//! Command-line interface for keepup.
//!
//! # Available Commands
//!
//! - `check` - Report whether a newer release exists (never fails)
//! - `update` - Check, confirm, and install the latest release
//! - `rollback` - Restore critical files from a backup left by a failed update
//!
//! # Global Options
//!
//! - `--project-dir` - Installation root (default: current directory)
//! - `--verbose` / `--quiet` - Log verbosity
//! - `--no-progress` - Hide progress bars (same as `KEEPUP_NO_PROGRESS=1`)
//!
//! # Examples
//!
//! ```bash
//! # Is there anything new?
//! keepup check
//!
//! # Install it without prompting
//! keepup update --yes
//!
//! # Recover after an interrupted update
//! keepup --project-dir /opt/app rollback
//! ```

mod check;
mod output;
mod rollback;
mod update;

use crate::config::UpdaterConfig;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Runtime options derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Installation root; `None` means the current directory.
    pub project_dir: Option<PathBuf>,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: &'static str,
    /// Suppress progress and status lines.
    pub quiet: bool,
    /// Hide progress bars.
    pub no_progress: bool,
}

impl CliConfig {
    /// Resolves the updater configuration for the selected project.
    pub fn updater_config(&self) -> Result<UpdaterConfig> {
        let root = match &self.project_dir {
            Some(dir) => dir.clone(),
            None => PathBuf::from("."),
        };
        Ok(UpdaterConfig::for_project(&root)?.with_progress(!self.no_progress && !self.quiet))
    }
}

/// Main CLI structure for keepup.
#[derive(Parser)]
#[command(
    name = "keepup",
    about = "Keep a locally installed application up to date",
    version,
    long_about = "keepup checks a release endpoint for a newer version of the application \
                  installed in the project directory, downloads it, and applies it in place \
                  while preserving critical files. A failed update is rolled back."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Installation root containing version.json
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    project_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Hide progress bars
    #[arg(long, global = true, env = "KEEPUP_NO_PROGRESS", value_parser = clap::builder::FalseyValueParser::new())]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a newer release is available
    Check(check::CheckCommand),

    /// Download and install the latest release
    Update(update::UpdateCommand),

    /// Restore critical files from the backup of a failed update
    Rollback(rollback::RollbackCommand),
}

impl Cli {
    /// Builds the runtime options from the parsed flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            project_dir: self.project_dir.clone(),
            log_level,
            quiet: self.quiet,
            no_progress: self.no_progress,
        }
    }

    /// Runs the selected command.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Runs the selected command with explicit options.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Check(cmd) => cmd.execute(&config).await,
            Commands::Update(cmd) => cmd.execute(&config).await,
            Commands::Rollback(cmd) => cmd.execute(&config).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_levels() {
        let cli = Cli::parse_from(["keepup", "--verbose", "check"]);
        assert_eq!(cli.build_config().log_level, "debug");

        let cli = Cli::parse_from(["keepup", "check", "--quiet"]);
        let config = cli.build_config();
        assert_eq!(config.log_level, "error");
        assert!(config.quiet);

        let cli = Cli::parse_from(["keepup", "check"]);
        assert_eq!(cli.build_config().log_level, "warn");
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["keepup", "-v", "-q", "check"]).is_err());
    }

    #[test]
    fn test_project_dir_flag() {
        let cli = Cli::parse_from(["keepup", "update", "--yes", "-C", "/opt/app"]);
        assert_eq!(cli.build_config().project_dir, Some(PathBuf::from("/opt/app")));
    }
}
