//! Report whether a newer release is available.
//!
//! Meant to run on application start: it uses the short notifier timeout and
//! always exits 0. Failures (missing descriptor, unreachable endpoint) are
//! logged as warnings and reported as "no update".

use super::CliConfig;
use crate::update::notify_check;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tracing::warn;

/// Command to check for a newer release.
#[derive(Args, Debug)]
pub struct CheckCommand {}

impl CheckCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let updater_config = match config.updater_config() {
            Ok(updater_config) => updater_config,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Skipping update check");
                return Ok(());
            }
        };

        match notify_check(&updater_config).await {
            Some(release) => {
                println!("{}", format!("Version {} is available", release.version).green());
                println!("Run `keepup update` to install it");
            }
            None => {
                if !config.quiet {
                    println!("No update available");
                }
            }
        }
        Ok(())
    }
}
