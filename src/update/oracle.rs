//! Release lookup against the update endpoint.
//!
//! The endpoint returns release metadata in the GitHub "latest release"
//! shape:
//!
//! ```json
//! { "tag_name": "v1.2.0", "zipball_url": "https://.../zipball/v1.2.0" }
//! ```
//!
//! Other fields are ignored. `archive_url` is accepted in place of
//! `zipball_url` for self-hosted endpoints.
//!
//! Two entry points share one request path:
//!
//! - [`VersionOracle::fetch_release`] fails with a
//!   [`KeepupError::NetworkError`] carrying the reason
//! - [`VersionOracle::check_for_update`] never fails: an unreachable or
//!   malformed endpoint becomes [`UpdateCheck::Unavailable`] and is logged

use crate::config::{UpdaterConfig, VersionDescriptor};
use crate::core::KeepupError;
use crate::version::Version;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::cmp::Ordering;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct ReleaseMetadata {
    tag_name: String,
    #[serde(alias = "archive_url")]
    zipball_url: String,
}

/// The latest published release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    /// Tag as published, e.g. `v1.2.0`.
    pub tag: String,
    /// Parsed tag.
    pub version: Version,
    /// Where the release archive is downloaded from.
    pub archive_url: String,
}

/// Result of comparing the installed version with the latest release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCheck {
    /// A strictly newer release exists.
    Available {
        current: Version,
        release: ReleaseInfo,
    },
    /// The installed version is the latest, or newer than it.
    UpToDate {
        current: Version,
        latest: Version,
    },
    /// The endpoint could not be queried or returned unusable data.
    Unavailable {
        reason: String,
    },
}

impl UpdateCheck {
    /// The newer release, if there is one.
    pub fn release(&self) -> Option<&ReleaseInfo> {
        match self {
            Self::Available { release, .. } => Some(release),
            _ => None,
        }
    }
}

/// Queries the release endpoint.
pub struct VersionOracle {
    client: reqwest::Client,
}

impl VersionOracle {
    /// Builds an oracle whose requests are bounded by `timeout` end to end.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
        })
    }

    /// Oracle for `keepup update` and `keepup check`.
    pub fn for_update(config: &UpdaterConfig) -> Result<Self> {
        Self::new(config.network.check_timeout(), &config.network.user_agent)
    }

    /// Oracle for the startup notifier, with its shorter timeout.
    pub fn for_notifier(config: &UpdaterConfig) -> Result<Self> {
        Self::new(config.network.notify_timeout(), &config.network.user_agent)
    }

    /// Fetches and parses the latest release from `url`.
    ///
    /// # Errors
    ///
    /// Returns [`KeepupError::NetworkError`] for transport failures,
    /// timeouts, non-success statuses, malformed JSON and tags that are not
    /// versions.
    pub async fn fetch_release(&self, url: &str) -> Result<ReleaseInfo> {
        debug!(url, "Fetching latest release");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| KeepupError::network("check for updates", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(KeepupError::network(
                "check for updates",
                format!("HTTP {status} from {url}"),
            )
            .into());
        }

        let metadata: ReleaseMetadata = response.json().await.map_err(|e| {
            KeepupError::network("check for updates", format!("invalid release metadata: {e}"))
        })?;

        let version = Version::from_tag(&metadata.tag_name).map_err(|e| {
            KeepupError::network("check for updates", format!("invalid release tag: {e}"))
        })?;

        Ok(ReleaseInfo {
            tag: metadata.tag_name,
            version,
            archive_url: metadata.zipball_url,
        })
    }

    /// Compares the installed version with the latest release.
    ///
    /// Never fails. A release is only offered when it is strictly newer;
    /// an installed version ahead of the endpoint is reported as up to date.
    pub async fn check_for_update(&self, descriptor: &VersionDescriptor) -> UpdateCheck {
        let release = match self.fetch_release(&descriptor.update_url).await {
            Ok(release) => release,
            Err(e) => {
                let reason = format!("{e:#}");
                warn!(url = %descriptor.update_url, error = %reason, "Update check failed");
                return UpdateCheck::Unavailable {
                    reason,
                };
            }
        };

        let current = descriptor.version.clone();
        match release.version.cmp(&current) {
            Ordering::Greater => {
                info!(current = %current, latest = %release.version, "Update available");
                UpdateCheck::Available {
                    current,
                    release,
                }
            }
            Ordering::Equal | Ordering::Less => {
                debug!(current = %current, latest = %release.version, "Already up to date");
                UpdateCheck::UpToDate {
                    current,
                    latest: release.version,
                }
            }
        }
    }
}

/// Startup notification check.
///
/// Loads the descriptor from `config` and returns the newer release, if any.
/// Every failure (missing descriptor, network, malformed response) is logged
/// and yields `None`, so an application can call this on every start.
///
/// # Examples
///
/// ```rust,no_run
/// use keepup_cli::config::UpdaterConfig;
/// use keepup_cli::update::notify_check;
/// use std::path::Path;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = UpdaterConfig::for_project(Path::new("/opt/app"))?;
/// if let Some(release) = notify_check(&config).await {
///     println!("Version {} is available, run 'keepup update'", release.version);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn notify_check(config: &UpdaterConfig) -> Option<ReleaseInfo> {
    let descriptor = match VersionDescriptor::load(config) {
        Ok(descriptor) => descriptor,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "Skipping update check");
            return None;
        }
    };
    let oracle = match VersionOracle::for_notifier(config) {
        Ok(oracle) => oracle,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "Skipping update check");
            return None;
        }
    };

    match oracle.check_for_update(&descriptor).await {
        UpdateCheck::Available { release, .. } => Some(release),
        UpdateCheck::UpToDate { .. } | UpdateCheck::Unavailable { .. } => None,
    }
}
