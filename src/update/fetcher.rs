//! Streaming download of release archives.
//!
//! The archive is streamed straight to disk while its SHA-256 is computed,
//! so large releases never sit in memory. The checksum is reported in the
//! `sha256:<hex>` form and logged for auditing.

use crate::config::NetworkSettings;
use crate::core::KeepupError;
use crate::utils::ProgressBar;
use anyhow::{Context, Result};
use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// A downloaded archive on disk.
#[derive(Debug, Clone)]
pub struct FetchedArtifact {
    /// Where the archive was written.
    pub path: PathBuf,
    /// Number of bytes received.
    pub bytes: u64,
    /// Checksum of the received bytes, `sha256:<hex>`.
    pub sha256: String,
}

/// Downloads release archives over HTTP.
pub struct ArtifactFetcher {
    client: reqwest::Client,
    timeout: Duration,
    show_progress: bool,
}

impl ArtifactFetcher {
    /// Builds a fetcher from the network settings.
    ///
    /// The connect timeout bounds connection establishment; the download
    /// timeout bounds the whole transfer.
    pub fn new(network: &NetworkSettings, show_progress: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(network.connect_timeout())
            .user_agent(network.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            timeout: network.download_timeout(),
            show_progress,
        })
    }

    /// Downloads `url` into `dest`.
    ///
    /// # Errors
    ///
    /// - [`KeepupError::NetworkError`] for connection failures, non-success
    ///   HTTP statuses, stream errors and timeouts
    /// - [`KeepupError::DownloadIncomplete`] if fewer bytes arrive than the
    ///   server announced
    /// - [`KeepupError::FileSystemError`] if `dest` cannot be written
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<FetchedArtifact> {
        debug!(url, dest = %dest.display(), "Downloading release archive");

        let artifact = match tokio::time::timeout(self.timeout, self.download(url, dest)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(KeepupError::network(
                    "download",
                    format!("timed out after {}s", self.timeout.as_secs()),
                )
                .into());
            }
        };

        info!(bytes = artifact.bytes, sha256 = %artifact.sha256, "Release archive downloaded");
        Ok(artifact)
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<FetchedArtifact> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| KeepupError::network("download", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(KeepupError::network("download", format!("HTTP {status} from {url}")).into());
        }

        let expected = response.content_length();
        let progress = match expected {
            Some(total) => ProgressBar::new_bytes(total, self.show_progress),
            None => ProgressBar::new_spinner(self.show_progress),
        };
        progress.set_message("Downloading update");

        let result = stream_to_file(response, dest, &progress).await;
        progress.finish_and_clear();
        let (received, sha256) = result?;

        verify_length(expected, received)?;

        Ok(FetchedArtifact {
            path: dest.to_path_buf(),
            bytes: received,
            sha256,
        })
    }
}

async fn stream_to_file(
    response: reqwest::Response,
    dest: &Path,
    progress: &ProgressBar,
) -> Result<(u64, String)> {
    let mut file = tokio::fs::File::create(dest)
        .await
        .with_context(|| KeepupError::fs("create download file", dest))?;
    let mut hasher = Sha256::new();
    let mut received: u64 = 0;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            KeepupError::network("download", format!("stream failed after {received} bytes: {e}"))
        })?;
        file.write_all(&chunk).await.with_context(|| KeepupError::fs("write download", dest))?;
        hasher.update(&chunk);
        received += chunk.len() as u64;
        progress.inc(chunk.len() as u64);
    }

    file.flush().await.with_context(|| KeepupError::fs("flush download", dest))?;
    file.sync_all().await.with_context(|| KeepupError::fs("sync download", dest))?;

    Ok((received, format!("sha256:{}", hex::encode(hasher.finalize()))))
}

/// Checks the received size against the announced `Content-Length`.
///
/// Without an announced length any size is accepted.
pub fn verify_length(expected: Option<u64>, received: u64) -> Result<(), KeepupError> {
    match expected {
        Some(expected) if received < expected => Err(KeepupError::DownloadIncomplete {
            expected,
            received,
        }),
        Some(expected) if received > expected => Err(KeepupError::network(
            "download",
            format!("received {received} bytes but the server announced {expected}"),
        )),
        _ => Ok(()),
    }
}
