//! Artifact retrieval and transient-URL release
//!
//! [`ArtifactDownloader`] consumes the [`Artifact`] produced by a successful
//! conversion (a move-once ownership transfer from the orchestrator),
//! triggers the host save mechanism, and releases transient URLs exactly
//! once after a short grace delay. No completion signal is assumed from the
//! save mechanism, so the release happens even when the save reports an
//! error.

use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::DownloadConfig;
use crate::error::Result;
use crate::types::Artifact;

/// Host save mechanism: given a URL and filename, make the bytes land
/// wherever the host environment keeps downloads
#[async_trait]
pub trait FileSaver: Send + Sync {
    /// Trigger the save
    async fn save(&self, url: &Url, file_name: &str) -> Result<()>;
}

/// Releases a transient artifact URL so the backend can free the resource
#[async_trait]
pub trait UrlReleaser: Send + Sync {
    /// Release the URL; failures are the releaser's to log, not propagate
    async fn release(&self, url: &Url);
}

/// Default saver: fetch the artifact over HTTP and write it into the
/// configured download directory
pub struct HttpFileSaver {
    client: Client,
    download_dir: PathBuf,
}

impl HttpFileSaver {
    /// Saver writing into `download_dir` (created on first save if missing)
    pub fn new(download_dir: PathBuf) -> Self {
        Self {
            client: Client::new(),
            download_dir,
        }
    }
}

#[async_trait]
impl FileSaver for HttpFileSaver {
    async fn save(&self, url: &Url, file_name: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.download_dir).await?;
        let response = self.client.get(url.clone()).send().await?;
        let bytes = response.error_for_status()?.bytes().await?;

        let path = self.download_dir.join(file_name);
        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        info!(path = %path.display(), size = bytes.len(), "artifact saved");
        Ok(())
    }
}

/// Default releaser: DELETE the transient URL on the backend
pub struct HttpUrlReleaser {
    client: Client,
}

impl HttpUrlReleaser {
    /// Releaser using a fresh HTTP client
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for HttpUrlReleaser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlReleaser for HttpUrlReleaser {
    async fn release(&self, url: &Url) {
        match self.client.delete(url.clone()).send().await {
            Ok(response) => {
                debug!(status = response.status().as_u16(), %url, "transient URL released")
            }
            Err(err) => warn!(%err, %url, "failed to release transient URL"),
        }
    }
}

/// Saves conversion artifacts and manages transient-URL lifetime
pub struct ArtifactDownloader {
    saver: Arc<dyn FileSaver>,
    releaser: Arc<dyn UrlReleaser>,
    release_grace: Duration,
}

impl ArtifactDownloader {
    /// Downloader with the default HTTP saver and releaser
    pub fn new(config: &DownloadConfig) -> Self {
        Self {
            saver: Arc::new(HttpFileSaver::new(config.download_dir.clone())),
            releaser: Arc::new(HttpUrlReleaser::new()),
            release_grace: config.release_grace,
        }
    }

    /// Downloader with custom save/release mechanisms
    pub fn with_mechanisms(
        saver: Arc<dyn FileSaver>,
        releaser: Arc<dyn UrlReleaser>,
        release_grace: Duration,
    ) -> Self {
        Self {
            saver,
            releaser,
            release_grace,
        }
    }

    /// Trigger the save for an artifact, fire-and-forget
    ///
    /// Consumes the artifact: the spawned task is its sole owner, which is
    /// what makes the transient release exactly-once. Save errors are logged
    /// and swallowed; a transient URL is released after the grace delay
    /// whether or not the save succeeded, since the save mechanism offers no
    /// completion signal. The returned handle is for callers that want to
    /// await the whole sequence (tests do; UIs generally will not).
    pub fn save(&self, artifact: Artifact) -> tokio::task::JoinHandle<()> {
        let saver = self.saver.clone();
        let releaser = self.releaser.clone();
        let grace = self.release_grace;
        tokio::spawn(async move {
            let url = artifact.url.as_url().clone();
            if let Err(err) = saver.save(&url, &artifact.file_name).await {
                warn!(%err, file_name = %artifact.file_name, "artifact save failed");
            }
            if artifact.url.is_transient() {
                tokio::time::sleep(grace).await;
                releaser.release(&url).await;
            }
        })
    }
}
