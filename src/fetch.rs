//! Artifact fetching with a cross-run cache.
//!
//! A fetch is skipped entirely when the destination file already exists;
//! no checksum re-verification happens on cache hits. The actual byte
//! transfer sits behind the [`Transfer`] trait so cache semantics are
//! testable without a network.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{Error, ErrorExt, Result};

/// A downloaded binary blob, immutable once verified present.
#[derive(Debug, Clone)]
pub struct SourceArtifact {
    /// Local path of the artifact
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// SHA-256 hex digest, present only when computed on first download
    pub sha256: Option<String>,
}

/// Capability performing the raw byte transfer for a URL.
pub trait Transfer {
    /// Retrieve the full body at `url`.
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>>;
}

/// Production transfer over HTTP(S).
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpTransfer;

impl Transfer for HttpTransfer {
    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let response = reqwest::get(url).await.map_err(|e| Error::DownloadFailure {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let response = response.error_for_status().map_err(|e| Error::DownloadFailure {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let bytes = response.bytes().await.map_err(|e| Error::DownloadFailure {
            url: url.to_string(),
            reason: format!("reading response body: {e}"),
        })?;

        Ok(bytes.to_vec())
    }
}

/// Retrieves remote artifacts into the local cache.
pub struct Fetcher<T: Transfer> {
    transfer: T,
}

impl<T: Transfer> Fetcher<T> {
    /// Create a fetcher over a transfer capability.
    pub fn new(transfer: T) -> Self {
        Self { transfer }
    }

    /// Fetch `url` to `dest`, skipping the transfer when `dest` exists.
    ///
    /// On first download, `expected_sha256` (hex, case-insensitive) is
    /// verified when given. Verification happens before the write, so a
    /// mismatch leaves no file behind for later runs to mistake for a
    /// cache hit.
    pub async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        expected_sha256: Option<&str>,
    ) -> Result<SourceArtifact> {
        if dest.exists() {
            log::info!("{} already present, skipping download", dest.display());
            let size = tokio::fs::metadata(dest)
                .await
                .fs_context("reading artifact metadata", dest)?
                .len();
            return Ok(SourceArtifact {
                path: dest.to_path_buf(),
                size,
                sha256: None,
            });
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .fs_context("creating cache directory", parent)?;
        }

        log::info!("downloading {}", url);
        let data = self.transfer.get(url).await?;

        let digest = hex::encode(Sha256::digest(&data));
        if let Some(expected) = expected_sha256
            && !digest.eq_ignore_ascii_case(expected)
        {
            return Err(Error::ChecksumMismatch {
                url: url.to_string(),
                expected: expected.to_string(),
                actual: digest,
            });
        }

        let size = data.len() as u64;
        tokio::fs::write(dest, data)
            .await
            .fs_context("writing downloaded artifact", dest)?;

        log::info!("fetched {} ({} bytes)", dest.display(), size);
        Ok(SourceArtifact {
            path: dest.to_path_buf(),
            size,
            sha256: Some(digest),
        })
    }
}
