//! Metadata acquisition for URL-based torrent sources.

use async_trait::async_trait;
use url::Url;

use super::parsing::{MetainfoDecoder, TorrentMetadata};
use super::TorrentError;
use crate::config::NetworkConfig;

/// Runtime service that turns a `.torrent` URL into decoded metadata.
///
/// Only invoked when a deferred metadata source runs, never while a
/// processing context is being resolved.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Downloads and decodes the metainfo document at `url`.
    ///
    /// # Errors
    ///
    /// - `TorrentError::MetadataFetchFailed` - Non-success status, oversized or unsupported document
    /// - `TorrentError::Http` - Connection or transport failure
    /// - `TorrentError::InvalidTorrentFile` - Response is not valid metainfo
    async fn fetch_from_url(&self, url: &Url) -> Result<TorrentMetadata, TorrentError>;
}

/// Fetches metainfo over HTTP(S), or from disk for `file://` URLs.
pub struct HttpMetadataFetcher {
    client: reqwest::Client,
    max_size: usize,
}

impl HttpMetadataFetcher {
    /// Creates a fetcher using the timeout, user agent and limits in `config`.
    ///
    /// # Errors
    ///
    /// - `TorrentError::Http` - HTTP client could not be constructed
    pub fn new(config: &NetworkConfig) -> Result<Self, TorrentError> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .user_agent(config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self {
            client,
            max_size: config.max_metainfo_size,
        })
    }

    async fn fetch_http(&self, url: &Url) -> Result<Vec<u8>, TorrentError> {
        let failed = |reason: String| TorrentError::MetadataFetchFailed {
            url: url.to_string(),
            reason,
        };

        let mut response = self.client.get(url.clone()).send().await.map_err(|e| {
            tracing::warn!("Metadata request to {} failed: {}", url, e);
            TorrentError::Http(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Metadata server {} returned status {}", url, status);
            return Err(failed(format!("HTTP status {status}")));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_size as u64 {
                return Err(failed(format!(
                    "document is {length} bytes, limit is {}",
                    self.max_size
                )));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > self.max_size {
                return Err(failed(format!(
                    "document exceeds {} bytes",
                    self.max_size
                )));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }

    async fn fetch_file(&self, url: &Url) -> Result<Vec<u8>, TorrentError> {
        let path = url.to_file_path().map_err(|()| TorrentError::MetadataFetchFailed {
            url: url.to_string(),
            reason: "not a local file path".to_string(),
        })?;

        let size = tokio::fs::metadata(&path).await?.len();
        if size > self.max_size as u64 {
            return Err(TorrentError::MetadataFetchFailed {
                url: url.to_string(),
                reason: format!("document is {size} bytes, limit is {}", self.max_size),
            });
        }

        Ok(tokio::fs::read(&path).await?)
    }
}

#[async_trait]
impl MetadataFetcher for HttpMetadataFetcher {
    async fn fetch_from_url(&self, url: &Url) -> Result<TorrentMetadata, TorrentError> {
        tracing::debug!("Fetching torrent metadata from {}", url);

        let body = match url.scheme() {
            "http" | "https" => self.fetch_http(url).await?,
            "file" => self.fetch_file(url).await?,
            scheme => {
                return Err(TorrentError::MetadataFetchFailed {
                    url: url.to_string(),
                    reason: format!("unsupported scheme: {scheme}"),
                });
            }
        };

        let metadata = MetainfoDecoder::decode(&body)?;
        tracing::debug!(
            "Fetched metadata for {} ({} pieces)",
            metadata.info_hash,
            metadata.piece_count()
        );
        Ok(metadata)
    }
}
