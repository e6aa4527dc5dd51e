//! HTTP checksum fetcher
//!
//! Downloads the artifact with a configurable timeout and User-Agent and
//! hashes the body with SHA-256. Requests are never retried; the caller
//! decides what a failure means.

use super::ChecksumFetcher;
use crate::error::ChecksumError;
use async_trait::async_trait;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::debug;

/// Default timeout for checksum downloads (30 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default User-Agent header
const DEFAULT_USER_AGENT: &str = concat!("depush/", env!("CARGO_PKG_VERSION"));

/// Checksum fetcher backed by reqwest
#[derive(Clone)]
pub struct HttpChecksumFetcher {
    client: Client,
}

impl HttpChecksumFetcher {
    /// Create a fetcher with default settings
    pub fn new() -> Result<Self, ChecksumError> {
        Self::with_config(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// Create a fetcher with custom configuration
    pub fn with_config(timeout: Duration, user_agent: &str) -> Result<Self, ChecksumError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                ChecksumError::network_error("", format!("failed to create HTTP client: {}", e))
            })?;
        Ok(Self { client })
    }

    /// Create a fetcher with the given timeout and the default User-Agent
    pub fn with_timeout(timeout: Duration) -> Result<Self, ChecksumError> {
        Self::with_config(timeout, DEFAULT_USER_AGENT)
    }
}

#[async_trait]
impl ChecksumFetcher for HttpChecksumFetcher {
    async fn sha256(&self, url: &str) -> Result<String, ChecksumError> {
        debug!(url, "fetching artifact for checksum");
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ChecksumError::timeout(url)
            } else {
                ChecksumError::network_error(url, e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(ChecksumError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ChecksumError::network_error(url, e.to_string()))?;
        Ok(sha256_hex(&body))
    }
}

/// Lowercase hex SHA-256 of `bytes`
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
