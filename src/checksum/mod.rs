//! Checksums of released artifacts
//!
//! This module provides:
//! - The `ChecksumFetcher` contract used by the Brew updater
//! - `HttpChecksumFetcher`, downloading the artifact over HTTP and hashing it

mod client;

pub use client::{sha256_hex, HttpChecksumFetcher};

use crate::error::ChecksumError;
use async_trait::async_trait;

/// Fetches an artifact and returns its lowercase hex SHA-256 digest
#[async_trait]
pub trait ChecksumFetcher: Send + Sync {
    async fn sha256(&self, url: &str) -> Result<String, ChecksumError>;
}
