//! Homebrew formula updater
//!
//! A change for artifact `tool` targets `<formula_dir>/tool.rb`. The
//! `version "..."` field is rewritten first; when that changed the text, the
//! release artifact is downloaded from the interpolated `url` template and
//! its digest replaces the `sha256 "..."` field.

use super::{splice, Edit, ManifestUpdater};
use crate::checksum::ChecksumFetcher;
use crate::config::BrewConfig;
use crate::domain::{Kind, VersionChange};
use crate::error::{ChecksumError, ManifestError};
use crate::update::PropagationContext;
use async_trait::async_trait;
use regex::Regex;
use std::fs;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

const FORMULA_EXTENSION: &str = "rb";

/// Regex for the `version "x.y.z"` field
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*version\s+"([^"]*)""#).unwrap());

/// Regex for the `url "..."` field
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*url\s+"([^"]*)""#).unwrap());

/// Regex for the `sha256 "..."` field
static SHA256_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*sha256\s+"([^"]*)""#).unwrap());

/// Updater for Homebrew formulae
pub struct BrewUpdater {
    config: BrewConfig,
    fetcher: Arc<dyn ChecksumFetcher>,
}

impl BrewUpdater {
    /// Create a new updater fetching checksums through `fetcher`
    pub fn new(config: BrewConfig, fetcher: Arc<dyn ChecksumFetcher>) -> Self {
        Self { config, fetcher }
    }

    fn formula(&self, artifact: &str) -> PathBuf {
        self.config
            .formula_dir
            .join(format!("{}.{}", artifact, FORMULA_EXTENSION))
    }

    /// Downloads the release artifact and returns its digest
    async fn checksum(&self, content: &str) -> Result<String, ChecksumError> {
        let template = field(&URL_RE, content)
            .map(|(value, _)| value)
            .ok_or(ChecksumError::MissingUrl)?;
        let version = field(&VERSION_RE, content)
            .map(|(value, _)| value)
            .unwrap_or_default();
        let url = template.replace("#{version}", version);

        match tokio::time::timeout(self.config.checksum_timeout, self.fetcher.sha256(&url)).await {
            Ok(result) => result,
            Err(_) => Err(ChecksumError::timeout(url)),
        }
    }
}

/// Returns the first capture of `re` and its byte range
fn field<'a>(re: &Regex, content: &'a str) -> Option<(&'a str, Range<usize>)> {
    let capture = re.captures(content)?.get(1)?;
    Some((capture.as_str(), capture.range()))
}

#[async_trait]
impl ManifestUpdater for BrewUpdater {
    fn kind(&self) -> Kind {
        Kind::Brew
    }

    fn is_applicable(&self, ctx: &PropagationContext) -> bool {
        ctx.is_dir(&self.config.formula_dir)
    }

    fn extract_source_versions(
        &self,
        ctx: &PropagationContext,
    ) -> Result<Vec<VersionChange>, ManifestError> {
        if !self.is_applicable(ctx) {
            return Ok(Vec::new());
        }
        let dir = ctx.resolve(&self.config.formula_dir)?;
        let mut formulae: Vec<PathBuf> = fs::read_dir(&dir)
            .map_err(|e| ManifestError::read_error(&dir, e))?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path.extension().and_then(|e| e.to_str()) == Some(FORMULA_EXTENSION)
            })
            .collect();
        formulae.sort();

        let mut changes = Vec::new();
        for path in formulae {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let content = ctx.read_manifest(&path)?;
            if let Some((version, _)) = field(&VERSION_RE, &content) {
                changes.push(VersionChange::new(Kind::Brew, name, version));
            }
        }
        Ok(changes)
    }

    async fn apply_version_changes(
        &self,
        ctx: &mut PropagationContext,
        changes: &[VersionChange],
    ) -> Result<bool, ManifestError> {
        if changes.is_empty() || !self.is_applicable(ctx) {
            return Ok(false);
        }

        let mut changed = false;
        for change in changes {
            let Ok(path) = ctx.resolve(self.formula(&change.artifact)) else {
                debug!(artifact = %change.artifact, "formula path outside working copy");
                continue;
            };
            if !path.is_file() {
                continue;
            }
            let content = ctx.read_manifest(&path)?;
            let Some((old, range)) = field(&VERSION_RE, &content) else {
                continue;
            };

            ctx.record_substitution(change, &path, old, change.version.as_str());
            if old == change.version {
                continue;
            }
            let mut updated = splice(&content, &[Edit::new(range, change.version.as_str())]);

            match self.checksum(&updated).await {
                Ok(digest) => {
                    let sha256 = field(&SHA256_RE, &updated).map(|(_, range)| range);
                    if let Some(range) = sha256 {
                        updated = splice(&updated, &[Edit::new(range, digest)]);
                    }
                }
                Err(e) => {
                    warn!(
                        formula = %path.display(),
                        error = %e,
                        "checksum update failed; version updated without checksum"
                    );
                    ctx.warn(change, format!("partially applied: {}", e));
                }
            }

            ctx.write_manifest(&path, &updated)?;
            changed = true;
        }
        Ok(changed)
    }
}
