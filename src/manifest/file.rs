//! Fallback updater for loose build files
//!
//! Handles, in this order:
//! - package.json (`dependencies` and `devDependencies`)
//! - gradle.properties (`key=value`, keyed by the change property or artifact)
//! - Dockerfile (`FROM image:tag`)
//!
//! Files claimed by a structured kind earlier in the pass are left alone.
//! The first file in which any change matched ends the pass.

use super::package_json::rewrite_dependencies;
use super::{splice, Edit, ManifestUpdater};
use crate::domain::{Kind, VersionChange};
use crate::error::ManifestError;
use crate::update::PropagationContext;
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

/// Recognized files in lookup order
const RECOGNIZED: [&str; 3] = ["package.json", "gradle.properties", "Dockerfile"];

/// Regex for `FROM image:tag` instructions
///
/// The tag follows the last `:` after the final `/`, so a registry port
/// (`localhost:5000/app:1.2`) stays part of the image.
static FROM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*FROM[ \t]+(?:--platform=\S+[ \t]+)?([^\s@]+):([^\s:@/]+)(?:@\S+)?(?:\s|$)",
    )
    .unwrap()
});

/// Updater for loose build files
pub struct FileUpdater;

impl FileUpdater {
    /// Recognized files present in the working copy and not yet claimed
    fn candidates(&self, ctx: &PropagationContext) -> Vec<PathBuf> {
        RECOGNIZED
            .iter()
            .filter_map(|name| ctx.resolve(name).ok())
            .filter(|path| path.is_file() && !ctx.is_claimed(path))
            .collect()
    }
}

#[async_trait]
impl ManifestUpdater for FileUpdater {
    fn kind(&self) -> Kind {
        Kind::File
    }

    fn is_applicable(&self, ctx: &PropagationContext) -> bool {
        !self.candidates(ctx).is_empty()
    }

    fn extract_source_versions(
        &self,
        _ctx: &PropagationContext,
    ) -> Result<Vec<VersionChange>, ManifestError> {
        Ok(Vec::new())
    }

    async fn apply_version_changes(
        &self,
        ctx: &mut PropagationContext,
        changes: &[VersionChange],
    ) -> Result<bool, ManifestError> {
        if changes.is_empty() {
            return Ok(false);
        }

        for path in self.candidates(ctx) {
            let content = ctx.read_manifest(&path)?;
            let matched_before = ctx.substitutions().len();

            let updated = match file_name(&path) {
                "package.json" => rewrite_dependencies(ctx, &path, &content, changes)?,
                "gradle.properties" => rewrite_properties(ctx, &path, &content, changes),
                _ => rewrite_from(ctx, &path, &content, changes),
            };

            if ctx.substitutions().len() == matched_before {
                debug!(file = %path.display(), "no change matched");
                continue;
            }
            return match updated {
                Some(updated) => {
                    ctx.write_manifest(&path, &updated)?;
                    Ok(true)
                }
                None => Ok(false),
            };
        }
        Ok(false)
    }
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

/// Rewrites `key=value` lines of a properties file
fn rewrite_properties(
    ctx: &mut PropagationContext,
    path: &Path,
    content: &str,
    changes: &[VersionChange],
) -> Option<String> {
    let mut edits = Vec::new();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let start = offset;
        offset += line.len();

        let text = line.trim_end_matches(['\n', '\r']);
        let trimmed = text.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }
        let Some((key, value)) = text.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let lead = value.len() - value.trim_start().len();
        let current = value.trim();
        let value_start = start + text.len() - value.len() + lead;

        let matching = changes
            .iter()
            .filter(|c| c.property.as_deref().unwrap_or(&c.artifact) == key);
        for change in matching {
            ctx.record_substitution(change, path, current, change.version.as_str());
            if current != change.version {
                edits.push(Edit::new(
                    value_start..value_start + current.len(),
                    change.version.as_str(),
                ));
            }
        }
    }

    (!edits.is_empty()).then(|| splice(content, &edits))
}

/// Rewrites the tag of `FROM image:tag` instructions
fn rewrite_from(
    ctx: &mut PropagationContext,
    path: &Path,
    content: &str,
    changes: &[VersionChange],
) -> Option<String> {
    let mut edits = Vec::new();
    for captures in FROM_RE.captures_iter(content) {
        let (Some(image), Some(tag)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        for change in changes.iter().filter(|c| c.artifact == image.as_str()) {
            ctx.record_substitution(change, path, tag.as_str(), change.version.as_str());
            if tag.as_str() != change.version {
                edits.push(Edit::new(tag.range(), change.version.as_str()));
            }
        }
    }

    (!edits.is_empty()).then(|| splice(content, &edits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    async fn apply(dir: &TempDir, changes: &[VersionChange]) -> (bool, PropagationContext) {
        let mut ctx = PropagationContext::new(dir.path(), changes.to_vec());
        let changed = FileUpdater
            .apply_version_changes(&mut ctx, changes)
            .await
            .unwrap();
        (changed, ctx)
    }

    #[tokio::test]
    async fn test_gradle_properties_by_property() {
        let dir = TempDir::new().unwrap();
        let content = "# versions\nspringVersion = 5.0.4\nkotlinVersion=1.2.30\r\n";
        fs::write(dir.path().join("gradle.properties"), content).unwrap();
        let change =
            VersionChange::new(Kind::File, "org.springframework:spring-core", "5.0.5")
                .with_property("springVersion");

        let (changed, ctx) = apply(&dir, &[change.clone()]).await;

        assert!(changed);
        assert!(ctx.is_matched(&change));
        assert_eq!(
            fs::read_to_string(dir.path().join("gradle.properties")).unwrap(),
            "# versions\nspringVersion = 5.0.5\nkotlinVersion=1.2.30\r\n"
        );
    }

    #[tokio::test]
    async fn test_dockerfile_tag() {
        let dir = TempDir::new().unwrap();
        let content = "FROM node:8.9.4 AS build\nRUN npm ci\nFROM nginx:1.13\n";
        fs::write(dir.path().join("Dockerfile"), content).unwrap();
        let change = VersionChange::new(Kind::File, "node", "8.10.0");

        let (changed, _) = apply(&dir, &[change]).await;

        assert!(changed);
        assert_eq!(
            fs::read_to_string(dir.path().join("Dockerfile")).unwrap(),
            "FROM node:8.10.0 AS build\nRUN npm ci\nFROM nginx:1.13\n"
        );
    }

    #[tokio::test]
    async fn test_dockerfile_registry_port() {
        let dir = TempDir::new().unwrap();
        let content = "FROM localhost:5000/app:1.2\nFROM localhost:5000/base\n";
        fs::write(dir.path().join("Dockerfile"), content).unwrap();
        let host = VersionChange::new(Kind::File, "localhost", "9.9");
        let app = VersionChange::new(Kind::File, "localhost:5000/app", "1.3");

        let (changed, ctx) = apply(&dir, &[host.clone()]).await;
        assert!(!changed);
        assert!(!ctx.is_matched(&host));
        assert_eq!(
            fs::read_to_string(dir.path().join("Dockerfile")).unwrap(),
            content
        );

        let (changed, _) = apply(&dir, &[app]).await;
        assert!(changed);
        assert_eq!(
            fs::read_to_string(dir.path().join("Dockerfile")).unwrap(),
            "FROM localhost:5000/app:1.3\nFROM localhost:5000/base\n"
        );
    }

    #[tokio::test]
    async fn test_package_json() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            "{\"dependencies\": {\"left-pad\": \"1.1.0\"}}",
        )
        .unwrap();
        let change = VersionChange::new(Kind::File, "left-pad", "1.3.0");

        let (changed, _) = apply(&dir, &[change]).await;

        assert!(changed);
        assert!(fs::read_to_string(dir.path().join("package.json"))
            .unwrap()
            .contains("\"left-pad\": \"1.3.0\""));
    }

    #[tokio::test]
    async fn test_skips_claimed_files() {
        let dir = TempDir::new().unwrap();
        let package = dir.path().join("package.json");
        fs::write(&package, "{\"dependencies\": {\"node\": \"1.0.0\"}}").unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM node:8.9.4\n").unwrap();
        let change = VersionChange::new(Kind::File, "node", "8.10.0");

        let mut ctx = PropagationContext::new(dir.path(), vec![change.clone()]);
        ctx.claim(package.clone());
        let changed = FileUpdater
            .apply_version_changes(&mut ctx, &[change])
            .await
            .unwrap();

        assert!(changed);
        assert_eq!(
            fs::read_to_string(&package).unwrap(),
            "{\"dependencies\": {\"node\": \"1.0.0\"}}"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("Dockerfile")).unwrap(),
            "FROM node:8.10.0\n"
        );
    }

    #[tokio::test]
    async fn test_stops_at_first_matching_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("gradle.properties"), "node=8.9.4\n").unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM node:8.9.4\n").unwrap();
        let change = VersionChange::new(Kind::File, "node", "8.10.0");

        let (changed, ctx) = apply(&dir, &[change]).await;

        assert!(changed);
        assert_eq!(ctx.substitutions().len(), 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("Dockerfile")).unwrap(),
            "FROM node:8.9.4\n"
        );
    }

    #[tokio::test]
    async fn test_matched_but_current_stops_without_write() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("gradle.properties"), "node=8.10.0\n").unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM node:8.9.4\n").unwrap();
        let change = VersionChange::new(Kind::File, "node", "8.10.0");

        let (changed, ctx) = apply(&dir, &[change.clone()]).await;

        assert!(!changed);
        assert!(ctx.is_matched(&change));
        assert_eq!(
            fs::read_to_string(dir.path().join("Dockerfile")).unwrap(),
            "FROM node:8.9.4\n"
        );
    }

    #[test]
    fn test_applicability() {
        let dir = TempDir::new().unwrap();
        let ctx = PropagationContext::new(dir.path(), vec![]);
        assert!(!FileUpdater.is_applicable(&ctx));

        let dockerfile = dir.path().join("Dockerfile");
        fs::write(&dockerfile, "FROM alpine:3.7\n").unwrap();
        let mut ctx = PropagationContext::new(dir.path(), vec![]);
        assert!(FileUpdater.is_applicable(&ctx));
        ctx.claim(dockerfile);
        assert!(!FileUpdater.is_applicable(&ctx));
    }
}
