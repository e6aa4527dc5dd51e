//! Jenkins plugin list updater
//!
//! The list holds one `name:version` entry per line. A change matches a line
//! when `prefix + name` equals its artifact. Comments, blank lines and line
//! endings pass through unchanged.

use super::{splice, Edit, ManifestUpdater};
use crate::config::PluginsConfig;
use crate::domain::{Kind, VersionChange};
use crate::error::ManifestError;
use crate::update::PropagationContext;
use async_trait::async_trait;
use std::ops::Range;
use std::path::PathBuf;

/// Updater for plugin lists
pub struct PluginsUpdater {
    config: Option<PluginsConfig>,
}

impl PluginsUpdater {
    /// Create a new updater; without settings the kind never applies
    pub fn new(config: Option<PluginsConfig>) -> Self {
        Self { config }
    }
}

/// One `name:version` line
#[derive(Debug, PartialEq, Eq)]
struct PluginLine<'a> {
    name: &'a str,
    version: &'a str,
    range: Range<usize>,
}

/// Parses every plugin line with the byte range of its version
fn plugin_lines(content: &str) -> Vec<PluginLine<'_>> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let start = offset;
        offset += line.len();

        let text = line.trim_end_matches(['\n', '\r']);
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((name, version)) = text.split_once(':') else {
            continue;
        };
        let version_start = start + name.len() + 1;
        let lead = version.len() - version.trim_start().len();
        let version = version.trim();
        if name.trim().is_empty() || version.is_empty() {
            continue;
        }
        lines.push(PluginLine {
            name: name.trim(),
            version,
            range: version_start + lead..version_start + lead + version.len(),
        });
    }
    lines
}

#[async_trait]
impl ManifestUpdater for PluginsUpdater {
    fn kind(&self) -> Kind {
        Kind::Plugins
    }

    fn is_applicable(&self, ctx: &PropagationContext) -> bool {
        self.config
            .as_ref()
            .map(|c| ctx.exists(&c.file))
            .unwrap_or(false)
    }

    fn claimed_manifests(&self, ctx: &PropagationContext) -> Vec<PathBuf> {
        self.config
            .as_ref()
            .and_then(|c| ctx.resolve(&c.file).ok())
            .into_iter()
            .collect()
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
        let Some(config) = &self.config else {
            return Ok(false);
        };
        if changes.is_empty() || !self.is_applicable(ctx) {
            return Ok(false);
        }

        let path = ctx.resolve(&config.file)?;
        let content = ctx.read_manifest(&path)?;
        let mut edits = Vec::new();

        for line in plugin_lines(&content) {
            let artifact = format!("{}{}", config.prefix, line.name);
            for change in changes.iter().filter(|c| c.artifact == artifact) {
                ctx.record_substitution(change, &path, line.version, change.version.as_str());
                if line.version != change.version {
                    edits.push(Edit::new(line.range.clone(), change.version.as_str()));
                }
            }
        }

        if edits.is_empty() {
            return Ok(false);
        }
        let updated = splice(&content, &edits);
        ctx.write_manifest(&path, &updated)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const PLUGINS: &str = "# Jenkins plugins\r\ngit:3.8.0\r\nbranch-api:2.5.0\r\n\r\nworkflow-aggregator:2.5\r\n";

    fn repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("plugins.txt"), PLUGINS).unwrap();
        dir
    }

    fn updater() -> PluginsUpdater {
        PluginsUpdater::new(Some(PluginsConfig::new("plugins.txt")))
    }

    #[tokio::test]
    async fn test_updates_matching_line_only() {
        let dir = repo();
        let change = VersionChange::new(Kind::Plugins, "org.jenkins-ci.plugins:branch-api", "3.0.0");
        let mut ctx = PropagationContext::new(dir.path(), vec![change.clone()]);

        let changed = updater()
            .apply_version_changes(&mut ctx, &[change.clone()])
            .await
            .unwrap();

        assert!(changed);
        assert!(ctx.is_matched(&change));
        let content = fs::read_to_string(dir.path().join("plugins.txt")).unwrap();
        assert_eq!(content, PLUGINS.replace("branch-api:2.5.0", "branch-api:3.0.0"));
    }

    #[tokio::test]
    async fn test_custom_prefix() {
        let dir = repo();
        let updater = PluginsUpdater::new(Some(
            PluginsConfig::new("plugins.txt").with_prefix("io.jenkins:"),
        ));
        let default_prefixed =
            VersionChange::new(Kind::Plugins, "org.jenkins-ci.plugins:git", "4.0.0");
        let custom = VersionChange::new(Kind::Plugins, "io.jenkins:git", "4.0.0");
        let changes = vec![default_prefixed.clone(), custom.clone()];
        let mut ctx = PropagationContext::new(dir.path(), changes.clone());

        assert!(updater
            .apply_version_changes(&mut ctx, &changes)
            .await
            .unwrap());
        assert!(!ctx.is_matched(&default_prefixed));
        assert!(ctx.is_matched(&custom));
    }

    #[tokio::test]
    async fn test_reapply_is_noop() {
        let dir = repo();
        let change = VersionChange::new(Kind::Plugins, "org.jenkins-ci.plugins:git", "3.8.0");
        let mut ctx = PropagationContext::new(dir.path(), vec![change.clone()]);
        assert!(!updater()
            .apply_version_changes(&mut ctx, &[change.clone()])
            .await
            .unwrap());
        assert!(ctx.is_matched(&change));
    }

    #[test]
    fn test_not_applicable_without_settings() {
        let dir = repo();
        let ctx = PropagationContext::new(dir.path(), vec![]);
        assert!(!PluginsUpdater::new(None).is_applicable(&ctx));
        assert!(updater().is_applicable(&ctx));
        assert!(updater().extract_source_versions(&ctx).unwrap().is_empty());
    }

    #[test]
    fn test_plugin_lines() {
        let lines = plugin_lines(PLUGINS);
        let names: Vec<&str> = lines.iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["git", "branch-api", "workflow-aggregator"]);
        assert_eq!(&PLUGINS[lines[1].range.clone()], "2.5.0");
    }
}
