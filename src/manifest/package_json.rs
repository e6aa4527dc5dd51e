//! package.json updater for npm packages
//!
//! Handles:
//! - dependencies
//! - devDependencies
//!
//! The document is validated and queried with `serde_json`; only the byte
//! range of each matched version string is rewritten so key order, spacing
//! and unrelated fields stay as they were.

use super::json_span::value_span;
use super::{splice, Edit, ManifestUpdater};
use crate::domain::{Kind, VersionChange};
use crate::error::ManifestError;
use crate::update::PropagationContext;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MANIFEST: &str = "package.json";

/// Dependency sections rewritten by the updater
const SECTIONS: [&str; 2] = ["dependencies", "devDependencies"];

/// Updater for package.json files
pub struct NpmUpdater;

#[async_trait]
impl ManifestUpdater for NpmUpdater {
    fn kind(&self) -> Kind {
        Kind::Npm
    }

    fn is_applicable(&self, ctx: &PropagationContext) -> bool {
        ctx.exists(MANIFEST)
    }

    fn claimed_manifests(&self, ctx: &PropagationContext) -> Vec<PathBuf> {
        ctx.resolve(MANIFEST).into_iter().collect()
    }

    fn extract_source_versions(
        &self,
        ctx: &PropagationContext,
    ) -> Result<Vec<VersionChange>, ManifestError> {
        if !self.is_applicable(ctx) {
            return Ok(Vec::new());
        }
        let path = ctx.resolve(MANIFEST)?;
        let json = parse(&path, &ctx.read_manifest(&path)?)?;

        if json.get("private").and_then(Value::as_bool) == Some(true) {
            return Ok(Vec::new());
        }
        let name = json.get("name").and_then(Value::as_str);
        let version = json.get("version").and_then(Value::as_str);
        Ok(match (name, version) {
            (Some(name), Some(version)) => vec![VersionChange::new(Kind::Npm, name, version)],
            _ => Vec::new(),
        })
    }

    async fn apply_version_changes(
        &self,
        ctx: &mut PropagationContext,
        changes: &[VersionChange],
    ) -> Result<bool, ManifestError> {
        if changes.is_empty() || !self.is_applicable(ctx) {
            return Ok(false);
        }
        let path = ctx.resolve(MANIFEST)?;
        let content = ctx.read_manifest(&path)?;
        match rewrite_dependencies(ctx, &path, &content, changes)? {
            Some(updated) => {
                ctx.write_manifest(&path, &updated)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn parse(path: &Path, content: &str) -> Result<Value, ManifestError> {
    serde_json::from_str(content).map_err(|e| ManifestError::json_parse_error(path, e.to_string()))
}

/// Rewrites matching dependency versions in package.json text
///
/// Every match is recorded in the context. Returns the new text if any value
/// changed.
pub(crate) fn rewrite_dependencies(
    ctx: &mut PropagationContext,
    path: &Path,
    content: &str,
    changes: &[VersionChange],
) -> Result<Option<String>, ManifestError> {
    let json = parse(path, content)?;
    let mut edits = Vec::new();

    for change in changes {
        for section in SECTIONS {
            let Some(old) = json
                .get(section)
                .and_then(|deps| deps.get(&change.artifact))
                .and_then(Value::as_str)
            else {
                continue;
            };

            let new = keep_range_prefix(old, &change.version);
            ctx.record_substitution(change, path, old, new.as_str());
            if old == new {
                continue;
            }

            let span = value_span(content, &[section, change.artifact.as_str()]).ok_or_else(|| {
                ManifestError::unsupported_layout(
                    path,
                    format!("cannot locate {}.{}", section, change.artifact),
                )
            })?;
            edits.push(Edit::new(span, Value::String(new).to_string()));
        }
    }

    if edits.is_empty() {
        return Ok(None);
    }
    Ok(Some(splice(content, &edits)))
}

/// Carries a `^` or `~` range operator over to the new version
fn keep_range_prefix(old: &str, new: &str) -> String {
    let starts_with_range = |v: &str| v.starts_with('^') || v.starts_with('~');
    if starts_with_range(old) && !starts_with_range(new) {
        format!("{}{}", &old[..1], new)
    } else {
        new.to_string()
    }
}
