//! Helm chart updater
//!
//! Rewrites `requirements.yaml` dependency versions of a chart and of the
//! charts nested below it. `serde_yaml` validates each file; a line scanner
//! locates the `version` scalar of every block-style `dependencies` entry so
//! quoting and comments survive the rewrite.

use super::{splice, Edit, ManifestUpdater};
use crate::domain::{Kind, VersionChange};
use crate::error::ManifestError;
use crate::update::PropagationContext;
use async_trait::async_trait;
use serde_yaml::Value;
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::debug;

const CHART: &str = "Chart.yaml";
const REQUIREMENTS: &str = "requirements.yaml";

/// Deepest directory level visited below the chart root
const MAX_DEPTH: usize = 16;

/// Updater for Helm charts
pub struct HelmUpdater;

#[async_trait]
impl ManifestUpdater for HelmUpdater {
    fn kind(&self) -> Kind {
        Kind::Helm
    }

    fn is_applicable(&self, ctx: &PropagationContext) -> bool {
        ctx.exists(CHART)
    }

    fn claimed_manifests(&self, ctx: &PropagationContext) -> Vec<PathBuf> {
        [CHART, REQUIREMENTS]
            .iter()
            .filter_map(|name| ctx.resolve(name).ok())
            .collect()
    }

    fn extract_source_versions(
        &self,
        ctx: &PropagationContext,
    ) -> Result<Vec<VersionChange>, ManifestError> {
        if !self.is_applicable(ctx) {
            return Ok(Vec::new());
        }
        let path = ctx.resolve(CHART)?;
        let chart = parse(&path, &ctx.read_manifest(&path)?)?;

        let name = chart.get("name").and_then(scalar);
        let version = chart.get("version").and_then(scalar);
        Ok(match (name, version) {
            (Some(name), Some(version)) => vec![VersionChange::new(Kind::Helm, name, version)],
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

        let mut changed = false;
        for path in requirement_files(ctx.root())? {
            let content = ctx.read_manifest(&path)?;
            if let Some(updated) = rewrite_requirements(ctx, &path, &content, changes)? {
                ctx.write_manifest(&path, &updated)?;
                changed = true;
            }
        }
        Ok(changed)
    }
}

fn parse(path: &Path, content: &str) -> Result<Value, ManifestError> {
    serde_yaml::from_str(content).map_err(|e| ManifestError::yaml_parse_error(path, e.to_string()))
}

/// Renders a YAML scalar the way it appears in a version field
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn walk_error(path: &Path, e: std::io::Error) -> ManifestError {
    ManifestError::WalkError {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Collects requirements files breadth-first from `root`
///
/// A non-root directory holding a `Chart.yaml` is a chart of its own; its
/// requirements are visited but its subdirectories are not.
fn requirement_files(root: &Path) -> Result<Vec<PathBuf>, ManifestError> {
    let mut files = Vec::new();
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([(root.to_path_buf(), 0usize)]);

    while let Some((dir, depth)) = queue.pop_front() {
        let canonical = fs::canonicalize(&dir).map_err(|e| walk_error(&dir, e))?;
        if !visited.insert(canonical) {
            continue;
        }

        let requirements = dir.join(REQUIREMENTS);
        if requirements.is_file() {
            files.push(requirements);
        }

        if depth > 0 && dir.join(CHART).is_file() {
            debug!(dir = %dir.display(), "chart boundary");
            continue;
        }
        if depth >= MAX_DEPTH {
            debug!(dir = %dir.display(), "depth limit reached");
            continue;
        }

        let mut children = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| walk_error(&dir, e))? {
            let entry = entry.map_err(|e| walk_error(&dir, e))?;
            let file_type = entry.file_type().map_err(|e| walk_error(&entry.path(), e))?;
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if file_type.is_dir() && !hidden {
                children.push(entry.path());
            }
        }
        children.sort();
        queue.extend(children.into_iter().map(|child| (child, depth + 1)));
    }
    Ok(files)
}

/// Rewrites matching entries of one requirements file
///
/// Returns the new text if any version changed.
fn rewrite_requirements(
    ctx: &mut PropagationContext,
    path: &Path,
    content: &str,
    changes: &[VersionChange],
) -> Result<Option<String>, ManifestError> {
    let document = parse(path, content)?;
    let declared: Vec<&str> = document
        .get("dependencies")
        .and_then(Value::as_sequence)
        .map(|deps| {
            deps.iter()
                .filter_map(|d| d.get("name").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();
    let entries = scan_entries(content);

    let mut edits = Vec::new();
    for change in changes {
        let expected = declared.iter().filter(|n| **n == change.artifact).count();
        if expected == 0 {
            continue;
        }

        let located: Vec<&Scalar> = entries
            .iter()
            .filter(|e| e.name.as_ref().map(|n| n.value == change.artifact).unwrap_or(false))
            .filter_map(|e| e.version.as_ref())
            .collect();
        if located.len() < expected {
            return Err(ManifestError::unsupported_layout(
                path,
                format!("cannot locate version of dependency '{}'", change.artifact),
            ));
        }

        for version in located {
            ctx.record_substitution(change, path, version.value.as_str(), change.version.as_str());
            if version.value != change.version {
                edits.push(Edit::new(version.range.clone(), change.version.as_str()));
            }
        }
    }

    if edits.is_empty() {
        return Ok(None);
    }
    Ok(Some(splice(content, &edits)))
}

/// A scalar value and the byte range of its text, quotes excluded
#[derive(Debug, Clone, PartialEq, Eq)]
struct Scalar {
    value: String,
    range: Range<usize>,
}

/// `name` and `version` of one block-style dependency entry
#[derive(Debug, Default)]
struct Entry {
    name: Option<Scalar>,
    version: Option<Scalar>,
}

impl Entry {
    fn set(&mut self, key: &str, value: Scalar) {
        match key {
            "name" => self.name = Some(value),
            "version" => self.version = Some(value),
            _ => {}
        }
    }
}

/// Scans the top-level `dependencies` list for block-style entries
fn scan_entries(content: &str) -> Vec<Entry> {
    let mut entries = Vec::new();
    let mut in_dependencies = false;
    // (dash column, key column, entry)
    let mut current: Option<(usize, usize, Entry)> = None;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let start = offset;
        offset += line.len();

        let text = line.trim_end_matches(['\n', '\r']);
        let trimmed = text.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let indent = text.len() - trimmed.len();

        if indent == 0 && !trimmed.starts_with('-') {
            entries.extend(current.take().map(|(_, _, e)| e));
            in_dependencies = trimmed.starts_with("dependencies:");
            continue;
        }
        if !in_dependencies {
            continue;
        }

        let starts_entry = current
            .as_ref()
            .map_or(true, |(dash, _, _)| indent <= *dash);
        if starts_entry {
            entries.extend(current.take().map(|(_, _, e)| e));
            let Some(rest) = trimmed.strip_prefix('-') else {
                continue;
            };
            let key_column = indent + 1 + (rest.len() - rest.trim_start().len());
            let mut entry = Entry::default();
            if let Some((key, value)) = read_pair(&text[key_column..], start + key_column) {
                entry.set(key, value);
            }
            current = Some((indent, key_column, entry));
            continue;
        }

        if let Some((_, key_column, entry)) = current.as_mut() {
            if indent == *key_column {
                if let Some((key, value)) = read_pair(trimmed, start + indent) {
                    entry.set(key, value);
                }
            }
        }
    }
    entries.extend(current.take().map(|(_, _, e)| e));
    entries
}

/// Splits `key: value` and returns the value's scalar span
fn read_pair(fragment: &str, base: usize) -> Option<(&str, Scalar)> {
    let colon = fragment.find(':')?;
    let key = fragment[..colon].trim().trim_matches(|c| c == '"' || c == '\'');
    let after = &fragment[colon + 1..];
    let value = after.trim_start();
    if value.is_empty() || after.len() == value.len() {
        return None;
    }
    let value_start = base + colon + 1 + (after.len() - value.len());

    let (text, range) = match value.chars().next()? {
        quote @ ('"' | '\'') => {
            let inner = &value[1..];
            let end = inner.find(quote)?;
            (&inner[..end], value_start + 1..value_start + 1 + end)
        }
        _ => {
            let token = value.split(" #").next().unwrap_or(value).trim_end();
            (token, value_start..value_start + token.len())
        }
    };
    Some((
        key,
        Scalar {
            value: text.to_string(),
            range,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CHART_YAML: &str = "apiVersion: v1\nname: umbrella\nversion: 1.2.3\n";

    const REQUIREMENTS_YAML: &str = r#"# Chart dependencies
dependencies:
  - name: subchart1
    version: "0.1.0"
    repository: "@stable"
  - name: subchart2
    version: 0.2.0 # pinned
    repository: https://charts.example.com
"#;

    fn chart(dir: &Path, requirements: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(CHART), CHART_YAML).unwrap();
        fs::write(dir.join(REQUIREMENTS), requirements).unwrap();
    }

    async fn apply(dir: &TempDir, change: &VersionChange) -> (bool, PropagationContext) {
        let mut ctx = PropagationContext::new(dir.path(), vec![change.clone()]);
        let changed = HelmUpdater
            .apply_version_changes(&mut ctx, std::slice::from_ref(change))
            .await
            .unwrap();
        (changed, ctx)
    }

    #[tokio::test]
    async fn test_updates_unquoted_version() {
        let dir = TempDir::new().unwrap();
        chart(dir.path(), REQUIREMENTS_YAML);
        let change = VersionChange::new(Kind::Helm, "subchart2", "0.2.1");

        let (changed, ctx) = apply(&dir, &change).await;

        assert!(changed);
        assert!(ctx.is_matched(&change));
        let content = fs::read_to_string(dir.path().join(REQUIREMENTS)).unwrap();
        assert_eq!(
            content,
            REQUIREMENTS_YAML.replace("version: 0.2.0 # pinned", "version: 0.2.1 # pinned")
        );
    }

    #[tokio::test]
    async fn test_keeps_quotes() {
        let dir = TempDir::new().unwrap();
        chart(dir.path(), REQUIREMENTS_YAML);
        let change = VersionChange::new(Kind::Helm, "subchart1", "0.1.5");

        let (changed, _) = apply(&dir, &change).await;

        assert!(changed);
        let content = fs::read_to_string(dir.path().join(REQUIREMENTS)).unwrap();
        assert!(content.contains("version: \"0.1.5\""));
    }

    #[tokio::test]
    async fn test_reapply_is_noop() {
        let dir = TempDir::new().unwrap();
        chart(dir.path(), REQUIREMENTS_YAML);
        let change = VersionChange::new(Kind::Helm, "subchart2", "0.2.0");

        let (changed, ctx) = apply(&dir, &change).await;

        assert!(!changed);
        assert!(ctx.is_matched(&change));
    }

    #[tokio::test]
    async fn test_nested_charts_and_boundary() {
        let dir = TempDir::new().unwrap();
        chart(dir.path(), "dependencies: []\n");
        let nested = dir.path().join("charts").join("app");
        chart(&nested, REQUIREMENTS_YAML);
        let below_boundary = nested.join("charts").join("inner");
        chart(&below_boundary, REQUIREMENTS_YAML);

        let change = VersionChange::new(Kind::Helm, "subchart2", "0.2.1");
        let (changed, _) = apply(&dir, &change).await;

        assert!(changed);
        let updated = fs::read_to_string(nested.join(REQUIREMENTS)).unwrap();
        assert!(updated.contains("version: 0.2.1"));
        let untouched = fs::read_to_string(below_boundary.join(REQUIREMENTS)).unwrap();
        assert_eq!(untouched, REQUIREMENTS_YAML);
    }

    #[tokio::test]
    async fn test_skips_hidden_directories() {
        let dir = TempDir::new().unwrap();
        chart(dir.path(), "dependencies: []\n");
        let hidden = dir.path().join(".git").join("chart");
        fs::create_dir_all(&hidden).unwrap();
        fs::write(hidden.join(REQUIREMENTS), REQUIREMENTS_YAML).unwrap();

        let change = VersionChange::new(Kind::Helm, "subchart2", "0.2.1");
        let (changed, ctx) = apply(&dir, &change).await;

        assert!(!changed);
        assert!(!ctx.is_matched(&change));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_skips_symlinked_directories() {
        let dir = TempDir::new().unwrap();
        chart(dir.path(), REQUIREMENTS_YAML);
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join(REQUIREMENTS), REQUIREMENTS_YAML).unwrap();
        fs::create_dir(dir.path().join("charts")).unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("charts").join("loop")).unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("charts").join("linked"))
            .unwrap();

        let change = VersionChange::new(Kind::Helm, "subchart2", "0.2.1");
        let (changed, ctx) = apply(&dir, &change).await;

        assert!(changed);
        assert_eq!(ctx.substitutions().len(), 1);
        assert_eq!(ctx.substitutions()[0].file, PathBuf::from(REQUIREMENTS));
        let untouched = fs::read_to_string(outside.path().join(REQUIREMENTS)).unwrap();
        assert_eq!(untouched, REQUIREMENTS_YAML);
    }

    #[tokio::test]
    async fn test_depth_limit() {
        let dir = TempDir::new().unwrap();
        chart(dir.path(), "dependencies: []\n");
        let mut deepest_visited = dir.path().to_path_buf();
        for _ in 0..MAX_DEPTH {
            deepest_visited.push("d");
        }
        let too_deep = deepest_visited.join("d");
        fs::create_dir_all(&too_deep).unwrap();
        fs::write(deepest_visited.join(REQUIREMENTS), REQUIREMENTS_YAML).unwrap();
        fs::write(too_deep.join(REQUIREMENTS), REQUIREMENTS_YAML).unwrap();

        let change = VersionChange::new(Kind::Helm, "subchart2", "0.2.1");
        let (changed, ctx) = apply(&dir, &change).await;

        assert!(changed);
        assert_eq!(ctx.substitutions().len(), 1);
        let visited = fs::read_to_string(deepest_visited.join(REQUIREMENTS)).unwrap();
        assert!(visited.contains("version: 0.2.1"));
        let untouched = fs::read_to_string(too_deep.join(REQUIREMENTS)).unwrap();
        assert_eq!(untouched, REQUIREMENTS_YAML);
    }

    #[tokio::test]
    async fn test_flow_style_is_unsupported() {
        let dir = TempDir::new().unwrap();
        chart(
            dir.path(),
            "dependencies: [{name: subchart2, version: 0.2.0}]\n",
        );
        let change = VersionChange::new(Kind::Helm, "subchart2", "0.2.1");
        let mut ctx = PropagationContext::new(dir.path(), vec![change.clone()]);
        let err = HelmUpdater
            .apply_version_changes(&mut ctx, &[change])
            .await
            .unwrap_err();
        assert!(matches!(err, ManifestError::UnsupportedLayout { .. }));
    }

    #[tokio::test]
    async fn test_invalid_yaml_is_fatal() {
        let dir = TempDir::new().unwrap();
        chart(dir.path(), "dependencies:\n  - name: [unclosed\n");
        let change = VersionChange::new(Kind::Helm, "subchart2", "0.2.1");
        let mut ctx = PropagationContext::new(dir.path(), vec![change.clone()]);
        let err = HelmUpdater
            .apply_version_changes(&mut ctx, &[change])
            .await
            .unwrap_err();
        assert!(matches!(err, ManifestError::YamlParseError { .. }));
    }

    #[test]
    fn test_extract_source_versions() {
        let dir = TempDir::new().unwrap();
        chart(dir.path(), REQUIREMENTS_YAML);
        let ctx = PropagationContext::new(dir.path(), vec![]);
        assert_eq!(
            HelmUpdater.extract_source_versions(&ctx).unwrap(),
            vec![VersionChange::new(Kind::Helm, "umbrella", "1.2.3")]
        );
    }

    #[test]
    fn test_scan_entries() {
        let entries = scan_entries(REQUIREMENTS_YAML);
        assert_eq!(entries.len(), 2);
        let version = entries[1].version.as_ref().unwrap();
        assert_eq!(version.value, "0.2.0");
        assert_eq!(&REQUIREMENTS_YAML[version.range.clone()], "0.2.0");
        let quoted = entries[0].version.as_ref().unwrap();
        assert_eq!(&REQUIREMENTS_YAML[quoted.range.clone()], "0.1.0");
    }

    #[test]
    fn test_scan_entries_at_column_zero() {
        let content = "dependencies:\n- name: redis\n  version: 10.5.7\n";
        let entries = scan_entries(content);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name.as_ref().unwrap().value, "redis");
        assert_eq!(entries[0].version.as_ref().unwrap().value, "10.5.7");
    }
}
