//! pom.xml updater for Maven modules
//!
//! Handles:
//! - `<dependency>`, `<plugin>`, `<extension>` and `<parent>` coordinates
//! - `${property}` versions, redirected to the `<properties>` entry
//! - Changes carrying an explicit property name
//!
//! Every `pom.xml` below the working copy is scanned with `quick-xml`. The
//! reader only reports byte positions; values are sliced from the source so
//! the rewritten file differs from the original in the version text alone.

use super::{splice, Edit, ManifestUpdater};
use crate::domain::{ArtifactKey, Kind, VersionChange};
use crate::error::ManifestError;
use crate::update::PropagationContext;
use async_trait::async_trait;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

const MANIFEST: &str = "pom.xml";

/// Elements carrying a full coordinate block
const BLOCKS: [&str; 4] = ["dependency", "plugin", "extension", "parent"];

/// Group assumed for `<plugin>` blocks without `<groupId>`
const DEFAULT_PLUGIN_GROUP: &str = "org.apache.maven.plugins";

/// Directories never scanned for modules
const IGNORED_DIRS: [&str; 2] = ["target", "node_modules"];

/// Updater for Maven projects
pub struct MavenUpdater;

#[async_trait]
impl ManifestUpdater for MavenUpdater {
    fn kind(&self) -> Kind {
        Kind::Maven
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

        let mut changes = Vec::new();
        for path in discover(ctx.root())? {
            let content = ctx.read_manifest(&path)?;
            let pom = Pom::parse(&path, &content)?;
            if let Some(change) = pom.module_version() {
                changes.push(change);
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

        let mut poms = Vec::new();
        for path in discover(ctx.root())? {
            let content = ctx.read_manifest(&path)?;
            let pom = Pom::parse(&path, &content)?;
            poms.push((path, content, pom));
        }
        debug!(count = poms.len(), "scanned maven modules");

        let mut edits: Vec<Vec<Edit>> = vec![Vec::new(); poms.len()];
        for change in changes {
            let mut seen = BTreeSet::new();
            for (index, field) in targets(&poms, change) {
                if !seen.insert((index, field.range.start)) {
                    continue;
                }
                let (path, _, _) = &poms[index];
                ctx.record_substitution(change, path, field.value.as_str(), change.version.as_str());
                if field.value != change.version {
                    edits[index].push(Edit::new(field.range.clone(), escape(&change.version)));
                }
            }
        }

        let mut changed = false;
        for ((path, content, _), edits) in poms.iter().zip(edits) {
            if edits.is_empty() {
                continue;
            }
            let updated = splice(content, &edits);
            if &updated != content {
                ctx.write_manifest(path, &updated)?;
                changed = true;
            }
        }
        Ok(changed)
    }
}

/// Lists every pom.xml under `root`, sorted by path
fn discover(root: &Path) -> Result<Vec<PathBuf>, ManifestError> {
    let walker = WalkDir::new(root).follow_links(false).sort_by_file_name();

    let mut poms = Vec::new();
    for entry in walker
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_ignored(e))
    {
        let entry = entry.map_err(|e| ManifestError::WalkError {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf()),
            message: e.to_string(),
        })?;
        if entry.file_type().is_file() && entry.file_name() == OsStr::new(MANIFEST) {
            poms.push(entry.into_path());
        }
    }
    Ok(poms)
}

fn is_ignored(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_str().unwrap_or("");
    name.starts_with('.') || IGNORED_DIRS.contains(&name)
}

/// Version fields a change resolves to, as (pom index, field)
fn targets<'a>(
    poms: &'a [(PathBuf, String, Pom)],
    change: &VersionChange,
) -> Vec<(usize, &'a Field)> {
    if let Some(property) = &change.property {
        return poms
            .iter()
            .enumerate()
            .filter_map(|(i, (_, _, pom))| pom.property(property).map(|f| (i, f)))
            .collect();
    }

    let key = change.key();
    let mut found = Vec::new();
    for (index, (_, _, pom)) in poms.iter().enumerate() {
        for block in pom.blocks.iter().filter(|b| b.matches(&key)) {
            let Some(version) = &block.version else {
                continue;
            };
            match property_reference(&version.value) {
                Some(name) => found.extend(resolve_property(poms, index, name)),
                None => found.push((index, version)),
            }
        }
    }
    found
}

/// Finds a property definition, preferring the referencing pom
fn resolve_property<'a>(
    poms: &'a [(PathBuf, String, Pom)],
    index: usize,
    name: &str,
) -> Option<(usize, &'a Field)> {
    if let Some(field) = poms[index].2.property(name) {
        return Some((index, field));
    }
    poms.iter()
        .enumerate()
        .find_map(|(i, (_, _, pom))| pom.property(name).map(|f| (i, f)))
}

/// Returns `name` for a `${name}` value
fn property_reference(value: &str) -> Option<&str> {
    value
        .strip_prefix("${")
        .and_then(|v| v.strip_suffix('}'))
        .filter(|name| !name.is_empty())
}

/// Text content of a leaf element and its trimmed byte range
#[derive(Debug, Clone)]
struct Field {
    value: String,
    range: Range<usize>,
}

impl Field {
    fn slice(content: &str, range: Range<usize>) -> Self {
        let raw = &content[range.clone()];
        let lead = raw.len() - raw.trim_start().len();
        let value = raw.trim();
        let start = range.start + lead;
        Self {
            value: value.to_string(),
            range: start..start + value.len(),
        }
    }
}

/// groupId/artifactId/version of one element
#[derive(Debug, Clone, Default)]
struct Coordinates {
    tag: String,
    group_id: Option<Field>,
    artifact_id: Option<Field>,
    version: Option<Field>,
}

impl Coordinates {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    fn set(&mut self, name: &str, field: Field) {
        match name {
            "groupId" => self.group_id = Some(field),
            "artifactId" => self.artifact_id = Some(field),
            "version" => self.version = Some(field),
            _ => {}
        }
    }

    fn group(&self) -> Option<&str> {
        match &self.group_id {
            Some(field) => Some(field.value.as_str()),
            None if self.tag == "plugin" => Some(DEFAULT_PLUGIN_GROUP),
            None => None,
        }
    }

    fn matches(&self, key: &ArtifactKey) -> bool {
        let artifact_matches = self
            .artifact_id
            .as_ref()
            .map(|a| a.value == key.name)
            .unwrap_or(false);
        artifact_matches
            && key
                .group
                .as_deref()
                .map_or(true, |group| self.group() == Some(group))
    }
}

/// The parts of a pom.xml the updater reads
#[derive(Debug, Default)]
struct Pom {
    project: Coordinates,
    parent: Option<Coordinates>,
    blocks: Vec<Coordinates>,
    properties: Vec<(String, Field)>,
}

impl Pom {
    fn parse(path: &Path, content: &str) -> Result<Self, ManifestError> {
        let mut pom = Pom {
            project: Coordinates::new("project"),
            ..Default::default()
        };
        let mut reader = Reader::from_str(content);
        let mut open: Vec<(String, usize)> = Vec::new();
        let mut blocks: Vec<(usize, Coordinates)> = Vec::new();

        loop {
            let before = reader.buffer_position() as usize;
            match reader.read_event() {
                Err(e) => return Err(ManifestError::xml_parse_error(path, e.to_string())),
                Ok(Event::Eof) => break,
                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    if BLOCKS.contains(&name.as_str()) {
                        blocks.push((open.len(), Coordinates::new(&name)));
                    }
                    open.push((name, reader.buffer_position() as usize));
                }
                Ok(Event::End(_)) => {
                    let Some((name, start)) = open.pop() else {
                        break;
                    };
                    let depth = open.len();

                    if blocks.last().map(|(d, _)| *d) == Some(depth) {
                        if let Some((_, block)) = blocks.pop() {
                            if block.tag == "parent" && depth == 1 {
                                pom.parent = Some(block.clone());
                            }
                            pom.blocks.push(block);
                        }
                        continue;
                    }

                    let field = Field::slice(content, start..before);
                    if open.last().map(|(n, _)| n.as_str()) == Some("properties") {
                        pom.properties.push((name, field));
                    } else if let Some((block_depth, block)) = blocks.last_mut() {
                        if *block_depth + 1 == depth {
                            block.set(&name, field);
                        }
                    } else if depth == 1 && open[0].0 == "project" {
                        pom.project.set(&name, field);
                    }
                }
                Ok(_) => {}
            }
        }
        Ok(pom)
    }

    fn property(&self, name: &str) -> Option<&Field> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, field)| field)
    }

    /// The module's own coordinates as a change, when its version is literal
    fn module_version(&self) -> Option<VersionChange> {
        let group = self
            .project
            .group_id
            .as_ref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.group_id.as_ref()))?;
        let artifact = self.project.artifact_id.as_ref()?;
        let version = self.project.version.as_ref()?;
        if version.value.contains("${") {
            return None;
        }
        Some(VersionChange::new(
            Kind::Maven,
            format!("{}:{}", group.value, artifact.value),
            version.value.clone(),
        ))
    }
}
