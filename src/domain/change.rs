//! Requested or discovered version changes

use super::{ArtifactKey, Kind};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A request to move one artifact to a new version
///
/// Values are never mutated once created; a revised version produces a new
/// `VersionChange` that supersedes the old one in a [`ChangeSet`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionChange {
    /// Dependency manager kind this change targets
    pub kind: Kind,
    /// Dependency identifier in the kind's textual form
    pub artifact: String,
    /// Version to propagate
    pub version: String,
    /// Named sub-field carrying the version (e.g. a Maven property)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
}

impl VersionChange {
    /// Creates a new change
    pub fn new(kind: Kind, artifact: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            kind,
            artifact: artifact.into(),
            version: version.into(),
            property: None,
        }
    }

    /// Sets the named sub-field (builder pattern)
    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// Returns the parsed artifact identity
    pub fn key(&self) -> ArtifactKey {
        ArtifactKey::parse(self.kind, &self.artifact)
    }

    /// Returns the dependency identifier, including the property when present
    pub fn dependency_id(&self) -> String {
        match &self.property {
            Some(property) => format!("{}#{}", self.artifact, property),
            None => self.artifact.clone(),
        }
    }

    /// Returns the dependency identifier qualified with the kind
    pub fn qualified_id(&self) -> String {
        format!("{}/{}", self.kind, self.dependency_id())
    }

    /// Returns true if both changes address the same field of the same artifact
    pub fn same_target(&self, other: &VersionChange) -> bool {
        self.kind == other.kind && self.artifact == other.artifact && self.property == other.property
    }
}

impl fmt::Display for VersionChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} → {}", self.kind, self.dependency_id(), self.version)
    }
}

/// Parses `KIND:ARTIFACT[#PROPERTY]=VERSION`
impl FromStr for VersionChange {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |message: &str| ConfigError::invalid_change(s, message);

        let (target, version) = s.rsplit_once('=').ok_or_else(|| invalid("missing '='"))?;
        let (kind, artifact) = target
            .split_once(':')
            .ok_or_else(|| invalid("missing kind"))?;
        let kind: Kind = kind.trim().parse().map_err(|e: String| invalid(&e))?;

        let (artifact, property) = match artifact.rsplit_once('#') {
            Some((artifact, property)) => (artifact, Some(property.trim())),
            None => (artifact, None),
        };
        let artifact = artifact.trim();
        let version = version.trim();
        if artifact.is_empty() {
            return Err(invalid("empty artifact"));
        }
        if version.is_empty() {
            return Err(invalid("empty version"));
        }

        let change = VersionChange::new(kind, artifact, version);
        Ok(match property {
            Some("") => return Err(invalid("empty property")),
            Some(property) => change.with_property(property),
            None => change,
        })
    }
}

/// Ordered collection of changes with at most one entry per target
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<VersionChange>,
}

impl ChangeSet {
    /// Creates an empty change set
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a change; a change for the same target replaces the earlier one in place
    pub fn push(&mut self, change: VersionChange) {
        match self.changes.iter_mut().find(|c| c.same_target(&change)) {
            Some(existing) => *existing = change,
            None => self.changes.push(change),
        }
    }

    /// Adds every change in order
    pub fn extend(&mut self, changes: impl IntoIterator<Item = VersionChange>) {
        for change in changes {
            self.push(change);
        }
    }

    /// Returns the number of changes
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns true if there are no changes
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Returns the changes in insertion order
    pub fn as_slice(&self) -> &[VersionChange] {
        &self.changes
    }

    /// Consumes the set and returns the changes
    pub fn into_vec(self) -> Vec<VersionChange> {
        self.changes
    }
}

impl FromIterator<VersionChange> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = VersionChange>>(iter: I) -> Self {
        let mut set = ChangeSet::new();
        set.extend(iter);
        set
    }
}
