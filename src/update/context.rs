//! Per-repository propagation context
//!
//! A context binds one working copy to the in-flight change list of one
//! propagation pass. It resolves paths inside the working copy, performs
//! manifest reads and writes, and records which change touched which field.

use crate::domain::{Substitution, VersionChange};
use crate::error::ManifestError;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Final outcome of a single change after all kinds ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeOutcome {
    /// The change
    pub change: VersionChange,
    /// Files where the change matched a field
    pub files: Vec<PathBuf>,
    /// Whether any matched field held a different value
    pub applied: bool,
}

/// Mutable state of one propagation pass over one working copy
#[derive(Debug)]
pub struct PropagationContext {
    root: PathBuf,
    dry_run: bool,
    changes: Vec<VersionChange>,
    substitutions: Vec<Substitution>,
    claimed: BTreeSet<PathBuf>,
    warnings: Vec<(VersionChange, String)>,
}

impl PropagationContext {
    /// Creates a context for the working copy at `root`
    pub fn new(root: impl Into<PathBuf>, changes: Vec<VersionChange>) -> Self {
        Self {
            root: root.into(),
            dry_run: false,
            changes,
            substitutions: Vec::new(),
            claimed: BTreeSet::new(),
            warnings: Vec::new(),
        }
    }

    /// Leaves every manifest untouched on disk (builder pattern)
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Returns the working copy root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns true if writes are suppressed
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Returns the candidate changes of this pass
    pub fn changes(&self) -> &[VersionChange] {
        &self.changes
    }

    /// Resolves a relative path inside the working copy
    ///
    /// Absolute paths and `..` components are rejected.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> Result<PathBuf, ManifestError> {
        let relative = relative.as_ref();
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(ManifestError::OutsideWorkingCopy {
                path: relative.to_path_buf(),
            });
        }
        Ok(self.root.join(relative))
    }

    /// Returns true if the relative path exists inside the working copy
    pub fn exists(&self, relative: impl AsRef<Path>) -> bool {
        self.resolve(relative).map(|p| p.exists()).unwrap_or(false)
    }

    /// Returns true if the relative path is a directory inside the working copy
    pub fn is_dir(&self, relative: impl AsRef<Path>) -> bool {
        self.resolve(relative).map(|p| p.is_dir()).unwrap_or(false)
    }

    /// Returns `path` relative to the working copy root when possible
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }

    /// Reads a manifest file
    pub fn read_manifest(&self, path: &Path) -> Result<String, ManifestError> {
        fs::read_to_string(path).map_err(|e| ManifestError::read_error(path, e))
    }

    /// Writes a manifest file unless running dry
    pub fn write_manifest(&self, path: &Path, content: &str) -> Result<(), ManifestError> {
        if self.dry_run {
            debug!(path = %path.display(), "dry-run: skipping write");
            return Ok(());
        }
        fs::write(path, content).map_err(|e| ManifestError::write_error(path, e))?;
        info!(path = %path.display(), "updated manifest");
        Ok(())
    }

    /// Records that `change` matched a field in `file` holding `old`
    pub fn record_substitution(
        &mut self,
        change: &VersionChange,
        file: &Path,
        old: impl Into<String>,
        new: impl Into<String>,
    ) {
        let file = self.relative(file).to_path_buf();
        let substitution = Substitution {
            change: change.clone(),
            file,
            old: old.into(),
            new: new.into(),
        };
        debug!(
            change = %substitution.change,
            file = %substitution.file.display(),
            old = %substitution.old,
            new = %substitution.new,
            "matched version field"
        );
        self.substitutions.push(substitution);
    }

    /// Returns true if `change` matched at least one field
    pub fn is_matched(&self, change: &VersionChange) -> bool {
        self.substitutions.iter().any(|s| &s.change == change)
    }

    /// Returns every recorded substitution
    pub fn substitutions(&self) -> &[Substitution] {
        &self.substitutions
    }

    /// Marks a manifest as owned by a kind for the rest of the pass
    pub fn claim(&mut self, path: impl Into<PathBuf>) {
        self.claimed.insert(path.into());
    }

    /// Returns true if an earlier kind claimed the manifest
    pub fn is_claimed(&self, path: &Path) -> bool {
        self.claimed.contains(path)
    }

    /// Records a partial-success diagnostic for a change
    pub fn warn(&mut self, change: &VersionChange, message: impl Into<String>) {
        self.warnings.push((change.clone(), message.into()));
    }

    /// Returns recorded warnings
    pub fn warnings(&self) -> &[(VersionChange, String)] {
        &self.warnings
    }

    /// Returns the outcome of every candidate change
    pub fn outcomes(&self) -> Vec<ChangeOutcome> {
        self.changes
            .iter()
            .map(|change| {
                let mut files: Vec<PathBuf> = Vec::new();
                let mut applied = false;
                for s in self.substitutions.iter().filter(|s| &s.change == change) {
                    applied |= !s.is_noop();
                    if !files.contains(&s.file) {
                        files.push(s.file.clone());
                    }
                }
                ChangeOutcome {
                    change: change.clone(),
                    files,
                    applied,
                }
            })
            .collect()
    }
}
