//! Aggregated check report across repositories
//!
//! Provides structures for tracking propagation results at repository and
//! overall levels.

use super::{CheckResult, KindOutcome, VersionChange};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One field substitution performed (or confirmed) in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    /// The change that caused the substitution
    pub change: VersionChange,
    /// Manifest path relative to the working copy root
    pub file: PathBuf,
    /// Value before the substitution
    pub old: String,
    /// Value after the substitution
    pub new: String,
}

impl Substitution {
    /// Returns true if the field already held the new value
    pub fn is_noop(&self) -> bool {
        self.old == self.new
    }
}

/// Propagation result for a single target repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryReport {
    /// Working copy root
    pub path: PathBuf,
    /// Whether any manifest was modified
    pub modified: bool,
    /// Per-kind outcomes in dispatch order
    pub kinds: Vec<KindOutcome>,
    /// Substitutions recorded during the pass
    pub substitutions: Vec<Substitution>,
    /// Classification of candidate changes
    pub check: CheckResult,
}

impl RepositoryReport {
    /// Creates an empty report for a repository
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            modified: false,
            kinds: Vec::new(),
            substitutions: Vec::new(),
            check: CheckResult::new(),
        }
    }

    /// Returns the substitutions that actually changed a value
    pub fn applied(&self) -> impl Iterator<Item = &Substitution> {
        self.substitutions.iter().filter(|s| !s.is_noop())
    }
}

/// A repository whose pass was aborted by a manifest or I/O failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryError {
    /// Working copy root
    pub path: PathBuf,
    /// Error message including the offending file
    pub message: String,
}

/// Count totals over a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTotals {
    /// Repositories processed successfully
    pub repositories: usize,
    /// Repositories with at least one modified manifest
    pub modified: usize,
    /// Matched changes
    pub valid: usize,
    /// Filtered changes
    pub invalid: usize,
    /// Unmatched changes
    pub failed: usize,
    /// Partial-success warnings
    pub warnings: usize,
    /// Aborted repositories
    pub errors: usize,
}

/// Overall report of one propagation run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckReport {
    /// Whether manifests were left untouched on disk
    pub dry_run: bool,
    /// Per-repository results in input order
    pub repositories: Vec<RepositoryReport>,
    /// Aborted repositories
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<RepositoryError>,
}

impl CheckReport {
    /// Creates a new empty report
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            repositories: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Adds a repository result
    pub fn add_repository(&mut self, report: RepositoryReport) {
        self.repositories.push(report);
    }

    /// Adds an aborted repository
    pub fn add_error(&mut self, path: impl Into<PathBuf>, message: impl Into<String>) {
        self.errors.push(RepositoryError {
            path: path.into(),
            message: message.into(),
        });
    }

    /// Appends another partial report, preserving insertion order
    pub fn merge(&mut self, other: CheckReport) {
        self.dry_run |= other.dry_run;
        self.repositories.extend(other.repositories);
        self.errors.extend(other.errors);
    }

    /// Merges every repository check into one result for the pull-request layer
    pub fn combined(&self) -> CheckResult {
        let mut combined = CheckResult::new();
        for repo in &self.repositories {
            combined.merge(repo.check.clone());
        }
        combined
    }

    /// Returns per-repository counts summed over the report
    pub fn totals(&self) -> ReportTotals {
        let mut totals = ReportTotals {
            errors: self.errors.len(),
            ..ReportTotals::default()
        };
        for repo in &self.repositories {
            totals.repositories += 1;
            if repo.modified {
                totals.modified += 1;
            }
            totals.valid += repo.check.valid_count();
            totals.invalid += repo.check.invalid_count();
            totals.failed += repo.check.failed_count();
            totals.warnings += repo.check.warnings.len();
        }
        totals
    }

    /// Returns true if any repository was modified
    pub fn has_changes(&self) -> bool {
        self.repositories.iter().any(|r| r.modified)
    }

    /// Returns true if any repository pass was aborted
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
