//! Per-repository classification of candidate changes

use super::{Kind, VersionChange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A change that looked relevant but matched no manifest field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedMatch {
    /// The change that could not be applied
    pub change: VersionChange,
    /// Why nothing matched
    pub reason: String,
}

impl FailedMatch {
    /// Creates a failed-match diagnostic
    pub fn new(change: VersionChange, reason: impl Into<String>) -> Self {
        Self {
            change,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FailedMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.change.dependency_id(), self.reason)
    }
}

/// Valid, invalid and failed-match changes for one or more repositories
///
/// Every change considered by a kind lands in exactly one of the three
/// collections. `warnings` carries partial-success diagnostics and is not part
/// of that accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Changes matched in a manifest (applied or already current)
    pub valid: Vec<VersionChange>,
    /// Changes rejected by the repository's dependency filter
    pub invalid: Vec<VersionChange>,
    /// Unmatched changes keyed by kind-qualified dependency identifier
    pub failed: BTreeMap<String, FailedMatch>,
    /// Partial-success diagnostics keyed by kind-qualified dependency identifier
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub warnings: BTreeMap<String, String>,
}

impl CheckResult {
    /// Creates an empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a matched change
    pub fn add_valid(&mut self, change: VersionChange) {
        self.valid.push(change);
    }

    /// Records a filtered-out change
    pub fn add_invalid(&mut self, change: VersionChange) {
        self.invalid.push(change);
    }

    /// Records an unmatched change
    pub fn add_failed(&mut self, change: VersionChange, reason: impl Into<String>) {
        self.failed
            .insert(change.qualified_id(), FailedMatch::new(change, reason));
    }

    /// Records a partial-success warning
    pub fn add_warning(&mut self, change: &VersionChange, message: impl Into<String>) {
        self.warnings.insert(change.qualified_id(), message.into());
    }

    /// Merges another result into this one
    ///
    /// Lists are concatenated in order; failed and warning maps are unioned
    /// with the later entry winning on key collision.
    pub fn merge(&mut self, other: CheckResult) {
        self.valid.extend(other.valid);
        self.invalid.extend(other.invalid);
        self.failed.extend(other.failed);
        self.warnings.extend(other.warnings);
    }

    /// Returns the number of valid changes
    pub fn valid_count(&self) -> usize {
        self.valid.len()
    }

    /// Returns the number of invalid changes
    pub fn invalid_count(&self) -> usize {
        self.invalid.len()
    }

    /// Returns the number of failed matches
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Returns the number of changes accounted for
    pub fn total(&self) -> usize {
        self.valid_count() + self.invalid_count() + self.failed_count()
    }

    /// Returns true if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.total() == 0 && self.warnings.is_empty()
    }
}

/// Terminal state of one kind during one propagation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindState {
    /// Structural precondition absent; the kind did not run
    NotApplicable,
    /// At least one manifest was rewritten
    Changed,
    /// The kind ran but left every manifest as it was
    Unchanged,
}

impl fmt::Display for KindState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KindState::NotApplicable => write!(f, "not applicable"),
            KindState::Changed => write!(f, "changed"),
            KindState::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Outcome and accounting for one kind in one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindOutcome {
    /// The kind
    pub kind: Kind,
    /// Terminal state
    pub state: KindState,
    /// Candidate changes of this kind considered
    pub considered: usize,
    /// Matched changes
    pub valid: usize,
    /// Filtered changes
    pub invalid: usize,
    /// Unmatched changes
    pub failed: usize,
}

impl KindOutcome {
    /// Creates the outcome for a kind that did not run
    pub fn not_applicable(kind: Kind) -> Self {
        Self {
            kind,
            state: KindState::NotApplicable,
            considered: 0,
            valid: 0,
            invalid: 0,
            failed: 0,
        }
    }

    /// Returns true if every considered change was classified exactly once
    pub fn is_balanced(&self) -> bool {
        self.valid + self.invalid + self.failed == self.considered
    }
}
