//! Core domain models for depush
//!
//! This module contains the fundamental types used throughout the engine:
//! - Dependency manager kinds
//! - Artifact identities and version changes
//! - Per-repository check results
//! - The aggregated report handed to output and pull-request layers

mod artifact;
mod change;
mod check;
mod kind;
mod report;

pub use artifact::ArtifactKey;
pub use change::{ChangeSet, VersionChange};
pub use check::{CheckResult, FailedMatch, KindOutcome, KindState};
pub use kind::Kind;
pub use report::{CheckReport, ReportTotals, RepositoryError, RepositoryReport, Substitution};
