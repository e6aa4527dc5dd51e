//! JSON output formatter for machine processing
//!
//! This module provides:
//! - JSON serialization of per-repository propagation results
//! - The combined valid/invalid/failed classification consumed by the
//!   pull-request layer

use crate::domain::{CheckResult, KindState, RepositoryReport, ReportTotals, VersionChange};
use crate::orchestrator::OrchestratorResult;
use crate::output::{OutputFormatter, Verbosity};
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    /// Verbosity level affects detail in output
    verbosity: Verbosity,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

/// JSON representation of the full result
#[derive(Serialize)]
struct JsonOutput<'a> {
    /// Whether this was a dry-run
    dry_run: bool,
    /// Changes offered to every repository
    changes: &'a [VersionChange],
    /// Summary statistics
    summary: ReportTotals,
    /// Classification merged across repositories
    combined: CheckResult,
    /// Per-repository results (omitted in quiet mode)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    repositories: Vec<JsonRepository>,
    /// Aborted repositories
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<JsonError>,
}

/// JSON representation of one repository
#[derive(Serialize)]
struct JsonRepository {
    /// Working copy root
    path: String,
    /// Whether any manifest was modified
    modified: bool,
    /// Rewritten fields (every matched field in verbose mode)
    substitutions: Vec<JsonSubstitution>,
    /// Kinds that ran, or every kind in verbose mode
    kinds: Vec<JsonKind>,
    /// Classification of candidate changes
    check: CheckResult,
}

/// JSON representation of a field substitution
#[derive(Serialize)]
struct JsonSubstitution {
    /// Kind-qualified dependency identifier
    id: String,
    /// Manifest path relative to the repository
    file: String,
    /// Old value
    from: String,
    /// New value
    to: String,
}

/// JSON representation of a kind outcome
#[derive(Serialize)]
struct JsonKind {
    /// Kind name
    kind: String,
    /// Terminal state
    state: KindState,
    valid: usize,
    invalid: usize,
    failed: usize,
}

/// JSON representation of an aborted repository
#[derive(Serialize)]
struct JsonError {
    path: String,
    message: String,
}

impl JsonFormatter {
    /// Convert a repository report to its JSON representation
    fn repository_to_json(&self, repository: &RepositoryReport) -> JsonRepository {
        let verbose = self.verbosity == Verbosity::Verbose;

        let substitutions = repository
            .substitutions
            .iter()
            .filter(|s| verbose || !s.is_noop())
            .map(|s| JsonSubstitution {
                id: s.change.qualified_id(),
                file: s.file.display().to_string(),
                from: s.old.clone(),
                to: s.new.clone(),
            })
            .collect();

        let kinds = repository
            .kinds
            .iter()
            .filter(|k| verbose || k.state != KindState::NotApplicable)
            .map(|k| JsonKind {
                kind: k.kind.name().to_string(),
                state: k.state,
                valid: k.valid,
                invalid: k.invalid,
                failed: k.failed,
            })
            .collect();

        JsonRepository {
            path: repository.path.display().to_string(),
            modified: repository.modified,
            substitutions,
            kinds,
            check: repository.check.clone(),
        }
    }

    fn write_json<T: Serialize>(value: &T, writer: &mut dyn Write) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
        writeln!(writer, "{}", json)
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, result: &OrchestratorResult, writer: &mut dyn Write) -> std::io::Result<()> {
        let report = &result.report;
        let repositories = if self.verbosity == Verbosity::Quiet {
            Vec::new()
        } else {
            report
                .repositories
                .iter()
                .map(|r| self.repository_to_json(r))
                .collect()
        };

        let output = JsonOutput {
            dry_run: report.dry_run,
            changes: &result.changes,
            summary: report.totals(),
            combined: report.combined(),
            repositories,
            errors: report
                .errors
                .iter()
                .map(|e| JsonError {
                    path: e.path.display().to_string(),
                    message: e.message.clone(),
                })
                .collect(),
        };

        Self::write_json(&output, writer)
    }

    fn format_repository(
        &self,
        repository: &RepositoryReport,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        Self::write_json(&self.repository_to_json(repository), writer)
    }
}
