//! Text output formatter for human-readable display
//!
//! This module provides:
//! - Per-repository listing of rewritten manifest fields
//! - Semantic version change type indication (major/minor/patch)
//! - Failed matches, partial-success warnings and aborted repositories
//! - A totals summary

use crate::domain::{CheckReport, KindState, RepositoryReport, Substitution};
use crate::orchestrator::OrchestratorResult;
use crate::output::{OutputFormatter, Verbosity};
use colored::Colorize;
use std::io::Write;

/// Semantic version change type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionChangeType {
    /// Major version change (breaking)
    Major,
    /// Minor version change (features)
    Minor,
    /// Patch version change (fixes)
    Patch,
    /// Unknown or unparseable
    Unknown,
}

impl VersionChangeType {
    /// Determine the change type between two versions
    ///
    /// Range prefixes (`^`, `~`) and a leading `v` are ignored.
    pub fn from_versions(old: &str, new: &str) -> Self {
        let parse = |v: &str| -> Option<(u64, u64)> {
            let v = v.trim_start_matches(['^', '~', 'v']);
            let mut parts = v.split(['.', '-']);
            let major = parts.next()?.parse().ok()?;
            let minor = match parts.next() {
                Some(minor) => minor.parse().ok()?,
                None => 0,
            };
            Some((major, minor))
        };

        match (parse(old), parse(new)) {
            (Some((old_major, old_minor)), Some((new_major, new_minor))) => {
                if new_major != old_major {
                    VersionChangeType::Major
                } else if new_minor != old_minor {
                    VersionChangeType::Minor
                } else {
                    VersionChangeType::Patch
                }
            }
            _ => VersionChangeType::Unknown,
        }
    }

    /// Get the display label with color
    pub fn colored_label(&self) -> String {
        match self {
            VersionChangeType::Major => "major".red().bold().to_string(),
            VersionChangeType::Minor => "minor".yellow().to_string(),
            VersionChangeType::Patch => "patch".green().to_string(),
            VersionChangeType::Unknown => "?".dimmed().to_string(),
        }
    }

    /// Get the plain label
    pub fn label(&self) -> &'static str {
        match self {
            VersionChangeType::Major => "major",
            VersionChangeType::Minor => "minor",
            VersionChangeType::Patch => "patch",
            VersionChangeType::Unknown => "?",
        }
    }
}

/// Text formatter for human-readable output
pub struct TextFormatter {
    /// Verbosity level
    verbosity: Verbosity,
    /// Whether this is a dry-run
    dry_run: bool,
    /// Whether to use colors
    color: bool,
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new(verbosity: Verbosity, dry_run: bool) -> Self {
        Self {
            verbosity,
            dry_run,
            color: true,
        }
    }

    /// Create a new text formatter with color option
    pub fn with_color(verbosity: Verbosity, dry_run: bool, color: bool) -> Self {
        Self {
            verbosity,
            dry_run,
            color,
        }
    }

    /// Get the dry-run prefix if applicable
    fn dry_run_prefix(&self) -> String {
        if self.dry_run {
            if self.color {
                format!("{} ", "(dry-run)".cyan())
            } else {
                "(dry-run) ".to_string()
            }
        } else {
            String::new()
        }
    }

    /// Returns true if a repository has anything worth printing at this verbosity
    fn is_reportable(&self, repository: &RepositoryReport) -> bool {
        self.verbosity == Verbosity::Verbose
            || repository.modified
            || repository.check.failed_count() > 0
            || !repository.check.warnings.is_empty()
    }

    fn format_substitution(
        &self,
        substitution: &Substitution,
        width: usize,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let id = substitution.change.dependency_id();
        let file = substitution.file.display().to_string();

        if substitution.is_noop() {
            return if self.color {
                writeln!(
                    writer,
                    "  {} {}",
                    format!("{:width$}", id, width = width).dimmed(),
                    format!("{} (current, {})", substitution.new, file).dimmed()
                )
            } else {
                writeln!(
                    writer,
                    "  {:width$} {} (current, {})",
                    id,
                    substitution.new,
                    file,
                    width = width
                )
            };
        }

        let change_type = VersionChangeType::from_versions(&substitution.old, &substitution.new);
        if self.color {
            writeln!(
                writer,
                "  {:width$} {} {} {} [{}] {}",
                id,
                substitution.old.dimmed(),
                "→".dimmed(),
                substitution.new.bright_white().bold(),
                change_type.colored_label(),
                file.dimmed(),
                width = width
            )
        } else {
            writeln!(
                writer,
                "  {:width$} {} -> {} [{}] {}",
                id,
                substitution.old,
                substitution.new,
                change_type.label(),
                file,
                width = width
            )
        }
    }

    fn format_errors(&self, report: &CheckReport, writer: &mut dyn Write) -> std::io::Result<()> {
        if report.errors.is_empty() {
            return Ok(());
        }
        if self.color {
            writeln!(writer, "{}:", "Errors".red().bold())?;
        } else {
            writeln!(writer, "Errors:")?;
        }
        for error in &report.errors {
            if self.color {
                writeln!(
                    writer,
                    "  {} {}: {}",
                    "✗".red(),
                    error.path.display(),
                    error.message
                )?;
            } else {
                writeln!(writer, "  - {}: {}", error.path.display(), error.message)?;
            }
        }
        writeln!(writer)
    }

    /// Write the totals summary
    pub fn format_summary(
        &self,
        report: &CheckReport,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let prefix = self.dry_run_prefix();
        let totals = report.totals();

        if self.verbosity == Verbosity::Quiet {
            if totals.modified > 0 {
                if self.color {
                    writeln!(
                        writer,
                        "{}{} modified",
                        prefix,
                        totals.modified.to_string().green()
                    )?;
                } else {
                    writeln!(writer, "{}{} modified", prefix, totals.modified)?;
                }
            } else if self.color {
                writeln!(writer, "{}{}", prefix, "No changes".dimmed())?;
            } else {
                writeln!(writer, "{}No changes", prefix)?;
            }
            return Ok(());
        }

        if self.color {
            writeln!(writer, "{}{}:", prefix, "Summary".bold())?;
            if totals.modified > 0 {
                writeln!(
                    writer,
                    "  {} of {} repositories modified",
                    totals.modified.to_string().green(),
                    totals.repositories
                )?;
            } else {
                writeln!(writer, "  {}", "No repositories modified".dimmed())?;
            }
            writeln!(
                writer,
                "  {} valid, {} invalid, {} failed",
                totals.valid.to_string().green(),
                totals.invalid.to_string().dimmed(),
                if totals.failed > 0 {
                    totals.failed.to_string().red().to_string()
                } else {
                    totals.failed.to_string()
                }
            )?;
            if totals.warnings > 0 {
                writeln!(writer, "  {} warning(s)", totals.warnings.to_string().yellow())?;
            }
            if totals.errors > 0 {
                writeln!(
                    writer,
                    "  {} repository error(s)",
                    totals.errors.to_string().red()
                )?;
            }
        } else {
            writeln!(writer, "{}Summary:", prefix)?;
            if totals.modified > 0 {
                writeln!(
                    writer,
                    "  {} of {} repositories modified",
                    totals.modified, totals.repositories
                )?;
            } else {
                writeln!(writer, "  No repositories modified")?;
            }
            writeln!(
                writer,
                "  {} valid, {} invalid, {} failed",
                totals.valid, totals.invalid, totals.failed
            )?;
            if totals.warnings > 0 {
                writeln!(writer, "  {} warning(s)", totals.warnings)?;
            }
            if totals.errors > 0 {
                writeln!(writer, "  {} repository error(s)", totals.errors)?;
            }
        }
        Ok(())
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, result: &OrchestratorResult, writer: &mut dyn Write) -> std::io::Result<()> {
        // In quiet mode, only show summary
        if self.verbosity == Verbosity::Quiet {
            return self.format_summary(&result.report, writer);
        }

        if self.verbosity == Verbosity::Verbose {
            writeln!(writer, "Changes:")?;
            for change in &result.changes {
                writeln!(writer, "  {}", change)?;
            }
            writeln!(writer)?;
        }

        for repository in &result.report.repositories {
            self.format_repository(repository, writer)?;
        }
        self.format_errors(&result.report, writer)?;
        self.format_summary(&result.report, writer)
    }

    fn format_repository(
        &self,
        repository: &RepositoryReport,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        if !self.is_reportable(repository) {
            return Ok(());
        }

        let prefix = self.dry_run_prefix();
        let applied = repository.applied().count();
        let path_display = repository.path.display().to_string();
        if self.color {
            writeln!(
                writer,
                "{}{} — {} {}, {} {}",
                prefix,
                path_display.bold(),
                applied.to_string().green(),
                if applied == 1 { "field" } else { "fields" },
                repository.check.failed_count().to_string().dimmed(),
                "failed"
            )?;
        } else {
            writeln!(
                writer,
                "{}{} — {} {}, {} failed",
                prefix,
                path_display,
                applied,
                if applied == 1 { "field" } else { "fields" },
                repository.check.failed_count()
            )?;
        }

        let shown: Vec<&Substitution> = if self.verbosity == Verbosity::Verbose {
            repository.substitutions.iter().collect()
        } else {
            repository.applied().collect()
        };
        let width = shown
            .iter()
            .map(|s| s.change.dependency_id().len())
            .max()
            .unwrap_or(0)
            .max(20);
        for substitution in shown {
            self.format_substitution(substitution, width, writer)?;
        }

        for failed in repository.check.failed.values() {
            if self.color {
                writeln!(
                    writer,
                    "  {} {}",
                    "✗".red(),
                    format!("{} {} ({})", failed.change.kind, failed.change.dependency_id(), failed.reason).dimmed()
                )?;
            } else {
                writeln!(
                    writer,
                    "  ! {} {} ({})",
                    failed.change.kind,
                    failed.change.dependency_id(),
                    failed.reason
                )?;
            }
        }

        for (id, message) in &repository.check.warnings {
            if self.color {
                writeln!(writer, "  {} {}: {}", "⚠".yellow(), id, message)?;
            } else {
                writeln!(writer, "  warning {}: {}", id, message)?;
            }
        }

        if self.verbosity == Verbosity::Verbose {
            for invalid in &repository.check.invalid {
                writeln!(writer, "  filtered {}", invalid.qualified_id())?;
            }
            for outcome in &repository.kinds {
                let line = format!(
                    "  {:8} {} (valid {}, invalid {}, failed {})",
                    outcome.kind.name(),
                    outcome.state,
                    outcome.valid,
                    outcome.invalid,
                    outcome.failed
                );
                if self.color && outcome.state == KindState::NotApplicable {
                    writeln!(writer, "{}", line.dimmed())?;
                } else {
                    writeln!(writer, "{}", line)?;
                }
            }
        }

        writeln!(writer)
    }
}
