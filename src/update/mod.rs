//! Propagation of version changes into one working copy
//!
//! This module provides:
//! - Dependency filter configuration
//! - The per-repository propagation context
//! - Source extraction of a repository's own published versions
//! - The dispatcher classifying each change as valid, invalid or failed

mod context;
mod filter;
mod source;

pub use context::{ChangeOutcome, PropagationContext};
pub use filter::{DependencyFilter, FilterRule, Polarity};
pub use source::extract_source_changes;

use crate::checksum::ChecksumFetcher;
use crate::config::RepositoryConfig;
use crate::domain::{KindOutcome, KindState, RepositoryReport, VersionChange};
use crate::error::ManifestError;
use crate::manifest::KindRegistry;
use std::sync::Arc;
use tracing::debug;

/// Runs every registered kind over one working copy
pub struct Propagator {
    /// Updaters in dispatch order
    registry: KindRegistry,
    /// Decides which changes the repository accepts
    filter: DependencyFilter,
}

impl Propagator {
    /// Create a dispatcher from a registry and filter
    pub fn new(registry: KindRegistry, filter: DependencyFilter) -> Self {
        Self { registry, filter }
    }

    /// Create the dispatcher for one repository's validated configuration
    pub fn for_repository(config: &RepositoryConfig, fetcher: Arc<dyn ChecksumFetcher>) -> Self {
        Self::new(
            KindRegistry::for_repository(config, fetcher),
            config.filter.clone(),
        )
    }

    /// Applies the context's changes and classifies every one of them
    ///
    /// Kinds run sequentially in registry order. A manifest error aborts the
    /// pass; writes made by earlier kinds stay on disk.
    pub async fn propagate(
        &self,
        ctx: &mut PropagationContext,
    ) -> Result<RepositoryReport, ManifestError> {
        let mut report = RepositoryReport::new(ctx.root());

        for updater in self.registry.updaters() {
            let kind = updater.kind();
            if !updater.is_applicable(ctx) {
                debug!(%kind, root = %ctx.root().display(), "kind not applicable");
                report.kinds.push(KindOutcome::not_applicable(kind));
                continue;
            }
            for path in updater.claimed_manifests(ctx) {
                ctx.claim(path);
            }

            let (relevant, invalid): (Vec<VersionChange>, Vec<VersionChange>) = ctx
                .changes()
                .iter()
                .filter(|c| c.kind == kind)
                .cloned()
                .partition(|c| self.filter.matches(&c.key()));

            let changed = if relevant.is_empty() {
                false
            } else {
                updater.apply_version_changes(ctx, &relevant).await?
            };

            let mut outcome = KindOutcome {
                kind,
                state: if changed {
                    KindState::Changed
                } else {
                    KindState::Unchanged
                },
                considered: relevant.len() + invalid.len(),
                valid: 0,
                invalid: invalid.len(),
                failed: 0,
            };
            for change in relevant {
                if ctx.is_matched(&change) {
                    outcome.valid += 1;
                    report.check.add_valid(change);
                } else {
                    outcome.failed += 1;
                    let reason = format!("no {} manifest field matched", kind.display_name());
                    report.check.add_failed(change, reason);
                }
            }
            for change in invalid {
                report.check.add_invalid(change);
            }

            debug!(%kind, state = %outcome.state, valid = outcome.valid, failed = outcome.failed, "kind finished");
            report.modified |= changed;
            report.kinds.push(outcome);
        }

        for outcome in ctx.outcomes() {
            debug!(
                change = %outcome.change,
                files = ?outcome.files,
                applied = outcome.applied,
                "change outcome"
            );
        }
        for (change, message) in ctx.warnings() {
            report.check.add_warning(change, message.clone());
        }
        report.substitutions = ctx.substitutions().to_vec();
        Ok(report)
    }
}
