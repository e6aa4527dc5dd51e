//! Propagation orchestrator for coordinating one run across repositories
//!
//! This module provides:
//! - Change resolution: source extraction merged with explicit changes
//! - Parallel propagation, one task per target repository, bounded by `--jobs`
//! - Sequential reduction of per-repository reports in input order
//! - Error handling with partial continuation

use crate::checksum::{ChecksumFetcher, HttpChecksumFetcher};
use crate::config::{PropagationPlan, RepositoryConfig, DEFAULT_CHECKSUM_TIMEOUT};
use crate::domain::{ChangeSet, CheckReport, RepositoryReport, VersionChange};
use crate::error::{AppError, IoError};
use crate::manifest::KindRegistry;
use crate::progress::Progress;
use crate::update::{extract_source_changes, PropagationContext, Propagator};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Orchestrator for one propagation run
pub struct Orchestrator {
    /// Validated run settings
    plan: PropagationPlan,
    /// Checksum source shared by every Brew updater
    fetcher: Arc<dyn ChecksumFetcher>,
}

/// Result of running the orchestrator
#[derive(Debug)]
pub struct OrchestratorResult {
    /// Changes offered to every repository
    pub changes: Vec<VersionChange>,
    /// Aggregated report
    pub report: CheckReport,
}

type WorkerOutput = (usize, PathBuf, Result<RepositoryReport, AppError>);

impl Orchestrator {
    /// Create a new orchestrator fetching checksums over HTTP
    pub fn new(plan: PropagationPlan) -> Result<Self, AppError> {
        let timeout = plan
            .repositories
            .iter()
            .map(|r| r.brew.checksum_timeout)
            .max()
            .unwrap_or(DEFAULT_CHECKSUM_TIMEOUT);
        let fetcher = HttpChecksumFetcher::with_timeout(timeout)?;
        Ok(Self::with_fetcher(plan, Arc::new(fetcher)))
    }

    /// Create an orchestrator with a custom checksum fetcher (for testing)
    pub fn with_fetcher(plan: PropagationPlan, fetcher: Arc<dyn ChecksumFetcher>) -> Self {
        Self { plan, fetcher }
    }

    /// Run the propagation workflow
    ///
    /// A repository that fails is recorded in the report's error list and
    /// does not stop the others. Errors resolving the change list abort the run.
    pub async fn run(&self, show_progress: bool) -> Result<OrchestratorResult, AppError> {
        self.plan.validate()?;
        let mut progress = Progress::new(show_progress);

        progress.spinner("Reading source versions...");
        let changes = self.resolve_changes();
        progress.finish_and_clear();
        let changes = changes?;
        if changes.is_empty() {
            info!("no version changes to propagate");
        }

        let total = self.plan.repositories.len();
        progress.start(total as u64, "Propagating");

        let semaphore = Arc::new(Semaphore::new(self.plan.jobs.max(1)));
        let mut join_set: JoinSet<WorkerOutput> = JoinSet::new();
        for (index, config) in self.plan.repositories.iter().cloned().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let fetcher = Arc::clone(&self.fetcher);
            let changes = changes.clone();
            let dry_run = self.plan.dry_run;

            join_set.spawn(async move {
                let _permit = semaphore.acquire().await;
                let result = propagate_repository(&config, fetcher, changes, dry_run).await;
                (index, config.path, result)
            });
        }

        let mut outputs: Vec<Option<(PathBuf, Result<RepositoryReport, AppError>)>> =
            (0..total).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            let (index, path, result) = joined.map_err(|e| AppError::TaskPanic(e.to_string()))?;
            progress.set_message(&path.display().to_string());
            progress.inc();
            outputs[index] = Some((path, result));
        }
        progress.finish_and_clear();

        let mut report = CheckReport::new(self.plan.dry_run);
        for (path, result) in outputs.into_iter().flatten() {
            match result {
                Ok(repository) => report.add_repository(repository),
                Err(e) => {
                    error!(repo = %path.display(), error = %e, "propagation aborted");
                    report.add_error(path, e.to_string());
                }
            }
        }

        Ok(OrchestratorResult { changes, report })
    }

    /// Source versions first, explicit changes revising them
    fn resolve_changes(&self) -> Result<Vec<VersionChange>, AppError> {
        let mut changes = ChangeSet::new();
        for source in &self.plan.sources {
            if !source.is_dir() {
                return Err(IoError::directory_not_found(source).into());
            }
            let registry = KindRegistry::for_repository(
                &RepositoryConfig::new(source),
                Arc::clone(&self.fetcher),
            );
            changes.extend(extract_source_changes(source, &registry)?);
        }
        changes.extend(self.plan.changes.as_slice().iter().cloned());
        Ok(changes.into_vec())
    }
}

/// Runs every kind over one target repository
async fn propagate_repository(
    config: &RepositoryConfig,
    fetcher: Arc<dyn ChecksumFetcher>,
    changes: Vec<VersionChange>,
    dry_run: bool,
) -> Result<RepositoryReport, AppError> {
    if !config.path.is_dir() {
        return Err(IoError::directory_not_found(&config.path).into());
    }

    let mut ctx = PropagationContext::new(&config.path, changes).with_dry_run(dry_run);
    let report = Propagator::for_repository(config, fetcher)
        .propagate(&mut ctx)
        .await?;
    info!(
        repo = %config.path.display(),
        modified = report.modified,
        valid = report.check.valid_count(),
        failed = report.check.failed_count(),
        "propagation finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::tests::StaticChecksum;
    use crate::domain::Kind;
    use crate::error::ConfigError;
    use crate::update::{DependencyFilter, FilterRule};
    use std::fs;
    use tempfile::TempDir;

    fn orchestrator(plan: PropagationPlan) -> Orchestrator {
        Orchestrator::with_fetcher(plan, Arc::new(StaticChecksum::ok("0".repeat(64))))
    }

    fn npm_repo(version: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            format!("{{\"dependencies\": {{\"lodash\": \"{}\"}}}}\n", version),
        )
        .unwrap();
        dir
    }

    #[tokio::test]
    async fn test_reports_in_input_order() {
        let repos: Vec<TempDir> = (0..5).map(|_| npm_repo("4.17.4")).collect();
        let mut plan = PropagationPlan::new()
            .with_jobs(2)
            .with_change(VersionChange::new(Kind::Npm, "lodash", "4.17.5"));
        for repo in &repos {
            plan = plan.with_repository(RepositoryConfig::new(repo.path()));
        }

        let result = orchestrator(plan).run(false).await.unwrap();

        let paths: Vec<PathBuf> = result.report.repositories.iter().map(|r| r.path.clone()).collect();
        let expected: Vec<PathBuf> = repos.iter().map(|r| r.path().to_path_buf()).collect();
        assert_eq!(paths, expected);
        assert!(result.report.repositories.iter().all(|r| r.modified));
        assert_eq!(result.report.totals().valid, 5);
    }

    #[tokio::test]
    async fn test_shared_working_copy_is_rejected() {
        let dir = TempDir::new().unwrap();
        let content = "{\"dependencies\": {\"a\": \"1.0.0\", \"b\": \"1.0.0\"}}\n";
        fs::write(dir.path().join("package.json"), content).unwrap();
        let plan = PropagationPlan::new()
            .with_jobs(4)
            .with_change(VersionChange::new(Kind::Npm, "a", "2.0.0"))
            .with_change(VersionChange::new(Kind::Npm, "b", "2.0.0"))
            .with_repository(
                RepositoryConfig::new(dir.path())
                    .with_filter(DependencyFilter::with_rules(vec![FilterRule::include("a").unwrap()])),
            )
            .with_repository(
                RepositoryConfig::new(dir.path())
                    .with_filter(DependencyFilter::with_rules(vec![FilterRule::include("b").unwrap()])),
            );

        let result = orchestrator(plan).run(false).await;

        assert!(matches!(
            result,
            Err(AppError::Config(ConfigError::DuplicateRepository { .. }))
        ));
        assert_eq!(fs::read_to_string(dir.path().join("package.json")).unwrap(), content);
    }

    #[tokio::test]
    async fn test_failed_repository_does_not_stop_others() {
        let good = npm_repo("4.17.4");
        let broken = TempDir::new().unwrap();
        fs::write(broken.path().join("package.json"), "{ nope").unwrap();
        let plan = PropagationPlan::new()
            .with_change(VersionChange::new(Kind::Npm, "lodash", "4.17.5"))
            .with_repository(RepositoryConfig::new(broken.path()))
            .with_repository(RepositoryConfig::new("/nonexistent/depush-target"))
            .with_repository(RepositoryConfig::new(good.path()));

        let result = orchestrator(plan).run(false).await.unwrap();

        assert_eq!(result.report.repositories.len(), 1);
        assert_eq!(result.report.errors.len(), 2);
        assert!(result.report.errors[0].message.contains("package.json"));
        assert!(result.report.errors[1].message.contains("directory not found"));
        assert!(result.report.has_errors());
        assert!(result.report.has_changes());
    }

    #[tokio::test]
    async fn test_explicit_change_revises_source_version() {
        let source = TempDir::new().unwrap();
        fs::write(
            source.path().join("package.json"),
            r#"{"name": "lodash", "version": "4.17.5"}"#,
        )
        .unwrap();
        let target = npm_repo("4.17.4");
        let plan = PropagationPlan::new()
            .with_source(source.path())
            .with_change(VersionChange::new(Kind::Npm, "lodash", "4.17.10"))
            .with_repository(RepositoryConfig::new(target.path()));

        let result = orchestrator(plan).run(false).await.unwrap();

        assert_eq!(
            result.changes,
            vec![VersionChange::new(Kind::Npm, "lodash", "4.17.10")]
        );
        let content = fs::read_to_string(target.path().join("package.json")).unwrap();
        assert!(content.contains("\"lodash\": \"4.17.10\""));
    }

    #[tokio::test]
    async fn test_missing_source_aborts() {
        let target = npm_repo("4.17.4");
        let plan = PropagationPlan::new()
            .with_source("/nonexistent/depush-source")
            .with_repository(RepositoryConfig::new(target.path()));

        let err = orchestrator(plan).run(false).await.unwrap_err();
        assert!(matches!(err, AppError::Io(IoError::DirectoryNotFound { .. })));
    }

    #[tokio::test]
    async fn test_dry_run_leaves_files() {
        let target = npm_repo("4.17.4");
        let plan = PropagationPlan::new()
            .with_dry_run(true)
            .with_change(VersionChange::new(Kind::Npm, "lodash", "4.17.5"))
            .with_repository(RepositoryConfig::new(target.path()));

        let result = orchestrator(plan).run(false).await.unwrap();

        assert!(result.report.dry_run);
        assert!(result.report.has_changes());
        let content = fs::read_to_string(target.path().join("package.json")).unwrap();
        assert!(content.contains("\"lodash\": \"4.17.4\""));
    }
}
