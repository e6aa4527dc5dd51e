//! Project configuration
//!
//! This module provides:
//! - `ProjectConfig`: the raw `depush.yml` document
//! - `RepositoryConfig`: validated per-target settings handed to the updaters
//! - `PropagationPlan`: everything one run needs, validated before any work

use crate::domain::{ChangeSet, Kind, VersionChange};
use crate::error::ConfigError;
use crate::update::{DependencyFilter, FilterRule};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "depush.yml";

/// Coordinate prefix of Jenkins plugins
pub const DEFAULT_PLUGIN_PREFIX: &str = "org.jenkins-ci.plugins:";

/// Directory holding Homebrew formulae
pub const DEFAULT_FORMULA_DIR: &str = "Formula";

/// Default checksum download timeout (30 seconds)
pub const DEFAULT_CHECKSUM_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of repositories processed concurrently
pub const DEFAULT_JOBS: usize = 4;

/// Raw project configuration as written in YAML
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Repositories whose own versions are propagated
    pub sources: Vec<PathBuf>,
    /// Explicit version changes
    pub changes: Vec<VersionChange>,
    /// Target repositories
    pub repositories: Vec<RepositoryEntry>,
}

/// One `repositories` entry
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryEntry {
    /// Working copy path, relative to the configuration file
    pub path: PathBuf,
    /// Ordered filter rules
    #[serde(default)]
    pub filter: Vec<RuleEntry>,
    /// Kinds to run (all when absent)
    #[serde(default)]
    pub kinds: Option<Vec<Kind>>,
    /// Plugin list settings
    #[serde(default)]
    pub plugins: Option<PluginsEntry>,
    /// Homebrew settings
    #[serde(default)]
    pub brew: Option<BrewEntry>,
}

/// `{include: PATTERN}` or `{exclude: PATTERN}`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleEntry {
    pub include: Option<String>,
    pub exclude: Option<String>,
}

impl RuleEntry {
    fn to_rule(&self) -> Result<FilterRule, ConfigError> {
        match (&self.include, &self.exclude) {
            (Some(pattern), None) => FilterRule::include(pattern),
            (None, Some(pattern)) => FilterRule::exclude(pattern),
            _ => Err(ConfigError::invalid_rule(
                format!("{:?}", self),
                "expected exactly one of include or exclude",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginsEntry {
    pub file: PathBuf,
    #[serde(default)]
    pub prefix: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrewEntry {
    pub formula_dir: PathBuf,
}

impl ProjectConfig {
    /// Loads a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(path, &content)
    }

    /// Parses configuration text; `path` is used for error messages
    pub fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Loads `depush.yml` from `dir` if present
    pub fn discover(dir: &Path) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        let path = dir.join(DEFAULT_CONFIG_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let config = Self::load(&path)?;
        Ok(Some((path, config)))
    }
}

/// Plugin list location and coordinate prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginsConfig {
    /// Plugin list, relative to the working copy
    pub file: PathBuf,
    /// Prefix turning a plugin name into a change artifact
    pub prefix: String,
}

impl PluginsConfig {
    /// Creates settings with the default Jenkins prefix
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            prefix: DEFAULT_PLUGIN_PREFIX.to_string(),
        }
    }

    /// Overrides the coordinate prefix (builder pattern)
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

/// Homebrew formula settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrewConfig {
    /// Formula directory, relative to the working copy
    pub formula_dir: PathBuf,
    /// Upper bound for one checksum download
    pub checksum_timeout: Duration,
}

impl Default for BrewConfig {
    fn default() -> Self {
        Self {
            formula_dir: PathBuf::from(DEFAULT_FORMULA_DIR),
            checksum_timeout: DEFAULT_CHECKSUM_TIMEOUT,
        }
    }
}

/// Validated settings of one target repository
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Working copy root
    pub path: PathBuf,
    /// Dependency filter
    pub filter: DependencyFilter,
    /// Enabled kinds
    pub kinds: Vec<Kind>,
    /// Plugin list settings; the Plugins kind needs them to apply
    pub plugins: Option<PluginsConfig>,
    /// Homebrew settings
    pub brew: BrewConfig,
}

impl RepositoryConfig {
    /// Creates settings with every kind enabled and no filter
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            filter: DependencyFilter::new(),
            kinds: Kind::all().to_vec(),
            plugins: None,
            brew: BrewConfig::default(),
        }
    }

    /// Sets the dependency filter (builder pattern)
    pub fn with_filter(mut self, filter: DependencyFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Restricts the enabled kinds (builder pattern)
    pub fn with_kinds(mut self, kinds: Vec<Kind>) -> Self {
        self.kinds = kinds;
        self
    }

    /// Sets plugin list settings (builder pattern)
    pub fn with_plugins(mut self, plugins: PluginsConfig) -> Self {
        self.plugins = Some(plugins);
        self
    }

    /// Sets Homebrew settings (builder pattern)
    pub fn with_brew(mut self, brew: BrewConfig) -> Self {
        self.brew = brew;
        self
    }

    /// Returns true if the kind runs for this repository
    pub fn is_enabled(&self, kind: Kind) -> bool {
        self.kinds.contains(&kind)
    }

    fn from_entry(entry: &RepositoryEntry, base: &Path) -> Result<Self, ConfigError> {
        let rules = entry
            .filter
            .iter()
            .map(RuleEntry::to_rule)
            .collect::<Result<Vec<_>, _>>()?;

        let mut config = RepositoryConfig::new(base.join(&entry.path))
            .with_filter(DependencyFilter::with_rules(rules));
        if let Some(kinds) = &entry.kinds {
            config = config.with_kinds(kinds.clone());
        }
        if let Some(plugins) = &entry.plugins {
            let mut settings = PluginsConfig::new(&plugins.file);
            if let Some(prefix) = &plugins.prefix {
                settings = settings.with_prefix(prefix);
            }
            config = config.with_plugins(settings);
        }
        if let Some(brew) = &entry.brew {
            config.brew.formula_dir = brew.formula_dir.clone();
        }
        Ok(config)
    }
}

/// Everything one run needs
#[derive(Debug, Clone)]
pub struct PropagationPlan {
    /// Repositories whose own versions are propagated
    pub sources: Vec<PathBuf>,
    /// Explicit changes, merged with extracted ones at run time
    pub changes: ChangeSet,
    /// Target repositories in input order
    pub repositories: Vec<RepositoryConfig>,
    /// Leave manifests untouched
    pub dry_run: bool,
    /// Repositories processed concurrently
    pub jobs: usize,
}

impl Default for PropagationPlan {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            changes: ChangeSet::new(),
            repositories: Vec::new(),
            dry_run: false,
            jobs: DEFAULT_JOBS,
        }
    }
}

impl PropagationPlan {
    /// Creates an empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a plan from a configuration file's content
    ///
    /// Relative paths are resolved against `base`, the file's directory.
    pub fn from_config(config: &ProjectConfig, base: &Path) -> Result<Self, ConfigError> {
        let repositories = config
            .repositories
            .iter()
            .map(|entry| RepositoryConfig::from_entry(entry, base))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            sources: config.sources.iter().map(|s| base.join(s)).collect(),
            changes: config.changes.iter().cloned().collect(),
            repositories,
            ..Self::default()
        })
    }

    /// Adds a target repository (builder pattern)
    pub fn with_repository(mut self, repository: RepositoryConfig) -> Self {
        self.repositories.push(repository);
        self
    }

    /// Adds a change; later changes revise earlier ones (builder pattern)
    pub fn with_change(mut self, change: VersionChange) -> Self {
        self.changes.push(change);
        self
    }

    /// Adds a source repository (builder pattern)
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.sources.push(source.into());
        self
    }

    /// Sets dry-run mode (builder pattern)
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets the concurrency limit (builder pattern)
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Checks the plan before any work starts
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repositories.is_empty() {
            return Err(ConfigError::NoRepositories);
        }
        if self.jobs == 0 {
            return Err(ConfigError::ConflictingOptions {
                message: "--jobs must be at least 1".to_string(),
            });
        }

        // Each working copy gets exactly one worker
        let mut seen = HashSet::new();
        for repository in &self.repositories {
            let canonical =
                fs::canonicalize(&repository.path).unwrap_or_else(|_| repository.path.clone());
            if !seen.insert(canonical) {
                return Err(ConfigError::DuplicateRepository {
                    path: repository.path.clone(),
                });
            }
        }
        Ok(())
    }
}
