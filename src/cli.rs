//! CLI argument parsing module for depush

use crate::config::{
    BrewConfig, PluginsConfig, ProjectConfig, PropagationPlan, RepositoryConfig, DEFAULT_JOBS,
};
use crate::domain::{Kind, VersionChange};
use crate::error::ConfigError;
use crate::update::{DependencyFilter, FilterRule};
use clap::{ArgAction, Parser};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Parse a change in `KIND:ARTIFACT[#PROPERTY]=VERSION` form
fn parse_change(s: &str) -> Result<VersionChange, String> {
    s.parse().map_err(|e: ConfigError| e.to_string())
}

/// Parse a filter rule: `PATTERN` includes, `!PATTERN` excludes
fn parse_filter(s: &str) -> Result<FilterRule, String> {
    FilterRule::parse(s).map_err(|e| e.to_string())
}

/// Parse a timeout given in whole seconds (e.g. 30, 30s)
fn parse_seconds(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let num_str = s.strip_suffix('s').unwrap_or(s);
    let seconds: u64 = num_str
        .parse()
        .map_err(|_| format!("invalid number of seconds: {}", s))?;
    if seconds == 0 {
        return Err("timeout must be at least 1 second".to_string());
    }
    Ok(Duration::from_secs(seconds))
}

/// Version-change propagation across repositories
#[derive(Parser, Debug, Clone)]
#[command(
    name = "depush",
    version,
    about = "Propagate released versions into dependent repositories"
)]
pub struct CliArgs {
    /// Target repositories (default: current directory when no config lists any)
    pub targets: Vec<PathBuf>,

    /// Configuration file (default: ./depush.yml when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    // Change inputs
    /// Repository whose own published versions are propagated
    #[arg(short, long, value_name = "DIR", action = ArgAction::Append)]
    pub source: Vec<PathBuf>,

    /// Explicit change, KIND:ARTIFACT[#PROPERTY]=VERSION (can be specified multiple times)
    #[arg(long, value_name = "CHANGE", value_parser = parse_change, action = ArgAction::Append)]
    pub change: Vec<VersionChange>,

    // Target options
    /// Filter rule prepended to every repository's rules; prefix with ! to exclude
    #[arg(long, value_name = "RULE", value_parser = parse_filter, action = ArgAction::Append)]
    pub filter: Vec<FilterRule>,

    /// Restrict command-line targets to these kinds
    #[arg(long, value_name = "KIND", value_parser = clap::value_parser!(Kind), action = ArgAction::Append)]
    pub kind: Vec<Kind>,

    /// Jenkins plugin list, relative to each command-line target
    #[arg(long, value_name = "FILE")]
    pub plugins_file: Option<PathBuf>,

    /// Coordinate prefix joined to plugin names
    #[arg(long, value_name = "PREFIX", requires = "plugins_file")]
    pub plugin_prefix: Option<String>,

    /// Homebrew formula directory, relative to each command-line target
    #[arg(long, value_name = "DIR")]
    pub formula_dir: Option<PathBuf>,

    /// Upper bound for one checksum download, in seconds
    #[arg(long, value_name = "SECONDS", value_parser = parse_seconds)]
    pub checksum_timeout: Option<Duration>,

    /// Repositories processed concurrently
    #[arg(short, long, default_value_t = DEFAULT_JOBS)]
    pub jobs: usize,

    // General options
    /// Dry run mode - report what would change without writing manifests
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long)]
    pub quiet: bool,

    // Output options
    /// Output results in JSON format
    #[arg(long)]
    pub json: bool,
}

impl CliArgs {
    /// Builds the run plan from the configuration file and command line
    ///
    /// `cwd` anchors configuration discovery and the default target.
    pub fn to_plan(&self, cwd: &Path) -> Result<PropagationPlan, ConfigError> {
        let loaded = match &self.config {
            Some(path) => Some((path.clone(), ProjectConfig::load(path)?)),
            None => ProjectConfig::discover(cwd)?,
        };
        let mut plan = match loaded {
            Some((path, config)) => {
                let base = path.parent().unwrap_or(cwd);
                PropagationPlan::from_config(&config, base)?
            }
            None => PropagationPlan::new(),
        };

        let mut targets = self.targets.clone();
        if targets.is_empty() && plan.repositories.is_empty() {
            targets.push(cwd.to_path_buf());
        }
        for target in targets {
            plan = plan.with_repository(self.target_config(target));
        }

        for source in &self.source {
            plan = plan.with_source(source);
        }
        for change in &self.change {
            plan = plan.with_change(change.clone());
        }

        for repository in &mut plan.repositories {
            if !self.filter.is_empty() {
                let rules = self
                    .filter
                    .iter()
                    .chain(repository.filter.rules())
                    .cloned()
                    .collect();
                repository.filter = DependencyFilter::with_rules(rules);
            }
            if let Some(timeout) = self.checksum_timeout {
                repository.brew.checksum_timeout = timeout;
            }
        }

        let plan = plan.with_dry_run(self.dry_run).with_jobs(self.jobs);
        plan.validate()?;
        Ok(plan)
    }

    /// Settings for a repository named on the command line
    fn target_config(&self, path: PathBuf) -> RepositoryConfig {
        let mut config = RepositoryConfig::new(path);
        if !self.kind.is_empty() {
            config = config.with_kinds(self.kind.clone());
        }
        if let Some(file) = &self.plugins_file {
            let mut plugins = PluginsConfig::new(file);
            if let Some(prefix) = &self.plugin_prefix {
                plugins = plugins.with_prefix(prefix);
            }
            config = config.with_plugins(plugins);
        }
        if let Some(dir) = &self.formula_dir {
            config = config.with_brew(BrewConfig {
                formula_dir: dir.clone(),
                ..BrewConfig::default()
            });
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_CHECKSUM_TIMEOUT, DEFAULT_PLUGIN_PREFIX};
    use crate::domain::ArtifactKey;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_args() {
        let args = CliArgs::parse_from(["depush"]);
        assert!(args.targets.is_empty());
        assert!(args.config.is_none());
        assert!(args.source.is_empty());
        assert!(args.change.is_empty());
        assert!(args.filter.is_empty());
        assert!(args.kind.is_empty());
        assert!(args.plugins_file.is_none());
        assert!(args.formula_dir.is_none());
        assert!(args.checksum_timeout.is_none());
        assert_eq!(args.jobs, DEFAULT_JOBS);
        assert!(!args.dry_run);
        assert!(!args.verbose);
        assert!(!args.quiet);
        assert!(!args.json);
    }

    #[test]
    fn test_targets_and_flags() {
        let args = CliArgs::parse_from(["depush", "-n", "-q", "--json", "a", "b"]);
        assert_eq!(args.targets, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert!(args.dry_run);
        assert!(args.quiet);
        assert!(args.json);
    }

    #[test]
    fn test_change_parsing() {
        let args = CliArgs::parse_from([
            "depush",
            "--change",
            "npm:@angular/core=4.3.7",
            "--change",
            "maven:org.acme:core#acme.version=2.0.0",
        ]);
        assert_eq!(
            args.change,
            vec![
                VersionChange::new(Kind::Npm, "@angular/core", "4.3.7"),
                VersionChange::new(Kind::Maven, "org.acme:core", "2.0.0")
                    .with_property("acme.version"),
            ]
        );
    }

    #[test]
    fn test_invalid_change_rejected() {
        assert!(CliArgs::try_parse_from(["depush", "--change", "npm:lodash"]).is_err());
        assert!(CliArgs::try_parse_from(["depush", "--change", "cargo:serde=1.0.0"]).is_err());
    }

    #[test]
    fn test_kind_and_timeout_parsing() {
        let args = CliArgs::parse_from([
            "depush",
            "--kind",
            "helm",
            "--kind",
            "npm",
            "--checksum-timeout",
            "5s",
        ]);
        assert_eq!(args.kind, vec![Kind::Helm, Kind::Npm]);
        assert_eq!(args.checksum_timeout, Some(Duration::from_secs(5)));
        assert!(CliArgs::try_parse_from(["depush", "--checksum-timeout", "0"]).is_err());
    }

    #[test]
    fn test_plugin_prefix_requires_file() {
        assert!(CliArgs::try_parse_from(["depush", "--plugin-prefix", "io.jenkins:"]).is_err());
    }

    #[test]
    fn test_to_plan_defaults_to_cwd() {
        let dir = TempDir::new().unwrap();
        let plan = CliArgs::parse_from(["depush"]).to_plan(dir.path()).unwrap();

        assert_eq!(plan.repositories.len(), 1);
        assert_eq!(plan.repositories[0].path, dir.path());
        assert_eq!(plan.jobs, DEFAULT_JOBS);
        assert!(!plan.dry_run);
    }

    #[test]
    fn test_to_plan_target_options() {
        let dir = TempDir::new().unwrap();
        let args = CliArgs::parse_from([
            "depush",
            "--kind",
            "plugins",
            "--plugins-file",
            "jenkins/plugins.txt",
            "--formula-dir",
            "HomebrewFormula",
            "-n",
            "-j",
            "2",
            "target",
        ]);
        let plan = args.to_plan(dir.path()).unwrap();

        let repo = &plan.repositories[0];
        assert_eq!(repo.path, PathBuf::from("target"));
        assert_eq!(repo.kinds, vec![Kind::Plugins]);
        let plugins = repo.plugins.as_ref().unwrap();
        assert_eq!(plugins.file, PathBuf::from("jenkins/plugins.txt"));
        assert_eq!(plugins.prefix, DEFAULT_PLUGIN_PREFIX);
        assert_eq!(repo.brew.formula_dir, PathBuf::from("HomebrewFormula"));
        assert_eq!(repo.brew.checksum_timeout, DEFAULT_CHECKSUM_TIMEOUT);
        assert!(plan.dry_run);
        assert_eq!(plan.jobs, 2);
    }

    #[test]
    fn test_to_plan_merges_config_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("depush.yml"),
            r#"
changes:
  - kind: npm
    artifact: lodash
    version: 4.17.4
repositories:
  - path: web
    filter:
      - exclude: "@angular:*"
"#,
        )
        .unwrap();
        let args = CliArgs::parse_from([
            "depush",
            "--change",
            "npm:lodash=4.17.5",
            "--filter",
            "@angular:core",
            "--checksum-timeout",
            "7",
        ]);

        let plan = args.to_plan(dir.path()).unwrap();

        assert_eq!(plan.repositories.len(), 1);
        let repo = &plan.repositories[0];
        assert_eq!(repo.path, dir.path().join("web"));
        assert_eq!(repo.brew.checksum_timeout, Duration::from_secs(7));

        let rules: Vec<String> = repo.filter.rules().iter().map(|r| r.to_string()).collect();
        assert_eq!(rules, vec!["@angular:core", "!@angular:*"]);
        assert!(repo
            .filter
            .matches(&ArtifactKey::parse(Kind::Npm, "@angular/core")));
        assert!(!repo
            .filter
            .matches(&ArtifactKey::parse(Kind::Npm, "@angular/common")));

        assert_eq!(
            plan.changes.as_slice(),
            &[VersionChange::new(Kind::Npm, "lodash", "4.17.5")]
        );
    }

    #[test]
    fn test_to_plan_explicit_config_path() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("custom.yml");
        fs::write(&config, "repositories:\n  - path: app\n").unwrap();
        let args = CliArgs::parse_from(["depush", "--config", config.to_str().unwrap()]);

        let plan = args.to_plan(Path::new("/unused")).unwrap();
        assert_eq!(plan.repositories[0].path, dir.path().join("app"));
    }

    #[test]
    fn test_to_plan_rejects_zero_jobs() {
        let dir = TempDir::new().unwrap();
        let args = CliArgs::parse_from(["depush", "-j", "0"]);
        assert!(matches!(
            args.to_plan(dir.path()),
            Err(ConfigError::ConflictingOptions { .. })
        ));
    }
}
