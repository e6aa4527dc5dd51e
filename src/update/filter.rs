//! Dependency filter configuration
//!
//! Ordered include/exclude rules over artifact keys. Rules are evaluated in
//! declaration order and the first rule that matches decides.

use crate::domain::ArtifactKey;
use crate::error::ConfigError;
use glob::Pattern;
use std::fmt;

/// Whether a matching rule admits or rejects the artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Matching artifacts are propagated
    Include,
    /// Matching artifacts are rejected
    Exclude,
}

/// A single include or exclude rule
#[derive(Debug, Clone)]
pub struct FilterRule {
    polarity: Polarity,
    source: String,
    group: Pattern,
    name: Option<Pattern>,
}

impl FilterRule {
    /// Creates an include rule
    pub fn include(pattern: &str) -> Result<Self, ConfigError> {
        Self::new(Polarity::Include, pattern)
    }

    /// Creates an exclude rule
    pub fn exclude(pattern: &str) -> Result<Self, ConfigError> {
        Self::new(Polarity::Exclude, pattern)
    }

    /// Parses CLI syntax: `PATTERN` includes, `!PATTERN` excludes
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        match text.trim().strip_prefix('!') {
            Some(rest) => Self::exclude(rest),
            None => Self::include(text),
        }
    }

    /// Creates a rule from `group` or `group:artifact` glob text
    pub fn new(polarity: Polarity, pattern: &str) -> Result<Self, ConfigError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(ConfigError::invalid_rule(pattern, "empty pattern"));
        }

        let compile = |text: &str| {
            Pattern::new(text).map_err(|e| ConfigError::invalid_rule(pattern, e.msg))
        };

        let (group, name) = match pattern.split_once(':') {
            Some((group, name)) => (compile(group)?, Some(compile(name)?)),
            None => (compile(pattern)?, None),
        };

        Ok(Self {
            polarity,
            source: pattern.to_string(),
            group,
            name,
        })
    }

    /// Returns the rule polarity
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Returns true if the rule's pattern matches the artifact
    pub fn matches(&self, key: &ArtifactKey) -> bool {
        match (&key.group, &self.name) {
            (Some(group), Some(name)) => self.group.matches(group) && name.matches(&key.name),
            (Some(group), None) => self.group.matches(group),
            // Group-less identifiers (Helm, Brew, unscoped npm) match on the name
            (None, Some(_)) => false,
            (None, None) => self.group.matches(&key.name),
        }
    }
}

impl fmt::Display for FilterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.polarity {
            Polarity::Include => write!(f, "{}", self.source),
            Polarity::Exclude => write!(f, "!{}", self.source),
        }
    }
}

/// Filter deciding which artifacts a repository accepts
#[derive(Debug, Clone, Default)]
pub struct DependencyFilter {
    rules: Vec<FilterRule>,
}

impl DependencyFilter {
    /// Create a filter that matches everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a filter from rules in declaration order
    pub fn with_rules(rules: Vec<FilterRule>) -> Self {
        Self { rules }
    }

    /// Append a rule (builder pattern)
    pub fn with_rule(mut self, rule: FilterRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Returns the rules in evaluation order
    pub fn rules(&self) -> &[FilterRule] {
        &self.rules
    }

    /// Check if an artifact passes the filter
    ///
    /// The first matching rule wins. Without a match the artifact is admitted
    /// unless the rule set contains at least one include rule.
    pub fn matches(&self, key: &ArtifactKey) -> bool {
        if let Some(rule) = self.rules.iter().find(|rule| rule.matches(key)) {
            return rule.polarity() == Polarity::Include;
        }
        !self
            .rules
            .iter()
            .any(|rule| rule.polarity() == Polarity::Include)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Kind;

    fn maven(text: &str) -> ArtifactKey {
        ArtifactKey::parse(Kind::Maven, text)
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = DependencyFilter::new();
        assert!(filter.matches(&maven("cheese:edam")));
        assert!(filter.matches(&ArtifactKey::parse(Kind::Helm, "chart")));
    }

    #[test]
    fn test_include_groups() {
        let filter = DependencyFilter::new()
            .with_rule(FilterRule::include("org.springframework").unwrap())
            .with_rule(FilterRule::include("org.apache.maven").unwrap());

        assert!(filter.matches(&maven("org.springframework:something")));
        assert!(filter.matches(&maven("org.apache.maven:whatnot")));
        assert!(!filter.matches(&maven("cheese:edam")));
    }

    #[test]
    fn test_only_excludes_admits_the_rest() {
        let filter = DependencyFilter::new().with_rule(FilterRule::exclude("cheese").unwrap());
        assert!(!filter.matches(&maven("cheese:edam")));
        assert!(filter.matches(&maven("org.foo:bar")));
    }

    #[test]
    fn test_first_match_wins() {
        let filter = DependencyFilter::new()
            .with_rule(FilterRule::exclude("org.foo:internal-*").unwrap())
            .with_rule(FilterRule::include("org.foo:*").unwrap());

        assert!(!filter.matches(&maven("org.foo:internal-api")));
        assert!(filter.matches(&maven("org.foo:public-api")));
        assert!(!filter.matches(&maven("org.bar:public-api")));
    }

    #[test]
    fn test_declaration_order_matters() {
        let filter = DependencyFilter::new()
            .with_rule(FilterRule::include("org.foo:*").unwrap())
            .with_rule(FilterRule::exclude("org.foo:internal-*").unwrap());
        assert!(filter.matches(&maven("org.foo:internal-api")));
    }

    #[test]
    fn test_glob_group() {
        let filter = DependencyFilter::new().with_rule(FilterRule::include("io.fabric8*").unwrap());
        assert!(filter.matches(&maven("io.fabric8.jenkins:plugin")));
        assert!(!filter.matches(&maven("io.other:plugin")));
    }

    #[test]
    fn test_npm_scope_as_group() {
        let filter = DependencyFilter::new().with_rule(FilterRule::include("@angular:*").unwrap());
        assert!(filter.matches(&ArtifactKey::parse(Kind::Npm, "@angular/core")));
        assert!(!filter.matches(&ArtifactKey::parse(Kind::Npm, "lodash")));
    }

    #[test]
    fn test_groupless_name_match() {
        let filter = DependencyFilter::new().with_rule(FilterRule::include("sub*").unwrap());
        assert!(filter.matches(&ArtifactKey::parse(Kind::Helm, "subchart2")));
        assert!(!filter.matches(&ArtifactKey::parse(Kind::Helm, "other")));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let filter = DependencyFilter::new()
            .with_rule(FilterRule::exclude("cheese").unwrap())
            .with_rule(FilterRule::include("org.*").unwrap());
        for text in ["cheese:edam", "org.foo:bar", "com.x:y"] {
            let key = maven(text);
            assert_eq!(filter.matches(&key), filter.matches(&key));
        }
    }

    #[test]
    fn test_parse_cli_syntax() {
        let rule = FilterRule::parse("!cheese:*").unwrap();
        assert_eq!(rule.polarity(), Polarity::Exclude);
        assert_eq!(rule.to_string(), "!cheese:*");

        let rule = FilterRule::parse("org.foo").unwrap();
        assert_eq!(rule.polarity(), Polarity::Include);
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(FilterRule::include("").is_err());
        assert!(FilterRule::include("org.[foo").is_err());
    }
}
