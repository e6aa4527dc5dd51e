//! Artifact identity parsed from kind-specific dependency identifiers

use super::Kind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Group-scoped identity of a dependency
///
/// The textual form depends on the kind:
/// - Maven, Plugins, File: `group:artifact`
/// - npm: `@scope/name` (the scope is the group)
/// - Helm, Brew: a bare name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
    /// Kind this key was parsed for; decides how it renders
    pub kind: Kind,
    /// Group, scope or namespace, if the identifier has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Artifact, package or chart name
    pub name: String,
}

impl ArtifactKey {
    /// Parses a dependency identifier in the textual form used by `kind`
    pub fn parse(kind: Kind, text: &str) -> Self {
        let text = text.trim();
        let (group, name) = match kind {
            Kind::Maven | Kind::Plugins | Kind::File => match text.split_once(':') {
                Some((group, name)) => (Some(group.to_string()), name.to_string()),
                None => (None, text.to_string()),
            },
            Kind::Npm => match text.strip_prefix('@').and_then(|rest| rest.split_once('/')) {
                Some((scope, name)) => (Some(format!("@{}", scope)), name.to_string()),
                None => (None, text.to_string()),
            },
            Kind::Helm | Kind::Brew => (None, text.to_string()),
        };
        Self { kind, group, name }
    }

    /// Renders the key back to its kind-specific textual form
    pub fn render(&self) -> String {
        match (&self.group, self.kind) {
            (None, _) => self.name.clone(),
            (Some(group), Kind::Npm) => format!("{}/{}", group, self.name),
            (Some(group), _) => format!("{}:{}", group, self.name),
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_maven_coordinate() {
        let key = ArtifactKey::parse(Kind::Maven, "org.springframework:spring-core");
        assert_eq!(key.group.as_deref(), Some("org.springframework"));
        assert_eq!(key.name, "spring-core");
        assert_eq!(key.render(), "org.springframework:spring-core");
    }

    #[test]
    fn test_parse_npm_scoped_and_unscoped() {
        let scoped = ArtifactKey::parse(Kind::Npm, "@angular/core");
        assert_eq!(scoped.group.as_deref(), Some("@angular"));
        assert_eq!(scoped.name, "core");
        assert_eq!(scoped.render(), "@angular/core");

        let plain = ArtifactKey::parse(Kind::Npm, "lodash");
        assert!(plain.group.is_none());
        assert_eq!(plain.render(), "lodash");
    }

    #[test]
    fn test_parse_helm_keeps_colons_in_name() {
        let key = ArtifactKey::parse(Kind::Helm, "subchart2");
        assert!(key.group.is_none());
        assert_eq!(key.to_string(), "subchart2");
    }

    #[test]
    fn test_parse_plugin_identifier() {
        let key = ArtifactKey::parse(Kind::Plugins, "org.jenkins-ci.plugins:branch-api");
        assert_eq!(key.group.as_deref(), Some("org.jenkins-ci.plugins"));
        assert_eq!(key.name, "branch-api");
    }

    #[test]
    fn test_equality_is_case_sensitive() {
        let a = ArtifactKey::parse(Kind::Maven, "org.foo:Bar");
        let b = ArtifactKey::parse(Kind::Maven, "org.foo:bar");
        assert_ne!(a, b);
    }
}
