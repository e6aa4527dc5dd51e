//! Dependency manager kinds understood by the propagation engine

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported dependency-manager ecosystems
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// Loose build files (package.json, gradle.properties, Dockerfile)
    File,
    /// Maven builds (pom.xml)
    Maven,
    /// npm packages (package.json)
    Npm,
    /// Helm charts (Chart.yaml / requirements.yaml)
    Helm,
    /// Homebrew formulae (Formula/*.rb)
    Brew,
    /// Jenkins plugin lists (plugins.txt)
    Plugins,
}

impl Kind {
    /// Returns the lowercase name used in configuration and CLI arguments
    pub fn name(&self) -> &'static str {
        match self {
            Kind::File => "file",
            Kind::Maven => "maven",
            Kind::Npm => "npm",
            Kind::Helm => "helm",
            Kind::Brew => "brew",
            Kind::Plugins => "plugins",
        }
    }

    /// Returns the display name for this kind
    pub fn display_name(&self) -> &'static str {
        match self {
            Kind::File => "File",
            Kind::Maven => "Maven",
            Kind::Npm => "npm",
            Kind::Helm => "Helm",
            Kind::Brew => "Homebrew",
            Kind::Plugins => "Plugins",
        }
    }

    /// Returns every kind in dispatch order.
    ///
    /// File comes last: it only touches build files that no earlier kind
    /// claimed during the same pass.
    pub fn all() -> &'static [Kind] {
        &[
            Kind::Maven,
            Kind::Npm,
            Kind::Helm,
            Kind::Brew,
            Kind::Plugins,
            Kind::File,
        ]
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Kind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Kind::all()
            .iter()
            .copied()
            .find(|k| k.name() == lower)
            .ok_or_else(|| {
                format!(
                    "unknown kind '{}': expected one of file, maven, npm, helm, brew, plugins",
                    s
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(Kind::File.name(), "file");
        assert_eq!(Kind::Maven.name(), "maven");
        assert_eq!(Kind::Npm.name(), "npm");
        assert_eq!(Kind::Helm.name(), "helm");
        assert_eq!(Kind::Brew.name(), "brew");
        assert_eq!(Kind::Plugins.name(), "plugins");
    }

    #[test]
    fn test_all_puts_file_last() {
        let all = Kind::all();
        assert_eq!(all.len(), 6);
        assert_eq!(all.last(), Some(&Kind::File));
        assert_eq!(all.first(), Some(&Kind::Maven));
    }

    #[test]
    fn test_from_str_case_insensitive() {
        assert_eq!("NPM".parse::<Kind>().unwrap(), Kind::Npm);
        assert_eq!(" helm ".parse::<Kind>().unwrap(), Kind::Helm);
        assert!("gradle".parse::<Kind>().is_err());
    }

    #[test]
    fn test_display_round_trips_from_str() {
        for kind in Kind::all() {
            assert_eq!(kind.to_string().parse::<Kind>().unwrap(), *kind);
        }
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Kind::Brew).unwrap(), "\"brew\"");
        let kind: Kind = serde_json::from_str("\"plugins\"").unwrap();
        assert_eq!(kind, Kind::Plugins);
    }
}
