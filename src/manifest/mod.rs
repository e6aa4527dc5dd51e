//! Manifest updaters, one per dependency manager kind
//!
//! This module provides:
//! - The `ManifestUpdater` contract every kind implements
//! - Read-as-source extraction and write-as-target rewriting per format
//! - The `KindRegistry` binding each kind to its updater in dispatch order

mod brew;
mod file;
mod helm;
mod json_span;
mod maven;
mod package_json;
mod plugins;
mod writer;

pub use brew::BrewUpdater;
pub use file::FileUpdater;
pub use helm::HelmUpdater;
pub use maven::MavenUpdater;
pub use package_json::NpmUpdater;
pub use plugins::PluginsUpdater;
pub use writer::{splice, Edit};

use crate::checksum::ChecksumFetcher;
use crate::config::RepositoryConfig;
use crate::domain::{Kind, VersionChange};
use crate::error::ManifestError;
use crate::update::PropagationContext;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Contract implemented by every kind's manifest updater
#[async_trait]
pub trait ManifestUpdater: Send + Sync {
    /// Returns the kind this updater handles
    fn kind(&self) -> Kind;

    /// Cheap structural test; never opens a manifest
    fn is_applicable(&self, ctx: &PropagationContext) -> bool;

    /// Manifests this kind owns once it is applicable
    fn claimed_manifests(&self, _ctx: &PropagationContext) -> Vec<PathBuf> {
        Vec::new()
    }

    /// Reads the artifacts this repository publishes for this kind
    fn extract_source_versions(
        &self,
        ctx: &PropagationContext,
    ) -> Result<Vec<VersionChange>, ManifestError>;

    /// Rewrites matching version fields; returns whether any file changed
    async fn apply_version_changes(
        &self,
        ctx: &mut PropagationContext,
        changes: &[VersionChange],
    ) -> Result<bool, ManifestError>;
}

/// Updaters for every enabled kind in dispatch order
pub struct KindRegistry {
    updaters: Vec<Box<dyn ManifestUpdater>>,
}

impl KindRegistry {
    /// Builds the registry for one repository's validated configuration
    pub fn for_repository(config: &RepositoryConfig, fetcher: Arc<dyn ChecksumFetcher>) -> Self {
        let updaters = Kind::all()
            .iter()
            .filter(|kind| config.is_enabled(**kind))
            .map(|kind| create_updater(*kind, config, fetcher.clone()))
            .collect();
        Self { updaters }
    }

    /// Returns the updaters in dispatch order
    pub fn updaters(&self) -> impl Iterator<Item = &dyn ManifestUpdater> {
        self.updaters.iter().map(|u| u.as_ref())
    }

    /// Returns the updater registered for a kind
    pub fn get(&self, kind: Kind) -> Option<&dyn ManifestUpdater> {
        self.updaters().find(|u| u.kind() == kind)
    }

    /// Returns the registered kinds in dispatch order
    pub fn kinds(&self) -> Vec<Kind> {
        self.updaters().map(|u| u.kind()).collect()
    }
}

/// Create the updater for a kind
pub fn create_updater(
    kind: Kind,
    config: &RepositoryConfig,
    fetcher: Arc<dyn ChecksumFetcher>,
) -> Box<dyn ManifestUpdater> {
    match kind {
        Kind::File => Box::new(FileUpdater),
        Kind::Maven => Box::new(MavenUpdater),
        Kind::Npm => Box::new(NpmUpdater),
        Kind::Helm => Box::new(HelmUpdater),
        Kind::Brew => Box::new(BrewUpdater::new(config.brew.clone(), fetcher)),
        Kind::Plugins => Box::new(PluginsUpdater::new(config.plugins.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::tests::StaticChecksum;

    fn fetcher() -> Arc<dyn ChecksumFetcher> {
        Arc::new(StaticChecksum::ok("0".repeat(64)))
    }

    #[test]
    fn test_registry_order() {
        let registry = KindRegistry::for_repository(&RepositoryConfig::new("/repo"), fetcher());
        assert_eq!(
            registry.kinds(),
            vec![
                Kind::Maven,
                Kind::Npm,
                Kind::Helm,
                Kind::Brew,
                Kind::Plugins,
                Kind::File
            ]
        );
    }

    #[test]
    fn test_registry_respects_enabled_kinds() {
        let config = RepositoryConfig::new("/repo").with_kinds(vec![Kind::Npm, Kind::Helm]);
        let registry = KindRegistry::for_repository(&config, fetcher());
        assert_eq!(registry.kinds(), vec![Kind::Npm, Kind::Helm]);
        assert!(registry.get(Kind::Maven).is_none());
    }

    #[test]
    fn test_create_updater_kind() {
        let config = RepositoryConfig::new("/repo");
        for kind in Kind::all() {
            assert_eq!(create_updater(*kind, &config, fetcher()).kind(), *kind);
        }
    }
}
