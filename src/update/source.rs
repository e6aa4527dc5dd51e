//! Source extraction
//!
//! Derives "my current version" changes from a source repository's own
//! manifests, using each applicable kind's read side.

use super::PropagationContext;
use crate::domain::VersionChange;
use crate::error::ManifestError;
use crate::manifest::KindRegistry;
use std::path::Path;
use tracing::debug;

/// Returns the versions published by the repository at `root`
///
/// Kinds are visited in registry order. Nothing is written.
pub fn extract_source_changes(
    root: &Path,
    registry: &KindRegistry,
) -> Result<Vec<VersionChange>, ManifestError> {
    let ctx = PropagationContext::new(root, Vec::new());
    let mut changes = Vec::new();

    for updater in registry.updaters() {
        if !updater.is_applicable(&ctx) {
            continue;
        }
        let extracted = updater.extract_source_versions(&ctx)?;
        debug!(
            kind = %updater.kind(),
            root = %root.display(),
            count = extracted.len(),
            "extracted source versions"
        );
        changes.extend(extracted);
    }
    Ok(changes)
}
