//! Byte-range edits over manifest text
//!
//! Every updater locates the version token it wants to change and hands the
//! byte range to `splice`, so that all other bytes of the manifest survive
//! untouched.

use std::ops::Range;

/// Replacement of one byte range in a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Byte range of the token being replaced
    pub range: Range<usize>,
    /// Replacement text
    pub replacement: String,
}

impl Edit {
    /// Create a new edit
    pub fn new(range: Range<usize>, replacement: impl Into<String>) -> Self {
        Self {
            range,
            replacement: replacement.into(),
        }
    }
}

/// Apply edits to `content`
///
/// Edits are applied back to front. When two edits target overlapping ranges
/// only the first one (by start offset, then insertion order) is kept.
pub fn splice(content: &str, edits: &[Edit]) -> String {
    let mut ordered: Vec<&Edit> = edits.iter().collect();
    ordered.sort_by_key(|e| e.range.start);

    let mut kept: Vec<&Edit> = Vec::with_capacity(ordered.len());
    for edit in ordered {
        let overlaps = kept
            .last()
            .map(|prev| edit.range.start < prev.range.end)
            .unwrap_or(false);
        if !overlaps && edit.range.end <= content.len() {
            kept.push(edit);
        }
    }

    let mut result = content.to_string();
    for edit in kept.iter().rev() {
        result.replace_range(edit.range.clone(), &edit.replacement);
    }
    result
}
