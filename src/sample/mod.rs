// src/sample/mod.rs
// =============================================================================
// Choosing which files to download.
//
// Submodules:
// - relevance:  which paths are worth reading at all
// - stratified: picking a bounded, type-diverse subset of them
//
// Nothing in here does I/O; it is all plain functions over tree entries.
// =============================================================================

mod relevance;
mod stratified;

pub use relevance::RelevanceFilter;
pub use stratified::sample;

use crate::github::TreeEntry;
use std::collections::BTreeMap;

/// Counts sampled files per extension (for reporting).
pub fn extension_histogram(entries: &[TreeEntry]) -> BTreeMap<String, usize> {
    let mut histogram = BTreeMap::new();
    for entry in entries {
        *histogram.entry(entry.extension()).or_insert(0) += 1;
    }
    histogram
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_histogram() {
        let entries = vec![
            TreeEntry::blob("a.py", 1),
            TreeEntry::blob("b.PY", 1),
            TreeEntry::blob("README", 1),
        ];
        let histogram = extension_histogram(&entries);
        assert_eq!(histogram.get("py"), Some(&2));
        assert_eq!(histogram.get("no_ext"), Some(&1));
    }
}
