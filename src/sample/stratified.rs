// src/sample/stratified.rs
// =============================================================================
// Picks at most `budget` files from a tree while keeping a mix of file types.
//
// Algorithm:
// 1. Keep blobs the relevance predicate accepts (first occurrence of a path)
// 2. If they already fit the budget, keep them all
// 3. Group by extension, groups ordered by first appearance in the tree
// 4. First pass: take up to budget / group_count (at least 1) from each group
// 5. Second pass: hand leftover slots to the groups with the most untaken
//    files (ties keep first-appearance order)
// 6. Cut the result down to exactly `budget`
//
// Everything is ordered by position in the input, so the same tree always
// produces the same sample.
// =============================================================================

use crate::github::{extension_of, TreeEntry};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

// One extension's candidates, in tree order
struct ExtensionGroup<'a> {
    extension: String,
    entries: Vec<&'a TreeEntry>,
    taken: usize,
}

impl ExtensionGroup<'_> {
    fn untaken(&self) -> usize {
        self.entries.len() - self.taken
    }
}

/// Selects a bounded, extension-diverse subset of `entries`.
///
/// A budget of 0 yields an empty sample.
pub fn sample<F>(entries: &[TreeEntry], is_relevant: F, budget: usize) -> Vec<TreeEntry>
where
    F: Fn(&str) -> bool,
{
    let mut seen = HashSet::new();
    let candidates: Vec<&TreeEntry> = entries
        .iter()
        .filter(|entry| entry.is_blob() && is_relevant(&entry.path))
        .filter(|entry| seen.insert(entry.path.as_str()))
        .collect();

    info!("{} relevant files of {} entries", candidates.len(), entries.len());

    if candidates.len() <= budget {
        return candidates.into_iter().cloned().collect();
    }

    match stratify(&candidates, budget) {
        Some(picked) => {
            info!("sampled {} of {} relevant files", picked.len(), candidates.len());
            picked
        }
        None => {
            warn!("stratified sampling failed, taking the first {} files", budget);
            candidates.into_iter().take(budget).cloned().collect()
        }
    }
}

// None when the groups cannot produce a valid sample
fn stratify(candidates: &[&TreeEntry], budget: usize) -> Option<Vec<TreeEntry>> {
    if budget == 0 {
        return Some(Vec::new());
    }

    let mut groups = group_by_extension(candidates);
    if groups.is_empty() {
        return None;
    }

    let per_extension = (budget / groups.len()).max(1);
    let mut picked: Vec<&TreeEntry> = Vec::with_capacity(budget + groups.len());

    // First pass: spread the budget evenly
    for group in &mut groups {
        let take = per_extension.min(group.entries.len());
        picked.extend(&group.entries[..take]);
        group.taken = take;
        debug!(".{}: taking {}/{}", group.extension, take, group.entries.len());
    }

    // Second pass: fill what is left from the biggest leftovers
    if picked.len() < budget {
        let mut order: Vec<usize> = (0..groups.len()).collect();
        // sort_by_key is stable, so equal counts keep first-seen order
        order.sort_by_key(|&index| std::cmp::Reverse(groups[index].untaken()));

        let mut remaining = budget - picked.len();
        for index in order {
            if remaining == 0 {
                break;
            }
            let group = &mut groups[index];
            let take = remaining.min(group.untaken());
            if take == 0 {
                continue;
            }
            picked.extend(&group.entries[group.taken..group.taken + take]);
            group.taken += take;
            remaining -= take;
            debug!(".{}: adding {} more", group.extension, take);
        }
    }

    picked.truncate(budget);

    let mut paths = HashSet::with_capacity(picked.len());
    if !picked.iter().all(|entry| paths.insert(entry.path.as_str())) {
        return None;
    }

    Some(picked.into_iter().cloned().collect())
}

fn group_by_extension<'a>(candidates: &[&'a TreeEntry]) -> Vec<ExtensionGroup<'a>> {
    let mut groups: Vec<ExtensionGroup<'a>> = Vec::new();
    let mut index_of: HashMap<String, usize> = HashMap::new();

    for &entry in candidates {
        let extension = extension_of(&entry.path);
        let index = *index_of.entry(extension.clone()).or_insert_with(|| {
            groups.push(ExtensionGroup { extension, entries: Vec::new(), taken: 0 });
            groups.len() - 1
        });
        groups[index].entries.push(entry);
    }

    groups
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why Vec<&TreeEntry> while sampling?
//    - We only shuffle references around; the entries are cloned once, at
//      the very end, for the files we actually keep
//
// 2. Why a Vec of groups plus a HashMap of indices?
//    - HashMap iteration order is random; the Vec keeps first-seen order
//    - The HashMap just answers "which group does this extension use?"
//
// 3. What does std::cmp::Reverse do?
//    - It flips the ordering, so sort_by_key sorts largest-first
// -----------------------------------------------------------------------------
