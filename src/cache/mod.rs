// src/cache/mod.rs
// =============================================================================
// Process-wide cache shared by the tree resolver, the content fetcher, and
// the orchestrator.
//
// One TtlCache holds three kinds of values, told apart by key prefix:
//   tree:{owner}/{name}             -> resolved branch + entries
//   file:{owner}/{name}:{path}      -> one decoded file
//   repo:{owner}/{name}:{budget}    -> a whole fetch result
// =============================================================================

mod ttl;

pub use ttl::TtlCache;

use crate::github::{FetchedFile, RepositoryRef, ResolvedTree};
use crate::pipeline::RepositorySnapshot;
use std::sync::Arc;

/// A value stored in the shared fetch cache.
///
/// Large payloads sit behind Arc so a cache hit is a pointer copy.
#[derive(Debug, Clone)]
pub enum Cached {
    Tree(Arc<ResolvedTree>),
    File(Arc<FetchedFile>),
    Repository(Arc<RepositorySnapshot>),
}

/// The cache type every component shares.
pub type FetchCache = TtlCache<String, Cached>;

pub fn tree_key(repo: &RepositoryRef) -> String {
    format!("tree:{}", repo.full_name())
}

pub fn file_key(repo: &RepositoryRef, path: &str) -> String {
    format!("file:{}:{}", repo.full_name(), path)
}

pub fn repository_key(repo: &RepositoryRef, budget: usize) -> String {
    format!("repo:{}:{}", repo.full_name(), budget)
}
