// src/github/tree.rs
// =============================================================================
// Finds the file listing of a repository.
//
// Strategy:
// 1. Answer from the cache when we resolved this repository recently
// 2. Ask the repository metadata endpoint for the default branch
// 3. Fetch the recursive tree for that branch
// 4. If that fails or comes back empty, walk a fixed list of common branch
//    names (main, master) and take the first one that works
//
// The candidate list is finite, so this is a plain bounded loop. A bad token
// stops everything immediately; other failures just move on to the next
// candidate.
// =============================================================================

use crate::cache::{tree_key, Cached, FetchCache};
use crate::error::{FetchError, Result};
use crate::github::api::{self, RepoMetadata, TreeResponse};
use crate::github::client::RequestExecutor;
use crate::github::repo::{RepositoryRef, TreeEntry};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// A branch and its complete (or GitHub-truncated) file listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTree {
    pub branch: String,
    pub entries: Vec<TreeEntry>,
    pub truncated: bool,
}

impl ResolvedTree {
    /// Number of entries in the listing (directories included).
    pub fn total_count(&self) -> usize {
        self.entries.len()
    }
}

/// Resolves repositories to a branch and a flat entry list.
pub struct TreeResolver<'a> {
    executor: &'a RequestExecutor,
    cache: &'a FetchCache,
    api_base: &'a Url,
    fallback_branches: &'a [String],
    cache_ttl: Duration,
}

impl<'a> TreeResolver<'a> {
    pub fn new(
        executor: &'a RequestExecutor,
        cache: &'a FetchCache,
        api_base: &'a Url,
        fallback_branches: &'a [String],
        cache_ttl: Duration,
    ) -> Self {
        Self { executor, cache, api_base, fallback_branches, cache_ttl }
    }

    pub async fn resolve(&self, repo: &RepositoryRef) -> Result<Arc<ResolvedTree>> {
        let key = tree_key(repo);
        if let Some(Cached::Tree(tree)) = self.cache.get(&key) {
            self.executor.stats().record_cache_hit();
            info!(repo = %repo, branch = %tree.branch, "tree cache hit");
            return Ok(tree);
        }

        let default_branch = self.default_branch(repo).await?;

        for branch in candidate_branches(default_branch.as_deref(), self.fallback_branches) {
            match self.fetch_tree(repo, &branch).await {
                Ok(Some(resolved)) => {
                    info!(repo = %repo, branch = %branch, files = resolved.total_count(), "resolved file tree");
                    let resolved = Arc::new(resolved);
                    self.cache.set(key, Cached::Tree(resolved.clone()), self.cache_ttl);
                    return Ok(resolved);
                }
                Ok(None) => warn!(repo = %repo, branch = %branch, "branch has an empty tree, trying fallbacks"),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(repo = %repo, branch = %branch, "tree fetch failed ({}), trying fallbacks", e),
            }
        }

        Err(FetchError::TreeUnavailable(repo.full_name()))
    }

    // Returns None when the metadata call fails for any non-fatal reason; the
    // fallback list still gets a chance
    async fn default_branch(&self, repo: &RepositoryRef) -> Result<Option<String>> {
        let url = api::repo_url(self.api_base, repo);
        let body = match self.executor.execute(&url).await {
            Ok(body) => body,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(repo = %repo, "could not read repository metadata: {}", e);
                return Ok(None);
            }
        };

        match serde_json::from_str::<RepoMetadata>(&body) {
            Ok(metadata) => {
                debug!(repo = %repo, branch = ?metadata.default_branch, "default branch");
                Ok(metadata.default_branch.filter(|branch| !branch.is_empty()))
            }
            Err(e) => {
                warn!(repo = %repo, "malformed repository metadata: {}", e);
                Ok(None)
            }
        }
    }

    // Ok(None) for a listing that parsed but holds no entries
    async fn fetch_tree(&self, repo: &RepositoryRef, branch: &str) -> Result<Option<ResolvedTree>> {
        let url = api::tree_url(self.api_base, repo, branch);
        let body = self.executor.execute(&url).await?;

        let parsed: TreeResponse = serde_json::from_str(&body).map_err(|e| FetchError::Malformed {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        if parsed.tree.is_empty() {
            return Ok(None);
        }
        if parsed.truncated {
            warn!(repo = %repo, branch, "GitHub truncated the tree listing; sampling from a partial tree");
        }

        Ok(Some(ResolvedTree {
            branch: branch.to_string(),
            entries: parsed.tree,
            truncated: parsed.truncated,
        }))
    }
}

/// Default branch first (when known), then each fallback not already listed.
pub fn candidate_branches(default_branch: Option<&str>, fallbacks: &[String]) -> Vec<String> {
    let mut candidates: Vec<String> = default_branch.map(str::to_string).into_iter().collect();
    for branch in fallbacks {
        if !candidates.contains(branch) {
            candidates.push(branch.clone());
        }
    }
    candidates
}
