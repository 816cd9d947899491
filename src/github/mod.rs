// src/github/mod.rs
// =============================================================================
// Everything that talks to the GitHub REST API.
//
// Submodules:
// - repo:       repository identity (owner/name) and the file types we pass around
// - api:        endpoint URLs and response shapes
// - rate_limit: quota tracking from x-ratelimit-* headers
// - client:     the Transport seam and the retrying RequestExecutor
// - tree:       branch discovery and the recursive file listing
// - contents:   concurrent file downloads
// =============================================================================

pub mod api;
mod client;
mod contents;
mod rate_limit;
mod repo;
mod tree;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{NetworkError, RawResponse, ReqwestTransport, RequestExecutor, RetryPolicy, Transport};
pub use contents::{decode_content, ContentFetcher};
pub use rate_limit::{RateLimitState, RateLimiter, OPTIMISTIC_REMAINING};
pub use repo::{extension_of, EntryKind, FetchedFile, RepositoryRef, TreeEntry};
pub use tree::{candidate_branches, ResolvedTree, TreeResolver};
