// src/github/contents.rs
// =============================================================================
// Downloads file contents for a sampled set of tree entries.
//
// How it works:
// - Every entry becomes one future: cache lookup, else a contents API call
//   followed by base64 -> UTF-8 decoding
// - The futures run through buffer_unordered(concurrency), so at most
//   `concurrency` requests are in flight at once
// - A failing file is logged and left out of the result; the batch goes on
// - A bad token is the exception: we return at once, which drops the stream
//   and with it every pending and in-flight request
//
// Cache writes wait until the whole batch has finished. An aborted or
// cancelled batch therefore leaves no trace in the cache.
// =============================================================================

use crate::cache::{file_key, Cached, FetchCache};
use crate::error::{FetchError, Result};
use crate::github::api::{self, ContentResponse};
use crate::github::client::RequestExecutor;
use crate::github::repo::{FetchedFile, RepositoryRef, TreeEntry};
use base64::Engine;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

// Where a successfully fetched file came from
enum Source {
    Cache,
    Network,
}

/// Fetches many files concurrently with per-file failure isolation.
pub struct ContentFetcher<'a> {
    executor: &'a RequestExecutor,
    cache: &'a FetchCache,
    api_base: &'a Url,
    concurrency: usize,
    cache_ttl: Duration,
}

impl<'a> ContentFetcher<'a> {
    pub fn new(
        executor: &'a RequestExecutor,
        cache: &'a FetchCache,
        api_base: &'a Url,
        concurrency: usize,
        cache_ttl: Duration,
    ) -> Self {
        Self { executor, cache, api_base, concurrency: concurrency.max(1), cache_ttl }
    }

    /// Fetches every entry, returning the files that could be read as text.
    ///
    /// Only an InvalidCredential (or other batch-aborting error) is returned
    /// as Err; everything else just shrinks the map.
    pub async fn fetch_all(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        entries: &[TreeEntry],
    ) -> Result<BTreeMap<String, FetchedFile>> {
        if entries.is_empty() {
            return Ok(BTreeMap::new());
        }

        let mut results = stream::iter(entries.iter().map(move |entry| async move {
            (entry.path.as_str(), self.fetch_one(repo, branch, &entry.path).await)
        }))
        .buffer_unordered(self.concurrency);

        let mut files = BTreeMap::new();
        let mut fresh = Vec::new();

        while let Some((path, outcome)) = results.next().await {
            match outcome {
                Ok(Some((file, source))) => {
                    debug!(path, "fetched");
                    if matches!(source, Source::Network) {
                        fresh.push(file.clone());
                    }
                    files.insert(path.to_string(), (*file).clone());
                }
                Ok(None) => {}
                Err(e) if e.aborts_batch() => {
                    warn!(repo = %repo, "aborting content batch: {}", e);
                    return Err(e);
                }
                Err(e) => warn!(path, "failed to fetch: {}", e),
            }
        }

        // The batch completed, so its downloads are safe to remember
        for file in fresh {
            let key = file_key(repo, &file.path);
            self.cache.set(key, Cached::File(file), self.cache_ttl);
        }

        info!(repo = %repo, "fetched {}/{} files successfully", files.len(), entries.len());
        Ok(files)
    }

    // Ok(None) means "skip this file quietly" (binary, empty, or not a file)
    async fn fetch_one(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        path: &str,
    ) -> Result<Option<(Arc<FetchedFile>, Source)>> {
        if let Some(Cached::File(file)) = self.cache.get(&file_key(repo, path)) {
            self.executor.stats().record_cache_hit();
            debug!(path, "file cache hit");
            return Ok(Some((file, Source::Cache)));
        }

        let url = api::contents_url(self.api_base, repo, path, branch);
        let body = self.executor.execute(&url).await?;

        let response: ContentResponse = match serde_json::from_str(&body) {
            Ok(response) => response,
            Err(e) => {
                // Directory listings come back as a JSON array
                debug!(path, "not a file response: {}", e);
                return Ok(None);
            }
        };

        match decode_content(path, &response) {
            Ok(Some(text)) => Ok(Some((Arc::new(FetchedFile::new(path, text)), Source::Network))),
            Ok(None) => {
                debug!(path, "no inline content");
                Ok(None)
            }
            Err(e) => {
                debug!(path, "skipping binary file: {}", e);
                Ok(None)
            }
        }
    }
}

/// Decodes a contents API payload into text.
///
/// Ok(None): no content or an encoding other than base64 (GitHub reports
/// "none" for files too large to inline). Err(Decode): not base64, or not
/// UTF-8 once decoded.
pub fn decode_content(path: &str, response: &ContentResponse) -> Result<Option<String>> {
    let (Some(content), Some("base64")) = (response.content.as_deref(), response.encoding.as_deref())
    else {
        return Ok(None);
    };
    if content.is_empty() {
        return Ok(None);
    }

    // GitHub wraps the base64 at 60 columns
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|_| FetchError::Decode(path.to_string()))?;

    String::from_utf8(bytes)
        .map(Some)
        .map_err(|_| FetchError::Decode(path.to_string()))
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why buffer_unordered and not tokio::spawn?
//    - The futures borrow `self`, `repo`, and `entries`; spawn would need
//      'static data (Arc clones of everything)
//    - buffer_unordered polls them all on the current task and caps how many
//      run at once, which is exactly the concurrency limit we want
//
// 2. What happens to in-flight requests when we `return Err(e)`?
//    - `results` (the stream) is dropped
//    - Dropping a future cancels it, so the remaining requests are abandoned
//
// 3. Why Arc<FetchedFile>?
//    - The cache and the result map both want the file; Arc shares it
//      instead of copying the content string
// -----------------------------------------------------------------------------
