// src/pipeline/orchestrator.rs
// =============================================================================
// Ties the pieces together into one call:
//
//   URL -> RepositoryRef -> cache? -> tree -> sample -> contents -> cache
//
// RepoFetcher owns the request executor and holds handles to the shared
// cache and rate limiter. Those handles are passed in, never global, so two
// fetchers can share one quota tracker or keep separate ones.
//
// Failure policy:
// - bad URL, bad token, no usable tree, cancellation: the call fails
// - anything that only affects one file: the file is missing from the map
// =============================================================================

use crate::cache::{repository_key, Cached, FetchCache};
use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::github::{
    ContentFetcher, FetchedFile, RateLimitState, RateLimiter, ReqwestTransport, RepositoryRef,
    RequestExecutor, ResolvedTree, RetryPolicy, Transport, TreeEntry, TreeResolver,
};
use crate::sample::{self, RelevanceFilter};
use crate::stats::{FetchStats, StatsSnapshot};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// The result of fetching one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositorySnapshot {
    pub repository: RepositoryRef,
    pub branch: String,
    /// path -> file, for every sampled file that could be read as text
    pub files: BTreeMap<String, FetchedFile>,
    /// Entries in the repository tree (used for reporting)
    pub total_count: usize,
    /// How many files the sampler picked (files.len() can be smaller)
    pub sampled_count: usize,
}

/// What a fetch would download, without downloading it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SamplePlan {
    pub repository: RepositoryRef,
    pub branch: String,
    pub total_count: usize,
    pub truncated: bool,
    pub sampled: Vec<TreeEntry>,
}

/// Resolves, samples, and fetches repositories.
pub struct RepoFetcher {
    executor: RequestExecutor,
    cache: Arc<FetchCache>,
    limiter: Arc<RateLimiter>,
    stats: Arc<FetchStats>,
    api_base: Url,
    relevance: RelevanceFilter,
    fallback_branches: Vec<String>,
    concurrency: usize,
    cache_ttl: Duration,
}

impl RepoFetcher {
    /// Builds a fetcher on an explicit transport, cache, and rate limiter.
    pub fn new(
        config: &FetchConfig,
        transport: Arc<dyn Transport>,
        cache: Arc<FetchCache>,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self> {
        config.validate()?;

        let stats = Arc::new(FetchStats::default());
        let policy = RetryPolicy {
            max_retries: config.max_retries,
            backoff_base: config.backoff_base(),
        };

        Ok(Self {
            executor: RequestExecutor::new(transport, limiter.clone(), policy, stats.clone()),
            cache,
            limiter,
            stats,
            api_base: config.api_base_url()?,
            relevance: RelevanceFilter::default().with_extensions(&config.extra_extensions),
            fallback_branches: config.fallback_branches.clone(),
            concurrency: config.concurrency,
            cache_ttl: config.cache_ttl(),
        })
    }

    /// Builds a fetcher that talks to GitHub over HTTPS with fresh state.
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        config.validate()?;
        if config.token.is_none() {
            warn!("no GitHub token configured; unauthenticated requests are limited to 60/hour");
        }

        let transport = ReqwestTransport::new(config.token.as_deref(), config.request_timeout())?;
        let cache = Arc::new(FetchCache::new(config.cache_capacity));
        let limiter = Arc::new(RateLimiter::new(
            config.low_water_mark,
            config.max_rate_limit_wait(),
        ));

        Self::new(config, Arc::new(transport), cache, limiter)
    }

    /// Fetches up to `budget` representative files of the repository at `repo_url`.
    pub async fn fetch_repository(&self, repo_url: &str, budget: usize) -> Result<RepositorySnapshot> {
        if budget == 0 {
            return Err(FetchError::Config("file budget must be at least 1".into()));
        }
        let repo = RepositoryRef::parse(repo_url)?;
        info!(repo = %repo, budget, "fetching repository");

        let key = repository_key(&repo, budget);
        if let Some(Cached::Repository(snapshot)) = self.cache.get(&key) {
            self.stats.record_cache_hit();
            info!(repo = %repo, "repository cache hit");
            return Ok((*snapshot).clone());
        }

        let tree = self.resolve(&repo).await?;
        let sampled = self.sample(&tree, budget);

        let files = self
            .contents()
            .fetch_all(&repo, &tree.branch, &sampled)
            .await?;

        let snapshot = RepositorySnapshot {
            repository: repo,
            branch: tree.branch.clone(),
            files,
            total_count: tree.total_count(),
            sampled_count: sampled.len(),
        };
        info!(
            repo = %snapshot.repository,
            fetched = snapshot.files.len(),
            total = snapshot.total_count,
            "repository fetched"
        );

        self.cache.set(key, Cached::Repository(Arc::new(snapshot.clone())), self.cache_ttl);
        Ok(snapshot)
    }

    /// Like fetch_repository, but gives up with Cancelled once `cancel` completes.
    ///
    /// The pipeline future is dropped on cancellation: in-flight requests are
    /// abandoned and nothing from the unfinished fetch reaches the cache.
    pub async fn fetch_repository_until<F>(
        &self,
        repo_url: &str,
        budget: usize,
        cancel: F,
    ) -> Result<RepositorySnapshot>
    where
        F: Future<Output = ()>,
    {
        until_cancelled(repo_url, self.fetch_repository(repo_url, budget), cancel).await
    }

    /// Resolves and samples without downloading any file contents.
    pub async fn plan(&self, repo_url: &str, budget: usize) -> Result<SamplePlan> {
        if budget == 0 {
            return Err(FetchError::Config("file budget must be at least 1".into()));
        }
        let repo = RepositoryRef::parse(repo_url)?;
        let tree = self.resolve(&repo).await?;
        let sampled = self.sample(&tree, budget);

        Ok(SamplePlan {
            repository: repo,
            branch: tree.branch.clone(),
            total_count: tree.total_count(),
            truncated: tree.truncated,
            sampled,
        })
    }

    /// Like plan, but gives up with Cancelled once `cancel` completes.
    pub async fn plan_until<F>(&self, repo_url: &str, budget: usize, cancel: F) -> Result<SamplePlan>
    where
        F: Future<Output = ()>,
    {
        until_cancelled(repo_url, self.plan(repo_url, budget), cancel).await
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn rate_limit(&self) -> RateLimitState {
        self.limiter.snapshot()
    }

    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }

    async fn resolve(&self, repo: &RepositoryRef) -> Result<Arc<ResolvedTree>> {
        TreeResolver::new(
            &self.executor,
            &self.cache,
            &self.api_base,
            &self.fallback_branches,
            self.cache_ttl,
        )
        .resolve(repo)
        .await
    }

    fn sample(&self, tree: &ResolvedTree, budget: usize) -> Vec<TreeEntry> {
        sample::sample(&tree.entries, |path| self.relevance.is_relevant(path), budget)
    }

    fn contents(&self) -> ContentFetcher<'_> {
        ContentFetcher::new(
            &self.executor,
            &self.cache,
            &self.api_base,
            self.concurrency,
            self.cache_ttl,
        )
    }
}

// `cancel` is polled first, so a cancellation that is already due always wins
async fn until_cancelled<T, Op, C>(repo_url: &str, operation: Op, cancel: C) -> Result<T>
where
    Op: Future<Output = Result<T>>,
    C: Future<Output = ()>,
{
    tokio::select! {
        biased;
        _ = cancel => {
            warn!(repo_url, "operation cancelled");
            Err(FetchError::Cancelled)
        }
        result = operation => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{file_key, tree_key};
    use crate::github::api;
    use crate::github::testing::{contents_body, ScriptedTransport};
    use crate::github::RawResponse;
    use serde_json::json;

    const REPO_URL: &str = "https://github.com/octo/hello";

    struct Harness {
        transport: Arc<ScriptedTransport>,
        fetcher: RepoFetcher,
        api_base: Url,
        repo: RepositoryRef,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_transport(ScriptedTransport::new())
        }

        fn with_transport(transport: ScriptedTransport) -> Self {
            let transport = Arc::new(transport);
            let config = FetchConfig {
                token: Some("test-token".into()),
                api_base: "https://api.test".into(),
                ..FetchConfig::default()
            };
            let fetcher = RepoFetcher::new(
                &config,
                transport.clone(),
                Arc::new(FetchCache::new(config.cache_capacity)),
                Arc::new(RateLimiter::new(config.low_water_mark, config.max_rate_limit_wait())),
            )
            .unwrap();

            Self {
                transport,
                fetcher,
                api_base: Url::parse("https://api.test").unwrap(),
                repo: RepositoryRef::new("octo", "hello").unwrap(),
            }
        }

        // Serves metadata, a tree on `main` with `paths`, and text for each path
        fn serve_repository(&self, paths: &[&str]) {
            self.transport.respond_json(
                api::repo_url(&self.api_base, &self.repo),
                json!({"full_name": "octo/hello", "default_branch": "main"}),
            );
            let tree: Vec<_> = paths
                .iter()
                .map(|path| json!({"path": path, "type": "blob", "size": 42}))
                .collect();
            self.transport.respond_json(
                api::tree_url(&self.api_base, &self.repo, "main"),
                json!({"sha": "abc", "tree": tree, "truncated": false}),
            );
            for path in paths {
                self.transport.respond_json(
                    self.contents_url(path),
                    contents_body(format!("// {path}\n").as_bytes()),
                );
            }
        }

        fn contents_url(&self, path: &str) -> String {
            api::contents_url(&self.api_base, &self.repo, path, "main")
        }
    }

    fn py_files(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("pkg/module_{i}.py")).collect()
    }

    #[tokio::test]
    async fn test_fetches_sampled_files() {
        let h = Harness::new();
        h.serve_repository(&["README.md", "app.py", "logo.png", "style.css"]);

        let snapshot = h.fetcher.fetch_repository(REPO_URL, 20).await.unwrap();
        assert_eq!(snapshot.branch, "main");
        assert_eq!(snapshot.total_count, 4);
        assert_eq!(snapshot.sampled_count, 3);
        assert_eq!(
            snapshot.files.keys().collect::<Vec<_>>(),
            vec!["README.md", "app.py", "style.css"]
        );
        assert_eq!(snapshot.files["app.py"].content, "// app.py\n");
    }

    #[tokio::test]
    async fn test_budget_limits_fetched_files() {
        let h = Harness::new();
        let paths = py_files(30);
        let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
        h.serve_repository(&refs);

        let snapshot = h.fetcher.fetch_repository(REPO_URL, 7).await.unwrap();
        assert_eq!(snapshot.total_count, 30);
        assert_eq!(snapshot.sampled_count, 7);
        assert_eq!(snapshot.files.len(), 7);
        // metadata + tree + 7 contents
        assert_eq!(h.transport.total_calls(), 9);
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let h = Harness::new();
        h.serve_repository(&["a.py", "b.js", "c.md"]);

        let first = h.fetcher.fetch_repository(REPO_URL, 10).await.unwrap();
        let calls = h.transport.total_calls();
        let api_calls = h.fetcher.stats().api_calls;

        let second = h.fetcher.fetch_repository(REPO_URL, 10).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(h.transport.total_calls(), calls);
        assert_eq!(h.fetcher.stats().api_calls, api_calls);
        assert_eq!(h.fetcher.stats().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_different_budget_reuses_tree_and_files() {
        let h = Harness::new();
        h.serve_repository(&["a.py", "b.js", "c.md"]);

        h.fetcher.fetch_repository(REPO_URL, 10).await.unwrap();
        let calls = h.transport.total_calls();

        let smaller = h.fetcher.fetch_repository(REPO_URL, 2).await.unwrap();
        assert_eq!(smaller.files.len(), 2);
        // Tree and both files came from the cache
        assert_eq!(h.transport.total_calls(), calls);
    }

    #[tokio::test]
    async fn test_invalid_url_makes_no_requests() {
        let h = Harness::new();
        let err = h.fetcher.fetch_repository("not a repository", 5).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
        assert_eq!(h.transport.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_zero_budget_is_rejected() {
        let h = Harness::new();
        let err = h.fetcher.fetch_repository(REPO_URL, 0).await.unwrap_err();
        assert!(matches!(err, FetchError::Config(_)));
        assert_eq!(h.transport.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_falls_back_to_master_branch() {
        let h = Harness::new();
        h.transport.respond_json(
            api::repo_url(&h.api_base, &h.repo),
            json!({"default_branch": "main"}),
        );
        h.transport.respond(api::tree_url(&h.api_base, &h.repo, "main"), RawResponse::new(404, "{}"));
        h.transport.respond_json(
            api::tree_url(&h.api_base, &h.repo, "master"),
            json!({"tree": [{"path": "main.py", "type": "blob", "size": 5}]}),
        );
        h.transport.respond_json(
            api::contents_url(&h.api_base, &h.repo, "main.py", "master"),
            contents_body(b"print(1)"),
        );

        let snapshot = h.fetcher.fetch_repository(REPO_URL, 5).await.unwrap();
        assert_eq!(snapshot.branch, "master");
        assert_eq!(snapshot.files["main.py"].content, "print(1)");
    }

    #[tokio::test]
    async fn test_missing_tree_is_an_error() {
        let h = Harness::new();
        let err = h.fetcher.fetch_repository(REPO_URL, 5).await.unwrap_err();
        assert_eq!(err, FetchError::TreeUnavailable("octo/hello".into()));
    }

    #[tokio::test]
    async fn test_bad_token_during_contents_discards_everything() {
        let h = Harness::new();
        h.serve_repository(&["a.py", "b.py", "c.py"]);
        h.transport.replace(h.contents_url("b.py"), RawResponse::new(401, "Bad credentials"));

        let err = h.fetcher.fetch_repository(REPO_URL, 10).await.unwrap_err();
        assert_eq!(err, FetchError::InvalidCredential);

        let cache = h.fetcher.cache();
        assert!(cache.get(&repository_key(&h.repo, 10)).is_none());
        for path in ["a.py", "b.py", "c.py"] {
            assert!(cache.get(&file_key(&h.repo, path)).is_none(), "{path} was cached");
        }
    }

    #[tokio::test]
    async fn test_binary_file_is_left_out() {
        let h = Harness::new();
        let paths = py_files(10);
        let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
        h.serve_repository(&refs);
        h.transport.replace_json(h.contents_url(&paths[3]), contents_body(&[0xc3, 0x28, 0xa0, 0xa1]));

        let snapshot = h.fetcher.fetch_repository(REPO_URL, 10).await.unwrap();
        assert_eq!(snapshot.sampled_count, 10);
        assert_eq!(snapshot.files.len(), 9);
        assert!(!snapshot.files.contains_key(&paths[3]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_writes_nothing_to_cache() {
        let h = Harness::with_transport(ScriptedTransport::with_latency(Duration::from_secs(1)));
        h.serve_repository(&["a.py", "b.py"]);

        // Metadata and tree take 2s; cancel in the middle of the content batch
        let cancel = tokio::time::sleep(Duration::from_millis(2500));
        let err = h.fetcher.fetch_repository_until(REPO_URL, 10, cancel).await.unwrap_err();
        assert_eq!(err, FetchError::Cancelled);

        let cache = h.fetcher.cache();
        assert!(cache.get(&tree_key(&h.repo)).is_some());
        assert!(cache.get(&file_key(&h.repo, "a.py")).is_none());
        assert!(cache.get(&repository_key(&h.repo, 10)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_uncancelled_fetch_completes() {
        let h = Harness::with_transport(ScriptedTransport::with_latency(Duration::from_millis(10)));
        h.serve_repository(&["a.py"]);

        let cancel = tokio::time::sleep(Duration::from_secs(60));
        let snapshot = h.fetcher.fetch_repository_until(REPO_URL, 10, cancel).await.unwrap();
        assert_eq!(snapshot.files.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_plan_can_be_cancelled() {
        let h = Harness::with_transport(ScriptedTransport::with_latency(Duration::from_secs(1)));
        h.serve_repository(&["a.py"]);

        // Cancel while the tree request is still in flight
        let cancel = tokio::time::sleep(Duration::from_millis(1500));
        let err = h.fetcher.plan_until(REPO_URL, 10, cancel).await.unwrap_err();
        assert_eq!(err, FetchError::Cancelled);
        assert!(h.fetcher.cache().get(&tree_key(&h.repo)).is_none());
    }

    #[tokio::test]
    async fn test_plan_until_returns_the_plan() {
        let h = Harness::new();
        h.serve_repository(&["a.py", "b.md"]);

        let plan = h.fetcher.plan_until(REPO_URL, 10, std::future::pending()).await.unwrap();
        assert_eq!(plan.sampled.len(), 2);
    }

    #[tokio::test]
    async fn test_plan_skips_content_requests() {
        let h = Harness::new();
        h.serve_repository(&["a.py", "b.js", "c.md", "d.png"]);

        let plan = h.fetcher.plan(REPO_URL, 2).await.unwrap();
        assert_eq!(plan.branch, "main");
        assert_eq!(plan.total_count, 4);
        assert_eq!(
            plan.sampled.iter().map(|e| e.path.as_str()).collect::<Vec<_>>(),
            vec!["a.py", "b.js"]
        );
        assert_eq!(h.transport.total_calls(), 2);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = FetchConfig { concurrency: 0, ..FetchConfig::default() };
        let result = RepoFetcher::new(
            &config,
            Arc::new(ScriptedTransport::new()),
            Arc::new(FetchCache::new(10)),
            Arc::new(RateLimiter::new(10, Duration::from_secs(60))),
        );
        assert!(matches!(result, Err(FetchError::Config(_))));
    }
}
