// src/lib.rs
// =============================================================================
// repo-sampler: fetch a bounded, representative sample of a GitHub
// repository's files without running out of API quota.
//
// Modules:
// - config:   settings (defaults, TOML file)
// - error:    the FetchError type every layer returns
// - cache:    the shared TTL cache
// - stats:    API call and cache hit counters
// - github:   REST API client, rate limiting, tree and contents fetching
// - sample:   relevance filtering and stratified sampling
// - pipeline: RepoFetcher, which runs all of the above for one repository
// =============================================================================

pub mod cache;
pub mod config;
pub mod error;
pub mod github;
pub mod pipeline;
pub mod sample;
pub mod stats;

pub use config::FetchConfig;
pub use error::{FetchError, Result};
pub use pipeline::{RepoFetcher, RepositorySnapshot, SamplePlan};
pub use stats::StatsSnapshot;
