// src/config.rs
// =============================================================================
// Settings for the fetch pipeline.
//
// Sources, lowest priority first:
// 1. Built-in defaults (FetchConfig::default)
// 2. An optional TOML file (--config repo-sampler.toml)
// 3. Command-line flags and their environment variables
//    (GITHUB_TOKEN, MAX_FILES_TO_FETCH, BATCH_SIZE, CACHE_TTL)
//
// Layers 1 and 2 live here; main.rs applies layer 3 on top.
// =============================================================================

use crate::error::{FetchError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Everything the fetcher needs to know, with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// GitHub token; without one the API allows 60 requests per hour
    pub token: Option<String>,
    /// REST API root (GitHub Enterprise: https://host/api/v3)
    pub api_base: String,
    /// Upper bound on files fetched per repository
    pub max_files: usize,
    /// Simultaneous content requests
    pub concurrency: usize,
    pub cache_ttl_secs: u64,
    /// Entries the shared cache keeps before evicting the oldest
    pub cache_capacity: usize,
    /// Wait for the quota reset once fewer requests than this remain
    pub low_water_mark: u64,
    /// Longest wait accepted on an exhausted quota
    pub max_rate_limit_wait_secs: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub request_timeout_secs: u64,
    /// Branches tried when the default branch has no usable tree
    pub fallback_branches: Vec<String>,
    /// Extensions considered relevant on top of the built-in list
    pub extra_extensions: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: "https://api.github.com".to_string(),
            max_files: 20,
            concurrency: 5,
            cache_ttl_secs: 300,
            cache_capacity: 100,
            low_water_mark: 10,
            max_rate_limit_wait_secs: 3600,
            max_retries: 3,
            backoff_base_ms: 1000,
            request_timeout_secs: 30,
            fallback_branches: vec!["main".to_string(), "master".to_string()],
            extra_extensions: Vec::new(),
        }
    }
}

impl FetchConfig {
    /// Reads a TOML file; keys that are left out keep their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FetchError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
            .map_err(|e| FetchError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| FetchError::Config(e.to_string()))
    }

    /// Rejects settings the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_files == 0 {
            return Err(FetchError::Config("max_files must be at least 1".into()));
        }
        if self.concurrency == 0 {
            return Err(FetchError::Config("concurrency must be at least 1".into()));
        }
        if self.cache_capacity == 0 {
            return Err(FetchError::Config("cache_capacity must be at least 1".into()));
        }
        if self.token.as_deref().is_some_and(|token| token.trim().is_empty()) {
            return Err(FetchError::Config("token is empty".into()));
        }
        self.api_base_url()?;
        Ok(())
    }

    pub fn api_base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.api_base)
            .map_err(|e| FetchError::Config(format!("invalid api_base '{}': {}", self.api_base, e)))?;
        if url.cannot_be_a_base() {
            return Err(FetchError::Config(format!("invalid api_base '{}'", self.api_base)));
        }
        Ok(url)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn max_rate_limit_wait(&self) -> Duration {
        Duration::from_secs(self.max_rate_limit_wait_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
