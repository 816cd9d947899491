// src/stats.rs
// =============================================================================
// Counters for how much work the fetcher actually did.
//
// api_calls counts every request handed to the transport (retries included);
// cache_hits counts every lookup answered by the cache. Both are atomics so
// concurrent file fetches can bump them without a lock.
// =============================================================================

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct FetchStats {
    api_calls: AtomicU64,
    cache_hits: AtomicU64,
}

/// A point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub api_calls: u64,
    pub cache_hits: u64,
    /// cache_hits / (api_calls + cache_hits), 0.0 when nothing happened
    pub cache_hit_rate: f64,
}

impl FetchStats {
    pub fn record_api_call(&self) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let api_calls = self.api_calls.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let total = api_calls + cache_hits;
        let cache_hit_rate = if total == 0 { 0.0 } else { cache_hits as f64 / total as f64 };

        StatsSnapshot { api_calls, cache_hits, cache_hit_rate }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = FetchStats::default();
        assert_eq!(stats.snapshot().cache_hit_rate, 0.0);

        stats.record_api_call();
        stats.record_cache_hit();
        stats.record_cache_hit();
        stats.record_cache_hit();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.api_calls, 1);
        assert_eq!(snapshot.cache_hits, 3);
        assert!((snapshot.cache_hit_rate - 0.75).abs() < f64::EPSILON);
    }
}
