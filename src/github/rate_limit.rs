// src/github/rate_limit.rs
// =============================================================================
// Tracks the GitHub API quota and decides when a request has to wait.
//
// GitHub reports the quota on every response:
//   x-ratelimit-remaining: requests left in the current window
//   x-ratelimit-reset:     when the window resets (unix epoch seconds)
//
// The server's numbers always win: after every response we overwrite our
// state with whatever the headers say. Missing headers mean "unknown", and
// unknown falls back to the optimistic defaults.
//
// The state is shared by every concurrent fetch, so it lives behind a mutex
// and is always replaced as a whole struct (no half-updated reads).
// =============================================================================

use crate::error::FetchError;
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use serde::Serialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Remaining count assumed before the first response (GitHub's hourly quota)
pub const OPTIMISTIC_REMAINING: u64 = 5000;

const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";

/// Last known quota, as reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitState {
    pub remaining: u64,
    /// Unix epoch seconds; 0 means unknown
    pub reset_at: u64,
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self { remaining: OPTIMISTIC_REMAINING, reset_at: 0 }
    }
}

impl RateLimitState {
    /// Reads the quota headers, defaulting each missing or garbled one.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
        };

        let defaults = Self::default();
        Self {
            remaining: read(REMAINING_HEADER).unwrap_or(defaults.remaining),
            reset_at: read(RESET_HEADER).unwrap_or(defaults.reset_at),
        }
    }

    /// Seconds until reset (negative once the reset time has passed).
    fn seconds_until_reset(&self, now: f64) -> Option<f64> {
        if self.reset_at == 0 {
            return None;
        }
        Some(self.reset_at as f64 - now)
    }
}

/// Shared quota tracker consulted before and after each request.
#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<RateLimitState>,
    low_water_mark: u64,
    max_wait: Duration,
}

impl RateLimiter {
    /// `low_water_mark`: below this many remaining requests we wait for reset.
    /// `max_wait`: the longest we are willing to sleep on an exhausted quota.
    pub fn new(low_water_mark: u64, max_wait: Duration) -> Self {
        Self {
            state: Mutex::new(RateLimitState::default()),
            low_water_mark,
            max_wait,
        }
    }

    pub fn snapshot(&self) -> RateLimitState {
        *self.state.lock()
    }

    /// Replaces the whole state (last writer wins).
    pub fn record(&self, state: RateLimitState) {
        *self.state.lock() = state;
    }

    /// Updates the state from a response's headers.
    pub fn observe(&self, headers: &HeaderMap) {
        let state = RateLimitState::from_headers(headers);
        debug!(remaining = state.remaining, reset_at = state.reset_at, "rate limit updated");
        self.record(state);
    }

    /// How long the next request should wait, if the quota is running low.
    pub fn pending_wait(&self) -> Option<Duration> {
        let state = self.snapshot();
        if state.remaining >= self.low_water_mark {
            return None;
        }

        match state.seconds_until_reset(now_epoch_secs()) {
            Some(secs) if secs > 0.0 => Some(Duration::from_secs_f64(secs)),
            _ => None,
        }
    }

    /// Suspends the caller until the reset time when the quota is low.
    pub async fn wait_if_needed(&self) {
        if let Some(wait) = self.pending_wait() {
            warn!(
                remaining = self.snapshot().remaining,
                "rate limit low, waiting {:.0}s for reset",
                wait.as_secs_f64()
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Decides what to do after the API reported an exhausted quota.
    ///
    /// Returns the delay before a single retry, or QuotaExceeded when the
    /// reset time is unknown or further away than `max_wait`. A reset time
    /// that already passed gives a zero delay.
    pub fn quota_wait(&self) -> Result<Duration, FetchError> {
        let state = self.snapshot();
        let Some(secs) = state.seconds_until_reset(now_epoch_secs()) else {
            return Err(FetchError::QuotaExceeded { retry_after_secs: None });
        };

        let wait = Duration::from_secs_f64(secs.max(0.0));
        if wait >= self.max_wait {
            return Err(FetchError::QuotaExceeded {
                retry_after_secs: Some(wait.as_secs()),
            });
        }

        Ok(wait)
    }

    pub fn low_water_mark(&self) -> u64 {
        self.low_water_mark
    }
}

/// Current wall-clock time as fractional unix seconds.
pub(crate) fn now_epoch_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(remaining: Option<&str>, reset: Option<&str>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(value) = remaining {
            map.insert(REMAINING_HEADER, HeaderValue::from_str(value).unwrap());
        }
        if let Some(value) = reset {
            map.insert(RESET_HEADER, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn epoch_in(secs: u64) -> u64 {
        now_epoch_secs() as u64 + secs
    }

    #[test]
    fn test_missing_headers_fall_back_to_optimistic_defaults() {
        let state = RateLimitState::from_headers(&HeaderMap::new());
        assert_eq!(state, RateLimitState::default());

        let state = RateLimitState::from_headers(&headers(Some("not-a-number"), Some("42")));
        assert_eq!(state.remaining, OPTIMISTIC_REMAINING);
        assert_eq!(state.reset_at, 42);
    }

    #[test]
    fn test_headers_overwrite_state() {
        let limiter = RateLimiter::new(10, Duration::from_secs(3600));
        limiter.observe(&headers(Some("3"), Some("1700000000")));
        assert_eq!(limiter.snapshot(), RateLimitState { remaining: 3, reset_at: 1_700_000_000 });

        // A later response with a fresh window replaces the low count
        limiter.observe(&headers(Some("4999"), Some("1700003600")));
        assert_eq!(limiter.snapshot().remaining, 4999);
    }

    #[test]
    fn test_no_wait_above_low_water_mark() {
        let limiter = RateLimiter::new(10, Duration::from_secs(3600));
        limiter.record(RateLimitState { remaining: 10, reset_at: epoch_in(60) });
        assert_eq!(limiter.pending_wait(), None);
    }

    #[test]
    fn test_no_wait_when_reset_already_passed() {
        let limiter = RateLimiter::new(10, Duration::from_secs(3600));
        limiter.record(RateLimitState { remaining: 0, reset_at: 1 });
        assert_eq!(limiter.pending_wait(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_low_quota_suspends_until_reset() {
        let limiter = RateLimiter::new(10, Duration::from_secs(3600));
        limiter.record(RateLimitState { remaining: 5, reset_at: epoch_in(30) });

        let started = tokio::time::Instant::now();
        limiter.wait_if_needed().await;
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(28), "waited {waited:?}");
        assert!(waited <= Duration::from_secs(31), "waited {waited:?}");

        // After the reset the next response's header is authoritative
        limiter.observe(&headers(Some("5000"), Some(&epoch_in(3600).to_string())));
        assert_eq!(limiter.snapshot().remaining, 5000);
        assert_eq!(limiter.pending_wait(), None);
    }

    #[test]
    fn test_quota_wait_within_ceiling() {
        let limiter = RateLimiter::new(10, Duration::from_secs(3600));
        limiter.record(RateLimitState { remaining: 0, reset_at: epoch_in(120) });
        let wait = limiter.quota_wait().unwrap();
        assert!(wait <= Duration::from_secs(120));
        assert!(wait >= Duration::from_secs(118));
    }

    #[test]
    fn test_quota_wait_beyond_ceiling_fails() {
        let limiter = RateLimiter::new(10, Duration::from_secs(3600));
        limiter.record(RateLimitState { remaining: 0, reset_at: epoch_in(7200) });
        assert!(matches!(
            limiter.quota_wait(),
            Err(FetchError::QuotaExceeded { retry_after_secs: Some(_) })
        ));
    }

    #[test]
    fn test_quota_wait_unknown_reset_fails() {
        let limiter = RateLimiter::new(10, Duration::from_secs(3600));
        limiter.record(RateLimitState { remaining: 0, reset_at: 0 });
        assert_eq!(
            limiter.quota_wait(),
            Err(FetchError::QuotaExceeded { retry_after_secs: None })
        );
    }

    #[test]
    fn test_quota_wait_past_reset_is_immediate() {
        let limiter = RateLimiter::new(10, Duration::from_secs(3600));
        limiter.record(RateLimitState { remaining: 0, reset_at: 1 });
        assert_eq!(limiter.quota_wait(), Ok(Duration::ZERO));
    }
}
