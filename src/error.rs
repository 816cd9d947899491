// src/error.rs
// =============================================================================
// Error types for the fetch pipeline.
//
// Two families live in one enum:
// - Operation-level errors (bad URL, bad token, no usable tree, cancelled)
//   stop the whole fetch and reach the caller.
// - Per-item errors (404, quota, transient, decode) only drop one file from
//   the result map.
//
// The binary wraps these in anyhow::Error; the library keeps them typed so
// callers can match on them.
// =============================================================================

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, FetchError>;

/// Everything that can go wrong while resolving, sampling, or fetching.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The repository URL could not be parsed into owner/name.
    #[error("invalid repository URL '{0}'")]
    InvalidUrl(String),

    /// The API rejected the token (HTTP 401).
    #[error("invalid or expired GitHub token")]
    InvalidCredential,

    /// The resource does not exist (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Quota exhausted and the reset time is too far away or unknown.
    #[error("API rate limit exceeded{}", reset_hint(.retry_after_secs))]
    QuotaExceeded { retry_after_secs: Option<u64> },

    /// 5xx or network failure that survived every retry.
    #[error("transient failure after retries: {0}")]
    Transient(String),

    /// Any other non-success status.
    #[error("request to {url} failed with HTTP {status}")]
    RequestFailed { status: u16, url: String },

    /// No candidate branch produced a usable tree.
    #[error("could not fetch a file tree for {0}")]
    TreeUnavailable(String),

    /// File content is not valid base64 or not UTF-8 text.
    #[error("could not decode {0}")]
    Decode(String),

    /// A response body did not have the expected shape.
    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },

    /// The caller cancelled the operation or it timed out.
    #[error("operation cancelled")]
    Cancelled,

    /// Invalid configuration or HTTP client setup.
    #[error("configuration error: {0}")]
    Config(String),
}

fn reset_hint(retry_after_secs: &Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!(" (resets in {}s)", secs),
        None => String::new(),
    }
}

impl FetchError {
    /// True for errors that end the whole operation rather than one file.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FetchError::InvalidUrl(_)
                | FetchError::InvalidCredential
                | FetchError::TreeUnavailable(_)
                | FetchError::Cancelled
                | FetchError::Config(_)
        )
    }

    /// True for errors that must abort an in-progress content batch.
    ///
    /// A bad credential means no later request can succeed either, so the
    /// remaining work is thrown away.
    pub fn aborts_batch(&self) -> bool {
        matches!(self, FetchError::InvalidCredential | FetchError::Cancelled)
    }
}
