// src/github/testing.rs
// =============================================================================
// In-memory Transport for tests.
//
// Each URL gets a queue of scripted replies. Replies are consumed in order,
// except the last one, which repeats forever. Unknown URLs answer 404.
// replace() swaps a URL's whole queue for a single reply.
// An optional latency makes every request sleep first, which lets tests
// observe concurrency and cancellation (use a paused tokio clock).
// =============================================================================

use crate::github::client::{NetworkError, RawResponse, Transport};
use async_trait::async_trait;
use base64::Engine;
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type Reply = Result<RawResponse, NetworkError>;

#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<String>>,
    latency: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self { latency, ..Self::default() }
    }

    pub fn respond(&self, url: impl Into<String>, response: RawResponse) {
        self.push(url.into(), Ok(response));
    }

    pub fn respond_json(&self, url: impl Into<String>, json: serde_json::Value) {
        self.respond(url, RawResponse::new(200, json.to_string()));
    }

    /// Throws away every reply scripted so far for `url` and answers with `response`.
    pub fn replace(&self, url: impl Into<String>, response: RawResponse) {
        self.replies.lock().insert(url.into(), VecDeque::from([Ok(response)]));
    }

    pub fn replace_json(&self, url: impl Into<String>, json: serde_json::Value) {
        self.replace(url, RawResponse::new(200, json.to_string()));
    }

    pub fn fail(&self, url: impl Into<String>, message: &str) {
        self.push(url.into(), Err(NetworkError(message.to_string())));
    }

    fn push(&self, url: String, reply: Reply) {
        self.replies.lock().entry(url).or_default().push_back(reply);
    }

    /// Total requests seen so far.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|called| called.as_str() == url).count()
    }

    /// Most requests that were ever waiting on the latency at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn reply_for(&self, url: &str) -> Reply {
        let mut replies = self.replies.lock();
        match replies.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(not_found),
            Some(queue) => queue.front().cloned().unwrap_or_else(not_found),
            None => not_found(),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, NetworkError> {
        self.calls.lock().push(url.to_string());

        if !self.latency.is_zero() {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.latency).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        self.reply_for(url)
    }
}

fn not_found() -> Reply {
    Ok(RawResponse::new(404, r#"{"message":"Not Found"}"#))
}

pub fn quota_headers(remaining: u64, reset_at: u64) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(reset_at));
    headers
}

/// A contents API body for `bytes`, wrapped at 60 columns like GitHub does.
pub fn contents_body(bytes: &[u8]) -> serde_json::Value {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    let wrapped = encoded
        .as_bytes()
        .chunks(60)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\n");

    serde_json::json!({ "type": "file", "encoding": "base64", "content": wrapped })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_are_consumed_in_order_and_last_repeats() {
        let transport = ScriptedTransport::new();
        transport.respond("u", RawResponse::new(500, ""));
        transport.respond("u", RawResponse::new(200, "ok"));

        assert_eq!(transport.get("u").await.unwrap().status, 500);
        assert_eq!(transport.get("u").await.unwrap().status, 200);
        assert_eq!(transport.get("u").await.unwrap().status, 200);
        assert_eq!(transport.get("other").await.unwrap().status, 404);
    }

    #[tokio::test]
    async fn test_replace_discards_earlier_replies() {
        let transport = ScriptedTransport::new();
        transport.respond("u", RawResponse::new(200, "first"));
        transport.respond("u", RawResponse::new(200, "second"));
        transport.replace("u", RawResponse::new(401, "Bad credentials"));

        assert_eq!(transport.get("u").await.unwrap().status, 401);
        assert_eq!(transport.get("u").await.unwrap().status, 401);
    }
}
