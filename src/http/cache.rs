// src/http/cache.rs

//! GET response cache keyed by a hash of the request URL.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use sha2::{Digest, Sha256};
use tokio::time::Instant;

use super::{ApiRequest, ApiResponse, Middleware, Next};
use crate::error::Result;

struct CacheEntry {
    response: ApiResponse,
    expires_at: Instant,
}

/// Outermost interceptor; a hit never reaches the throttle.
pub struct CacheMiddleware {
    default_ttl_secs: u64,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl CacheMiddleware {
    pub fn new(default_ttl_secs: u64) -> Self {
        Self {
            default_ttl_secs,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Hex SHA-256 of the full URL.
    pub fn fingerprint(url: &str) -> String {
        hex::encode(Sha256::digest(url.as_bytes()))
    }

    /// Effective TTL for a request, `None` when it must not be cached.
    fn ttl_for(&self, request: &ApiRequest) -> Option<Duration> {
        if request.method != Method::GET {
            return None;
        }
        let ttl = request
            .options
            .cache_ttl
            .unwrap_or_else(|| i64::try_from(self.default_ttl_secs).unwrap_or(i64::MAX));
        u64::try_from(ttl)
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    fn lookup(&self, key: &str) -> Option<ApiResponse> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.response.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn store(&self, key: String, response: &ApiResponse, ttl: Duration) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key,
                CacheEntry {
                    response: response.clone(),
                    expires_at: Instant::now() + ttl,
                },
            );
        }
    }
}

#[async_trait]
impl Middleware for CacheMiddleware {
    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse> {
        let Some(ttl) = self.ttl_for(&request) else {
            return next.run(request).await;
        };

        let key = Self::fingerprint(&request.url);
        if let Some(hit) = self.lookup(&key) {
            log::debug!("Cache hit for {}", request.url);
            return Ok(hit);
        }

        let response = next.run(request).await?;
        if response.is_success() {
            self.store(key, &response, ttl);
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::http::testing::{MockTransport, json_response};
    use crate::http::{CACHE_DISABLED, HttpClient};
    use serde_json::json;

    const URL: &str = "https://api/kb?page=1";

    fn client(mock: &Arc<MockTransport>, ttl: u64) -> HttpClient {
        HttpClient::builder(mock.clone())
            .with(CacheMiddleware::new(ttl))
            .build()
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_get_within_ttl_hits_transport_once() {
        let mock = Arc::new(MockTransport::new());
        mock.on(Method::GET, URL, json_response(200, json!({"n": 1})));
        let client = client(&mock, 60);

        let first = client.get_json(URL).await.unwrap();
        let second = client.get_json(URL).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(mock.call_count(), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        client.get_json(URL).await.unwrap();
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn sentinel_ttl_disables_caching() {
        let mock = Arc::new(MockTransport::new());
        mock.on(Method::GET, URL, json_response(200, json!({})));
        let client = client(&mock, 60);

        for _ in 0..2 {
            client
                .send(ApiRequest::get(URL).with_cache_ttl(CACHE_DISABLED))
                .await
                .unwrap();
        }
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn only_get_is_cached() {
        let mock = Arc::new(MockTransport::new());
        mock.on(Method::POST, URL, json_response(201, json!({})));
        let client = client(&mock, 60);

        for _ in 0..2 {
            client.send(ApiRequest::post(URL, json!({}))).await.unwrap();
        }
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let mock = Arc::new(MockTransport::new());
        mock.on(Method::GET, URL, json_response(500, json!({})));
        let client = client(&mock, 60);

        for _ in 0..2 {
            let _ = client.execute(ApiRequest::get(URL)).await.unwrap();
        }
        assert_eq!(mock.call_count(), 2);
    }

    #[test]
    fn fingerprint_is_stable_hex() {
        let a = CacheMiddleware::fingerprint(URL);
        assert_eq!(a.len(), 64);
        assert_eq!(a, CacheMiddleware::fingerprint(URL));
        assert_ne!(a, CacheMiddleware::fingerprint("https://api/kb?page=2"));
    }
}
