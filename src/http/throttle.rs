// src/http/throttle.rs

//! Fixed minimum spacing between consecutive requests.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{ApiRequest, ApiResponse, Middleware, Next};
use crate::error::Result;

pub struct Throttle {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Wait out the remainder of the interval, then stamp this request.
    async fn wait_turn(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait]
impl Middleware for Throttle {
    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse> {
        if !self.min_interval.is_zero() {
            self.wait_turn().await;
        }
        next.run(request).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::http::HttpClient;
    use crate::http::testing::{MockTransport, json_response};
    use reqwest::Method;
    use serde_json::json;

    const URL: &str = "https://api/x";

    #[tokio::test(start_paused = true)]
    async fn spaces_consecutive_calls() {
        let mock = Arc::new(MockTransport::new());
        mock.on(Method::GET, URL, json_response(200, json!({})));
        let client = HttpClient::builder(mock.clone())
            .with(Throttle::new(Duration::from_secs(1)))
            .build();

        let started = Instant::now();
        client.get_json(URL).await.unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);

        client.get_json(URL).await.unwrap();
        client.get_json(URL).await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn no_sleep_when_interval_already_elapsed() {
        let mock = Arc::new(MockTransport::new());
        mock.on(Method::GET, URL, json_response(200, json!({})));
        let client = HttpClient::builder(mock.clone())
            .with(Throttle::new(Duration::from_secs(1)))
            .build();

        client.get_json(URL).await.unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;

        let before = Instant::now();
        client.get_json(URL).await.unwrap();
        assert_eq!(before.elapsed(), Duration::ZERO);
    }
}
