// src/http/rate_limit.rs

//! Recovery from "429 Too Many Requests".

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};

use super::{ApiRequest, ApiResponse, Middleware, Next};
use crate::error::Result;

/// Sleeps `Retry-After + 1` seconds (at least 1) on a 429 and retries once.
///
/// The second response is returned whatever its status.
pub struct RateLimitRecovery;

/// `Retry-After` as whole seconds. HTTP-date values are not honored.
pub fn retry_after_secs(headers: &HeaderMap) -> Option<i64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Delay before the single retry.
pub fn recovery_delay(retry_after: i64) -> Duration {
    let secs = retry_after.saturating_add(1).max(1);
    Duration::from_secs(u64::try_from(secs).unwrap_or(1))
}

#[async_trait]
impl Middleware for RateLimitRecovery {
    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse> {
        let response = next.run(request.clone()).await?;
        if response.status != StatusCode::TOO_MANY_REQUESTS {
            return Ok(response);
        }
        let Some(retry_after) = retry_after_secs(&response.headers) else {
            return Ok(response);
        };

        let delay = recovery_delay(retry_after);
        log::warn!(
            "Rate limited on {}; retrying once in {}s",
            request.url,
            delay.as_secs()
        );
        tokio::time::sleep(delay).await;
        next.run(request).await
    }
}
