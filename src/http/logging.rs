// src/http/logging.rs

//! Request/response logging interceptor.

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::Instant;

use super::{ApiRequest, ApiResponse, Middleware, Next};
use crate::error::Result;

/// Logs method, URL, start time and outcome unless the request opts out.
pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse> {
        if request.options.disable_logging {
            return next.run(request).await;
        }

        let method = request.method.clone();
        let url = request.url.clone();
        let started = Instant::now();
        log::debug!("{} {} (started {})", method, url, Utc::now().format("%H:%M:%S%.3f"));

        let result = next.run(request).await;
        let elapsed = started.elapsed().as_millis();
        match &result {
            Ok(response) => log::debug!(
                "{} {} -> {} ({} ms)",
                method,
                url,
                response.status.as_u16(),
                elapsed
            ),
            Err(error) => log::warn!("{} {} failed after {} ms: {}", method, url, elapsed, error),
        }
        result
    }
}
