// src/http/mod.rs

//! HTTP plumbing: request/response types, the interceptor chain, and
//! the transports that terminate it.
//!
//! A chain is an ordered list of [`Middleware`] followed by one
//! [`Transport`]. Each middleware receives the request and a [`Next`]
//! handle for the rest of the chain; it may short-circuit, rewrite the
//! request or response, or call `next` more than once.
//!
//! The standard chain, outer to inner:
//!
//! ```text
//! Cache → Logging → RateLimitRecovery → Throttle → AuthBypass → Transport
//! ```

pub mod auth;
pub mod cache;
pub mod logging;
pub mod pagination;
pub mod rate_limit;
pub mod throttle;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::error::{AppError, FieldError, Result};
use crate::models::HttpConfig;

pub use auth::AuthBypass;
pub use cache::CacheMiddleware;
pub use logging::LoggingMiddleware;
pub use pagination::{Page, Paginator, parse_link_header};
pub use rate_limit::RateLimitRecovery;
pub use throttle::Throttle;
pub use transport::{ReqwestTransport, Transport};

/// Request-level TTL sentinel that disables caching for one call.
pub const CACHE_DISABLED: i64 = -1;

/// Per-request knobs read by interceptors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Cache lifetime in seconds; `None` uses the interceptor default
    pub cache_ttl: Option<i64>,
    pub disable_logging: bool,
}

/// An outgoing request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
    pub options: RequestOptions,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            options: RequestOptions::default(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, url).with_body(body)
    }

    pub fn patch(url: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PATCH, url).with_body(body)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_cache_ttl(mut self, seconds: i64) -> Self {
        self.options.cache_ttl = Some(seconds);
        self
    }

    /// Bypass the response cache for this call.
    pub fn no_cache(self) -> Self {
        self.with_cache_ttl(CACHE_DISABLED)
    }

    pub fn without_logging(mut self) -> Self {
        self.options.disable_logging = true;
        self
    }
}

/// A received response with its body decoded as JSON where possible.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Map non-success statuses onto the error taxonomy.
    pub fn error_for_status(self, url: &str) -> Result<Self> {
        let status = self.status;
        if status.is_success() {
            return Ok(self);
        }

        let message = self
            .body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());

        let fields = field_errors(&self.body);
        Err(match status.as_u16() {
            404 => AppError::NotFound {
                url: url.to_string(),
            },
            429 => AppError::RateLimited {
                url: url.to_string(),
                retry_after: rate_limit::retry_after_secs(&self.headers)
                    .and_then(|s| u64::try_from(s).ok()),
            },
            // 401, 403 and other bare 4xx fall through to `Http`
            code @ (400 | 422) => AppError::Validation {
                status: code,
                message,
                fields,
            },
            code @ 400..=499 if !fields.is_empty() => AppError::Validation {
                status: code,
                message,
                fields,
            },
            500..=599 => AppError::Server {
                status: status.as_u16(),
                message,
            },
            code => AppError::Http {
                status: code,
                message,
            },
        })
    }
}

fn field_errors(body: &Value) -> Vec<FieldError> {
    body.get("errors")
        .cloned()
        .and_then(|errors| serde_json::from_value(errors).ok())
        .unwrap_or_default()
}

/// One interceptor in the chain.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse>;
}

/// The remainder of the chain after the current interceptor.
///
/// `Next` is `Copy`, so an interceptor may run it more than once.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    pub async fn run(self, request: ApiRequest) -> Result<ApiResponse> {
        match self.middlewares.split_first() {
            Some((current, rest)) => {
                let next = Next {
                    middlewares: rest,
                    transport: self.transport,
                };
                current.handle(request, next).await
            }
            None => self.transport.send(&request).await,
        }
    }
}

/// A composed request executor.
#[derive(Clone)]
pub struct HttpClient {
    middlewares: Vec<Arc<dyn Middleware>>,
    transport: Arc<dyn Transport>,
}

impl HttpClient {
    pub fn builder(transport: Arc<dyn Transport>) -> HttpClientBuilder {
        HttpClientBuilder {
            middlewares: Vec::new(),
            transport,
        }
    }

    /// The standard chain: cache, logging, rate-limit recovery, throttle,
    /// and (when given) the auth-bypass injector.
    pub fn standard(
        transport: Arc<dyn Transport>,
        config: &HttpConfig,
        bypass: Option<AuthBypass>,
    ) -> Self {
        let mut builder = Self::builder(transport)
            .with(CacheMiddleware::new(config.cache_ttl_secs))
            .with(LoggingMiddleware)
            .with(RateLimitRecovery)
            .with(Throttle::new(Duration::from_millis(config.min_interval_ms)));
        if let Some(bypass) = bypass {
            builder = builder.with(bypass);
        }
        builder.build()
    }

    /// Run the request through the chain, returning whatever status came back.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let next = Next {
            middlewares: &self.middlewares,
            transport: self.transport.as_ref(),
        };
        next.run(request).await
    }

    /// Run the request and map non-success statuses to errors.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = request.url.clone();
        self.execute(request).await?.error_for_status(&url)
    }

    pub async fn get_json(&self, url: &str) -> Result<Value> {
        Ok(self.send(ApiRequest::get(url)).await?.body)
    }
}

pub struct HttpClientBuilder {
    middlewares: Vec<Arc<dyn Middleware>>,
    transport: Arc<dyn Transport>,
}

impl HttpClientBuilder {
    /// Append an interceptor; earlier calls sit further out.
    pub fn with(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn build(self) -> HttpClient {
        HttpClient {
            middlewares: self.middlewares,
            transport: self.transport,
        }
    }
}
