// src/http/transport.rs

//! The innermost link of every chain.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::Value;

use super::{ApiRequest, ApiResponse};
use crate::error::Result;
use crate::models::HttpConfig;

/// Sends one request over the wire.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

/// reqwest-backed transport.
pub struct ReqwestTransport {
    client: reqwest::Client,
    basic_auth: Option<(String, Option<String>)>,
}

impl ReqwestTransport {
    /// Create a configured asynchronous HTTP transport.
    ///
    /// `default_headers` ride on every request (API credentials).
    pub fn new(config: &HttpConfig, default_headers: HeaderMap) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()?;
        Ok(Self {
            client,
            basic_auth: None,
        })
    }

    /// Send HTTP basic credentials with every request.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.basic_auth = Some((username.into(), password));
        self
    }

    fn request(&self, request: &ApiRequest) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone());
        if let Some((username, password)) = &self.basic_auth {
            builder = builder.basic_auth(username, password.as_ref());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        builder
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let response = self.request(request).send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await?;

        Ok(ApiResponse {
            status,
            headers,
            body: decode_body(text),
        })
    }
}

/// JSON when it parses, the raw text otherwise, `Null` when empty.
fn decode_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_json_text_and_empty_bodies() {
        assert_eq!(decode_body(r#"{"a":1}"#.into()), json!({"a": 1}));
        assert_eq!(decode_body("  ".into()), Value::Null);
        assert_eq!(decode_body("<html>".into()), json!("<html>"));
    }

    #[test]
    fn builds_with_default_config() {
        assert!(ReqwestTransport::new(&HttpConfig::default(), HeaderMap::new()).is_ok());
    }

    #[test]
    fn basic_auth_rides_on_every_request() {
        let transport = ReqwestTransport::new(&HttpConfig::default(), HeaderMap::new())
            .unwrap()
            .with_basic_auth("agent@acme.test/token", Some("abc".into()));
        let request = transport
            .request(&ApiRequest::get("https://acme.zendesk.com/api/v2/x.json"))
            .build()
            .unwrap();

        assert_eq!(
            request.headers()[reqwest::header::AUTHORIZATION],
            "Basic YWdlbnRAYWNtZS50ZXN0L3Rva2VuOmFiYw=="
        );
    }
}
