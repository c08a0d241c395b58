// src/destination/api.rs

//! Thin client over the destination's knowledge-base REST surface.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::http::{ApiRequest, AuthBypass, HttpClient, ReqwestTransport};
use crate::models::{EntityKind, HttpConfig, SmartId, VanillaDestinationConfig};

#[derive(Clone)]
pub struct DestinationApi {
    http: HttpClient,
    base_url: String,
}

impl DestinationApi {
    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build the standard chain over a reqwest transport carrying the token.
    pub fn from_config(config: &VanillaDestinationConfig, http_config: &HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| AppError::config(format!("invalid destination token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        let transport = Arc::new(ReqwestTransport::new(http_config, headers)?);
        let bypass = config
            .bypass
            .as_ref()
            .map(AuthBypass::from_config)
            .transpose()?;

        Ok(Self::new(
            HttpClient::standard(transport, http_config, bypass),
            &config.base_url,
        ))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Look an entity up by smart-ID. Articles are looked up via `/edit`.
    pub async fn lookup(&self, kind: EntityKind, id: &SmartId) -> Result<Value> {
        let path = match kind {
            EntityKind::Article => format!("{}/{}/edit", kind.resource(), id.path_segment()),
            _ => format!("{}/{}", kind.resource(), id.path_segment()),
        };
        self.get_uncached(&path).await
    }

    /// Fetch an entity by its numeric destination ID.
    pub async fn get(&self, kind: EntityKind, id: i64) -> Result<Value> {
        self.get_uncached(&format!("{}/{}", kind.resource(), id))
            .await
    }

    pub async fn create(&self, kind: EntityKind, body: &Value) -> Result<Value> {
        let request = ApiRequest::post(self.url(kind.resource()), body.clone());
        Ok(self.http.send(request).await?.body)
    }

    pub async fn update(&self, kind: EntityKind, id: i64, body: &Value) -> Result<Value> {
        let url = self.url(&format!("{}/{}", kind.resource(), id));
        Ok(self.http.send(ApiRequest::patch(url, body.clone())).await?.body)
    }

    /// Patch the synthetic root category a knowledge base owns.
    pub async fn patch_root_category(&self, root_id: i64, body: &Value) -> Result<Value> {
        let url = self.url(&format!(
            "{}/{}/root",
            EntityKind::Category.resource(),
            root_id
        ));
        Ok(self.http.send(ApiRequest::patch(url, body.clone())).await?.body)
    }

    pub async fn set_article_status(&self, article_id: i64, status: &Value) -> Result<Value> {
        let url = self.url(&format!(
            "{}/{}/status",
            EntityKind::Article.resource(),
            article_id
        ));
        let body = serde_json::json!({ "status": status });
        Ok(self.http.send(ApiRequest::patch(url, body)).await?.body)
    }

    pub async fn post_translation(&self, body: &Value) -> Result<Value> {
        self.create(EntityKind::Translation, body).await
    }

    /// Lookups must observe writes made earlier in the run.
    async fn get_uncached(&self, path: &str) -> Result<Value> {
        let request = ApiRequest::get(self.url(path)).no_cache();
        Ok(self.http.send(request).await?.body)
    }
}

/// Read a numeric ID field that may be encoded as a number or a string.
pub fn numeric_id(body: &Value, field: &str) -> Result<i64> {
    let value = body
        .get(field)
        .ok_or_else(|| AppError::resolution(format!("response has no '{field}'")))?;
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| AppError::resolution(format!("'{field}' is not numeric: {value}")))
}
