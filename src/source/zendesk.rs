// src/source/zendesk.rs

//! Zendesk Help Center source.
//!
//! Zendesk categories become knowledge bases, sections become categories,
//! and articles stay articles. Lists are walked page by page through
//! `next_page`.

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::http::{HttpClient, Paginator, ReqwestTransport};
use crate::models::{EntityKind, FileMappings, HttpConfig, Record, ZendeskSourceConfig, fields};
use crate::pipeline::{Filter, MappingSpec, transform};

pub struct ZendeskSource {
    http: HttpClient,
    config: ZendeskSourceConfig,
    mappings: FileMappings,
}

impl ZendeskSource {
    pub fn new(http: HttpClient, config: ZendeskSourceConfig) -> Self {
        let mappings = mappings(&config.prefix);
        Self {
            http,
            config,
            mappings,
        }
    }

    pub fn from_config(config: &ZendeskSourceConfig, http_config: &HttpConfig) -> Result<Self> {
        let transport = Arc::new(transport(config, http_config)?);
        let http = HttpClient::standard(transport, http_config, None);
        Ok(Self::new(http, config.clone()))
    }

    /// First page URL and the body key holding the items, per kind.
    fn endpoint(&self, kind: EntityKind) -> Option<(String, &'static str)> {
        let resource = match kind {
            EntityKind::KnowledgeBase => "categories",
            EntityKind::Category => "sections",
            EntityKind::Article => "articles",
            EntityKind::Translation => return None,
        };
        let url = format!(
            "{}/api/v2/help_center/{}/{}.json?per_page={}",
            self.config.base_url.trim_end_matches('/'),
            self.config.locale,
            resource,
            self.config.page_size
        );
        Some((url, resource))
    }

    /// Every record of `kind`, across all pages. Translations are not read
    /// from Zendesk and yield nothing.
    pub fn records(&self, kind: EntityKind) -> BoxStream<'_, Result<Record>> {
        let Some((url, key)) = self.endpoint(kind) else {
            return stream::empty().boxed();
        };

        let raw = Paginator::new(self.http.clone(), url)
            .into_stream()
            .map(move |page| match page {
                Ok(page) => stream::iter(page_items(page.body, key)).left_stream(),
                Err(e) => stream::iter(vec![Err(e)]).right_stream(),
            })
            .flatten();

        transform(raw, self.mappings.for_kind(kind)).boxed()
    }
}

/// API tokens go out as basic `{email}/token` credentials, OAuth tokens as
/// bearer.
fn transport(config: &ZendeskSourceConfig, http_config: &HttpConfig) -> Result<ReqwestTransport> {
    match (&config.email, &config.token) {
        (Some(email), Some(token)) => Ok(ReqwestTransport::new(http_config, HeaderMap::new())?
            .with_basic_auth(format!("{email}/token"), Some(token.clone()))),
        (_, token) => {
            let mut headers = HeaderMap::new();
            if let Some(token) = token {
                let value = HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|e| AppError::config(format!("invalid source token: {e}")))?;
                headers.insert(AUTHORIZATION, value);
            }
            ReqwestTransport::new(http_config, headers)
        }
    }
}

/// Built-in Zendesk to Vanilla field mappings.
fn mappings(prefix: &str) -> FileMappings {
    let foreign_id = || Filter::Prefix(prefix.to_string());
    let reference = || Filter::PrefixedSmartId(prefix.to_string());

    FileMappings {
        knowledge_base: Some(
            MappingSpec::new()
                .filtered(fields::FOREIGN_ID, "id", foreign_id())
                .column(fields::NAME, "name")
                .column("description", "description")
                .filtered("urlCode", "name", Filter::Slug)
                .constant("viewType", "guide")
                .constant("sortArticles", "manual")
                .column("sourceLocale", "locale"),
        ),
        category: Some(
            MappingSpec::new()
                .filtered(fields::FOREIGN_ID, "id", foreign_id())
                .column(fields::NAME, "name")
                .column("description", "description")
                .filtered(fields::KNOWLEDGE_BASE_ID, "category_id", reference())
                .filtered(
                    fields::PARENT_ID,
                    "parent_section_id",
                    Filter::ParentRef(prefix.to_string()),
                )
                .filtered("sort", "position", Filter::Integer),
        ),
        article: Some(
            MappingSpec::new()
                .filtered(fields::FOREIGN_ID, "id", foreign_id())
                .column(fields::NAME, "title")
                .column("body", "body")
                .constant("format", "html")
                .filtered(fields::KNOWLEDGE_CATEGORY_ID, "section_id", reference())
                .filtered("dateInserted", "created_at", Filter::Date)
                .filtered("dateUpdated", "updated_at", Filter::Date)
                .filtered(fields::SKIP, "draft", Filter::RootFlag)
                .column("locale", "locale"),
        ),
        translation: None,
    }
}

/// The records under `key`, or a single error when the page is malformed.
fn page_items(body: Value, key: &str) -> Vec<Result<Record>> {
    match body {
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => items.into_iter().map(Record::try_from).collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => vec![Err(AppError::resolution(format!(
                "'{key}' is not a list: {other}"
            )))],
        },
        other => vec![Err(AppError::resolution(format!(
            "unexpected page body: {other}"
        )))],
    }
}
