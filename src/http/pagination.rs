// src/http/pagination.rs

//! Lazy walk over a paged API.
//!
//! After each fetch the next URL comes from the body's `next_page` field
//! when present, otherwise from the `rel="next"` entry of the `Link`
//! header. The walk ends when neither yields a URL.

use std::collections::{HashMap, HashSet};

use futures::Stream;
use futures::stream;
use reqwest::header::{HeaderMap, LINK};
use serde_json::Value;
use url::Url;

use super::{ApiRequest, HttpClient};
use crate::error::Result;

/// Default body field carrying the next page URL.
pub const NEXT_PAGE_FIELD: &str = "next_page";

/// One fetched page.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Cursor over the pages reachable from one initial URL.
///
/// Not restartable: build a new `Paginator` to walk again from the start.
/// A next link pointing at a page already fetched ends the walk.
pub struct Paginator {
    client: HttpClient,
    next_url: Option<String>,
    fetched: HashSet<String>,
}

impl Paginator {
    pub fn new(client: HttpClient, initial_url: impl Into<String>) -> Self {
        Self {
            client,
            next_url: Some(initial_url.into()),
            fetched: HashSet::new(),
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.fetched.len()
    }

    /// Fetch the next page, or `None` once the walk is exhausted.
    ///
    /// After an error the cursor is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        let Some(url) = self.next_url.take() else {
            return Ok(None);
        };

        let response = self.client.send(ApiRequest::get(url.as_str())).await?;
        self.fetched.insert(url.clone());
        self.next_url = next_page_url(&url, &response.body, &response.headers)
            .filter(|next| {
                let repeat = self.fetched.contains(next);
                if repeat {
                    log::warn!("Pagination loops back to {}; stopping after {}", next, url);
                }
                !repeat
            });

        Ok(Some(Page {
            url,
            headers: response.headers,
            body: response.body,
        }))
    }

    /// The remaining pages as a stream; it ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Page>> {
        stream::unfold(Some(self), |state| async move {
            let mut paginator = state?;
            match paginator.next_page().await {
                Ok(Some(page)) => Some((Ok(page), Some(paginator))),
                Ok(None) => None,
                Err(error) => Some((Err(error), None)),
            }
        })
    }
}

/// Resolve the URL of the page after `current`.
fn next_page_url(current: &str, body: &Value, headers: &HeaderMap) -> Option<String> {
    let from_body = body
        .get(NEXT_PAGE_FIELD)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let next = from_body.or_else(|| {
        let header = headers.get(LINK)?.to_str().ok()?;
        parse_link_header(header).remove("next")
    })?;

    Some(resolve(current, &next))
}

/// Resolve a potentially relative URL against the page it came from.
fn resolve(base: &str, href: &str) -> String {
    Url::parse(base)
        .and_then(|b| b.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Parse `<url>; rel="next", <url>; rel="prev"` into relation → URL.
pub fn parse_link_header(value: &str) -> HashMap<String, String> {
    let Ok(pattern) = regex::Regex::new(r#"<([^>]*)>\s*;\s*rel="(next|prev)""#) else {
        return HashMap::new();
    };

    value
        .split(',')
        .filter_map(|segment| {
            let caps = pattern.captures(segment)?;
            Some((caps[2].to_string(), caps[1].to_string()))
        })
        .collect()
}
