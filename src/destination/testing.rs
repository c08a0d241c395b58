//! In-memory stand-in for the destination API.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};

use super::DestinationApi;
use crate::error::Result;
use crate::http::testing::json_response;
use crate::http::{ApiRequest, ApiResponse, HttpClient, Transport};
use crate::models::SMART_ID_PREFIX;

pub const BASE_URL: &str = "https://kb.test/api/v2";

#[derive(Default)]
struct State {
    knowledge_bases: Vec<Value>,
    categories: Vec<Value>,
    articles: Vec<Value>,
    translations: Vec<Value>,
    last_id: i64,
    calls: Vec<(Method, String)>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

/// Behaves like the destination for the endpoints the reconciler uses.
///
/// Creating a knowledge base also creates its synthetic root category.
#[derive(Default)]
pub struct FakeDestination {
    state: Mutex<State>,
}

impl FakeDestination {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn api(self: &Arc<Self>) -> DestinationApi {
        DestinationApi::new(HttpClient::builder(self.clone()).build(), BASE_URL)
    }

    /// Every call as `METHOD path`.
    pub fn calls(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .map(|(m, p)| format!("{m} {p}"))
            .collect()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        let wanted = format!("{method} {path}");
        self.calls().iter().filter(|c| **c == wanted).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn knowledge_bases(&self) -> Vec<Value> {
        self.state.lock().unwrap().knowledge_bases.clone()
    }

    pub fn categories(&self) -> Vec<Value> {
        self.state.lock().unwrap().categories.clone()
    }

    pub fn articles(&self) -> Vec<Value> {
        self.state.lock().unwrap().articles.clone()
    }

    pub fn translations(&self) -> Vec<Value> {
        self.state.lock().unwrap().translations.clone()
    }

    pub fn category_by_foreign_id(&self, foreign_id: &str) -> Option<Value> {
        find(&self.categories(), "foreignID", &json!(foreign_id))
    }

    /// Insert a knowledge base (and its root category) directly.
    pub fn seed_knowledge_base(&self, foreign_id: &str, name: &str) -> Value {
        let mut state = self.state.lock().unwrap();
        create_knowledge_base(&mut state, json!({"foreignID": foreign_id, "name": name}))
    }

    pub fn seed_category(&self, body: Value) -> Value {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let mut category = body;
        category["knowledgeCategoryID"] = json!(id);
        state.categories.push(category.clone());
        category
    }

    /// Drop a knowledge base behind the reconciler's back.
    pub fn delete_knowledge_base(&self, foreign_id: &str) {
        let wanted = json!(foreign_id);
        self.state
            .lock()
            .unwrap()
            .knowledge_bases
            .retain(|kb| kb.get("foreignID") != Some(&wanted));
    }

    pub fn delete_category(&self, id: i64) {
        let wanted = json!(id);
        self.state
            .lock()
            .unwrap()
            .categories
            .retain(|c| c.get("knowledgeCategoryID") != Some(&wanted));
    }
}

fn find(items: &[Value], field: &str, value: &Value) -> Option<Value> {
    items.iter().find(|item| item.get(field) == Some(value)).cloned()
}

fn create_knowledge_base(state: &mut State, body: Value) -> Value {
    let kb_id = state.next_id();
    let root_id = state.next_id();
    let mut kb = body;
    kb["knowledgeBaseID"] = json!(kb_id);
    kb["rootCategoryID"] = json!(root_id);
    state.categories.push(json!({
        "knowledgeCategoryID": root_id,
        "knowledgeBaseID": kb_id,
        "parentID": -1,
        "name": kb.get("name").cloned().unwrap_or(Value::Null),
    }));
    state.knowledge_bases.push(kb.clone());
    kb
}

fn merge(target: &mut Value, patch: &Value) {
    if let (Some(target), Some(patch)) = (target.as_object_mut(), patch.as_object()) {
        for (k, v) in patch {
            target.insert(k.clone(), v.clone());
        }
    }
}

/// `%24foreignID%3Axyz` → lookup on foreignID, digits → lookup on the ID field.
fn key_of(segment: &str, id_field: &str) -> (String, Value) {
    let decoded = segment
        .replace("%24", "$")
        .replace("%3A", ":")
        .replace("%20", " ")
        .replace("%2F", "/");
    match decoded.strip_prefix(SMART_ID_PREFIX) {
        Some(foreign) => ("foreignID".to_string(), json!(foreign)),
        None => (
            id_field.to_string(),
            decoded.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
        ),
    }
}

fn missing_name(body: &Value) -> Option<ApiResponse> {
    let has_name = body
        .get("name")
        .and_then(Value::as_str)
        .is_some_and(|s| !s.is_empty());
    (!has_name).then(|| {
        json_response(
            422,
            json!({
                "message": "Validation Failed",
                "status": 422,
                "errors": [{"field": "name", "code": "missingField", "message": "name is required."}]
            }),
        )
    })
}

fn not_found() -> ApiResponse {
    json_response(404, json!({"message": "Not Found", "status": 404}))
}

impl FakeDestination {
    fn route(&self, state: &mut State, method: &Method, path: &str, body: Value) -> ApiResponse {
        let parts: Vec<&str> = path.split('/').collect();
        match (method.as_str(), parts.as_slice()) {
            ("GET", ["knowledge-bases", seg]) => {
                let (field, value) = key_of(seg, "knowledgeBaseID");
                find(&state.knowledge_bases, &field, &value)
                    .map(|kb| json_response(200, kb))
                    .unwrap_or_else(not_found)
            }
            ("POST", ["knowledge-bases"]) => match missing_name(&body) {
                Some(invalid) => invalid,
                None => json_response(201, create_knowledge_base(state, body)),
            },
            ("PATCH", ["knowledge-bases", id]) => {
                update(&mut state.knowledge_bases, "knowledgeBaseID", id, &body)
            }
            ("GET", ["knowledge-categories", seg]) => {
                let (field, value) = key_of(seg, "knowledgeCategoryID");
                find(&state.categories, &field, &value)
                    .map(|c| json_response(200, c))
                    .unwrap_or_else(not_found)
            }
            ("POST", ["knowledge-categories"]) => match missing_name(&body) {
                Some(invalid) => invalid,
                None => {
                    let id = state.next_id();
                    let mut category = body;
                    category["knowledgeCategoryID"] = json!(id);
                    state.categories.push(category.clone());
                    json_response(201, category)
                }
            },
            ("PATCH", ["knowledge-categories", id, "root"])
            | ("PATCH", ["knowledge-categories", id]) => {
                update(&mut state.categories, "knowledgeCategoryID", id, &body)
            }
            ("GET", ["articles", seg, "edit"]) => {
                let (field, value) = key_of(seg, "articleID");
                find(&state.articles, &field, &value)
                    .map(|a| json_response(200, a))
                    .unwrap_or_else(not_found)
            }
            ("POST", ["articles"]) => match missing_name(&body) {
                Some(invalid) => invalid,
                None => {
                    let id = state.next_id();
                    let mut article = body;
                    article["articleID"] = json!(id);
                    article["status"] = json!("published");
                    state.articles.push(article.clone());
                    json_response(201, article)
                }
            },
            ("PATCH", ["articles", id, "status"]) | ("PATCH", ["articles", id]) => {
                update(&mut state.articles, "articleID", id, &body)
            }
            ("POST", ["translations", "kb"]) => {
                state.translations.push(body.clone());
                json_response(201, body)
            }
            _ => not_found(),
        }
    }
}

fn update(items: &mut [Value], id_field: &str, id: &str, patch: &Value) -> ApiResponse {
    let id: Value = id.parse::<i64>().map(Value::from).unwrap_or(Value::Null);
    match items.iter_mut().find(|item| item.get(id_field) == Some(&id)) {
        Some(item) => {
            merge(item, patch);
            json_response(200, item.clone())
        }
        None => not_found(),
    }
}

#[async_trait]
impl Transport for FakeDestination {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let path = request
            .url
            .strip_prefix(BASE_URL)
            .unwrap_or(&request.url)
            .trim_start_matches('/')
            .to_string();
        let mut state = self.state.lock().unwrap();
        state.calls.push((request.method.clone(), path.clone()));
        let body = request.body.clone().unwrap_or(Value::Null);
        Ok(self.route(&mut state, &request.method, &path, body))
    }
}
