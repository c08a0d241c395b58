//! The generic record flowing through the pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::SmartId;

/// Well-known destination field names.
pub mod fields {
    pub const FOREIGN_ID: &str = "foreignID";
    pub const SKIP: &str = "skip";
    pub const IS_ROOT: &str = "isRoot";
    pub const PARENT_ID: &str = "parentID";
    pub const KNOWLEDGE_BASE_ID: &str = "knowledgeBaseID";
    pub const KNOWLEDGE_CATEGORY_ID: &str = "knowledgeCategoryID";
    pub const ROOT_CATEGORY_ID: &str = "rootCategoryID";
    pub const ARTICLE_ID: &str = "articleID";
    pub const STATUS: &str = "status";
    pub const NAME: &str = "name";
}

/// Parent reference meaning "attach to the knowledge base's root category".
pub const NULL_PARENT: &str = "null";

/// An ordered field-name to value mapping for one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// A field rendered as a string; numbers and booleans are stringified.
    pub fn get_str(&self, field: &str) -> Option<String> {
        match self.0.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.shift_remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a boolean-ish control flag (`true`, `"true"`, `1`, `"1"`) is set.
    pub fn flag(&self, field: &str) -> bool {
        match self.0.get(field) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => matches!(s.as_str(), "true" | "1"),
            Some(Value::Number(n)) => n.as_i64() == Some(1),
            _ => false,
        }
    }

    pub fn foreign_id(&self) -> Option<String> {
        self.get_str(fields::FOREIGN_ID).filter(|s| !s.is_empty())
    }

    pub fn smart_id(&self) -> Option<SmartId> {
        self.foreign_id().map(SmartId::new)
    }

    pub fn name(&self) -> String {
        self.get_str(fields::NAME).unwrap_or_default()
    }

    /// Body sent to the destination: control flags stripped.
    pub fn to_body(&self) -> Value {
        let mut map = self.0.clone();
        map.shift_remove(fields::SKIP);
        map.shift_remove(fields::IS_ROOT);
        Value::Object(map)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Record {
    type Error = crate::error::AppError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(crate::error::AppError::resolution(format!(
                "expected a JSON object record, got {other}"
            ))),
        }
    }
}
