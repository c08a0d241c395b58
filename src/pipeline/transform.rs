// src/pipeline/transform.rs

//! Declarative mapping from source records to destination field sets.
//!
//! A mapping spec is an ordered object of destination field → one of:
//!
//! - `"column"`: copy the source column
//! - `{"column": "...", "filter": ...}`: copy through a pure filter
//! - `{"placeholder": value}`: a constant
//!
//! A missing source column leaves the destination field absent. A filter
//! error aborts the whole run.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::models::{NULL_PARENT, Record, SmartId};

/// Pure value transformations available to a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// `<prefix><value>`
    Prefix(String),
    /// `$foreignID:<value>`
    SmartId,
    /// `$foreignID:<prefix><value>`
    PrefixedSmartId(String),
    /// Like `prefixed_smart_id`, but an absent/zero parent becomes `"null"`
    ParentRef(String),
    /// Any truthy value → `"true"`, everything else → `"false"`
    RootFlag,
    /// Normalize to RFC 3339 UTC
    Date,
    /// Lowercase, non-alphanumeric runs collapsed to `-`
    Slug,
    Integer,
}

impl Filter {
    pub fn apply(&self, field: &str, value: &Value) -> Result<Value> {
        let text = scalar_text(value);
        let out = match self {
            Filter::RootFlag => {
                let truthy = match value {
                    Value::Bool(b) => *b,
                    Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
                    Value::String(s) => matches!(s.to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
                    _ => false,
                };
                Value::String(truthy.to_string())
            }
            Filter::ParentRef(prefix) => match text.as_deref() {
                None | Some("") | Some("0") | Some(NULL_PARENT) => Value::String(NULL_PARENT.into()),
                Some(id) => Value::String(SmartId::new(format!("{prefix}{id}")).to_string()),
            },
            _ if value.is_null() => Value::Null,
            Filter::Prefix(prefix) => Value::String(format!("{}{}", prefix, text.unwrap_or_default())),
            Filter::SmartId => Value::String(SmartId::new(text.unwrap_or_default()).to_string()),
            Filter::PrefixedSmartId(prefix) => Value::String(
                SmartId::new(format!("{}{}", prefix, text.unwrap_or_default())).to_string(),
            ),
            Filter::Date => Value::String(normalize_date(field, value)?),
            Filter::Slug => Value::String(slugify(&text.unwrap_or_default())),
            Filter::Integer => Value::from(to_integer(field, value)?),
        };
        Ok(out)
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn normalize_date(field: &str, value: &Value) -> Result<String> {
    if let Some(ts) = value.as_i64() {
        return Utc
            .timestamp_opt(ts, 0)
            .single()
            .map(|dt| dt.to_rfc3339())
            .ok_or_else(|| AppError::transform(field, format!("timestamp {ts} out of range")));
    }

    let raw = value
        .as_str()
        .map(str::trim)
        .ok_or_else(|| AppError::transform(field, format!("cannot read {value} as a date")))?;

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc).to_rfc3339());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc().to_rfc3339());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc().to_rfc3339());
        }
    }
    Err(AppError::transform(field, format!("unrecognized date '{raw}'")))
}

fn slugify(text: &str) -> String {
    let lower = text.to_lowercase();
    match regex::Regex::new(r"[^\p{L}\p{N}]+") {
        Ok(pattern) => pattern.replace_all(&lower, "-").trim_matches('-').to_string(),
        Err(_) => lower,
    }
}

fn to_integer(field: &str, value: &Value) -> Result<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
    .ok_or_else(|| AppError::transform(field, format!("{value} is not an integer")))
}

/// How one destination field is produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldMapping {
    Column(String),
    Filtered { column: String, filter: Filter },
    Constant { placeholder: Value },
}

/// Ordered destination-field → mapping table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct MappingSpec {
    fields: Vec<(String, FieldMapping)>,
}

impl MappingSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(self, field: &str, column: &str) -> Self {
        self.with(field, FieldMapping::Column(column.into()))
    }

    pub fn filtered(self, field: &str, column: &str, filter: Filter) -> Self {
        self.with(
            field,
            FieldMapping::Filtered {
                column: column.into(),
                filter,
            },
        )
    }

    pub fn constant(self, field: &str, value: impl Into<Value>) -> Self {
        self.with(
            field,
            FieldMapping::Constant {
                placeholder: value.into(),
            },
        )
    }

    fn with(mut self, field: &str, mapping: FieldMapping) -> Self {
        self.fields.retain(|(name, _)| name != field);
        self.fields.push((field.into(), mapping));
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Map one source record into a destination record.
    pub fn apply(&self, source: &Record) -> Result<Record> {
        let mut out = Record::new();
        for (field, mapping) in &self.fields {
            match mapping {
                FieldMapping::Column(column) => {
                    if let Some(value) = source.get(column) {
                        out.set(field.as_str(), value.clone());
                    }
                }
                FieldMapping::Filtered { column, filter } => {
                    if let Some(value) = source.get(column) {
                        out.set(field.as_str(), filter.apply(field, value)?);
                    }
                }
                FieldMapping::Constant { placeholder } => {
                    out.set(field.as_str(), placeholder.clone());
                }
            }
        }
        Ok(out)
    }
}

impl TryFrom<Map<String, Value>> for MappingSpec {
    type Error = serde_json::Error;

    fn try_from(map: Map<String, Value>) -> std::result::Result<Self, Self::Error> {
        let fields = map
            .into_iter()
            .map(|(field, raw)| Ok((field, serde_json::from_value(raw)?)))
            .collect::<std::result::Result<Vec<_>, serde_json::Error>>()?;
        Ok(Self { fields })
    }
}

impl From<MappingSpec> for Map<String, Value> {
    fn from(spec: MappingSpec) -> Self {
        spec.fields
            .into_iter()
            .filter_map(|(field, mapping)| Some((field, serde_json::to_value(mapping).ok()?)))
            .collect()
    }
}

/// Lazily map a record stream; `None` passes records through unchanged.
///
/// Order is preserved. A filter error surfaces as that item's `Err`.
pub fn transform<'a, S>(
    records: S,
    spec: Option<&'a MappingSpec>,
) -> impl Stream<Item = Result<Record>> + Send + 'a
where
    S: Stream<Item = Result<Record>> + Send + 'a,
{
    records.map(move |record| match spec {
        Some(spec) => record.and_then(|r| spec.apply(&r)),
        None => record,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::try_from(value).unwrap()
    }

    #[test]
    fn deserializes_all_mapping_forms_in_order() {
        let spec: MappingSpec = serde_json::from_value(json!({
            "foreignID": {"column": "id", "filter": {"prefix": "zd-"}},
            "name": "title",
            "format": {"placeholder": "html"},
            "isRoot": {"column": "root", "filter": "root_flag"}
        }))
        .unwrap();

        assert_eq!(spec.len(), 4);
        assert_eq!(spec.fields[0].0, "foreignID");
        assert_eq!(
            spec.fields[3].1,
            FieldMapping::Filtered {
                column: "root".into(),
                filter: Filter::RootFlag
            }
        );
        assert_eq!(
            spec.fields[2].1,
            FieldMapping::Constant {
                placeholder: json!("html")
            }
        );
    }

    #[test]
    fn applies_columns_filters_and_constants() {
        let spec = MappingSpec::new()
            .filtered("foreignID", "id", Filter::Prefix("zd-".into()))
            .column("name", "title")
            .constant("format", "html")
            .filtered("knowledgeBaseID", "category_id", Filter::PrefixedSmartId("zd-".into()))
            .filtered("parentID", "parent_section_id", Filter::ParentRef("zd-".into()));

        let out = spec
            .apply(&record(json!({"id": 10, "title": "Billing", "category_id": 1, "parent_section_id": null})))
            .unwrap();

        assert_eq!(
            out.to_body(),
            json!({
                "foreignID": "zd-10",
                "name": "Billing",
                "format": "html",
                "knowledgeBaseID": "$foreignID:zd-1",
                "parentID": "null"
            })
        );
    }

    #[test]
    fn missing_column_leaves_field_absent() {
        let spec = MappingSpec::new().column("name", "title").column("body", "body");
        let out = spec.apply(&record(json!({"title": "x"}))).unwrap();
        assert!(out.contains("name"));
        assert!(!out.contains("body"));
    }

    #[test]
    fn root_flag_normalizes() {
        assert_eq!(Filter::RootFlag.apply("f", &json!(1)).unwrap(), json!("true"));
        assert_eq!(Filter::RootFlag.apply("f", &json!("TRUE")).unwrap(), json!("true"));
        assert_eq!(Filter::RootFlag.apply("f", &json!(null)).unwrap(), json!("false"));
        assert_eq!(Filter::RootFlag.apply("f", &json!(false)).unwrap(), json!("false"));
    }

    #[test]
    fn dates_normalize_to_rfc3339() {
        let f = Filter::Date;
        assert_eq!(
            f.apply("d", &json!("2024-03-01T10:00:00+02:00")).unwrap(),
            json!("2024-03-01T08:00:00+00:00")
        );
        assert_eq!(
            f.apply("d", &json!("2024-03-01 10:00:00")).unwrap(),
            json!("2024-03-01T10:00:00+00:00")
        );
        assert_eq!(
            f.apply("d", &json!("2024-03-01")).unwrap(),
            json!("2024-03-01T00:00:00+00:00")
        );
        assert_eq!(f.apply("d", &json!(0)).unwrap(), json!("1970-01-01T00:00:00+00:00"));
        assert!(f.apply("d", &json!("yesterday")).is_err());
    }

    #[test]
    fn slug_and_integer() {
        assert_eq!(
            Filter::Slug.apply("s", &json!("  Getting Started!  ")).unwrap(),
            json!("getting-started")
        );
        assert_eq!(Filter::Integer.apply("i", &json!("42")).unwrap(), json!(42));
        assert!(Filter::Integer.apply("i", &json!("4x2")).is_err());
    }

    #[tokio::test]
    async fn stream_is_order_preserving_and_fail_fast_per_item() {
        let spec = MappingSpec::new().filtered("dateInserted", "created", Filter::Date);
        let input = stream::iter(vec![
            Ok(record(json!({"created": "2024-01-01"}))),
            Ok(record(json!({"created": "garbage"}))),
            Ok(record(json!({"created": "2024-01-02"}))),
        ]);

        let out: Vec<Result<Record>> = transform(input, Some(&spec)).collect().await;
        assert_eq!(out.len(), 3);
        assert!(out[0].is_ok());
        assert!(matches!(out[1], Err(AppError::Transform { ref field, .. }) if field == "dateInserted"));
    }

    #[tokio::test]
    async fn no_spec_passes_through() {
        let input = stream::iter(vec![Ok(record(json!({"a": 1})))]);
        let out: Vec<Result<Record>> = transform(input, None).collect().await;
        assert_eq!(out[0].as_ref().unwrap().get("a"), Some(&json!(1)));
    }
}
