//! Entity kinds and per-record import results.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::record::fields;

/// The entity types migrated, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    KnowledgeBase,
    Category,
    Article,
    Translation,
}

impl EntityKind {
    /// Collection path on the destination API.
    pub fn resource(&self) -> &'static str {
        match self {
            EntityKind::KnowledgeBase => "knowledge-bases",
            EntityKind::Category => "knowledge-categories",
            EntityKind::Article => "articles",
            EntityKind::Translation => "translations/kb",
        }
    }

    /// Field carrying the destination's numeric ID.
    pub fn id_field(&self) -> &'static str {
        match self {
            EntityKind::KnowledgeBase => fields::KNOWLEDGE_BASE_ID,
            EntityKind::Category => fields::KNOWLEDGE_CATEGORY_ID,
            EntityKind::Article => fields::ARTICLE_ID,
            EntityKind::Translation => "translationID",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::KnowledgeBase => "knowledge base",
            EntityKind::Category => "category",
            EntityKind::Article => "article",
            EntityKind::Translation => "translation",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the reconciler did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportAction {
    Created,
    Updated,
    /// Patched onto the knowledge base's synthetic root category.
    RootLinked,
}

impl fmt::Display for ImportAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImportAction::Created => "created",
            ImportAction::Updated => "updated",
            ImportAction::RootLinked => "root-linked",
        };
        f.write_str(s)
    }
}

/// One successfully imported record.
#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    pub kind: EntityKind,
    pub action: ImportAction,
    pub foreign_id: Option<String>,
    pub destination_id: Option<i64>,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resources_and_id_fields() {
        assert_eq!(EntityKind::Category.resource(), "knowledge-categories");
        assert_eq!(EntityKind::Category.id_field(), "knowledgeCategoryID");
        assert_eq!(EntityKind::Article.id_field(), "articleID");
        assert_eq!(EntityKind::KnowledgeBase.to_string(), "knowledge base");
    }
}
