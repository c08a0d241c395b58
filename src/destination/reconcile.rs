// src/destination/reconcile.rs

//! Smart-ID resolution and create-vs-update reconciliation.
//!
//! Per record:
//!
//! ```text
//! Pending → Resolving(smart-ID) → Found: PATCH | NotFound: POST → Done
//! ```
//!
//! Categories add two branches before the generic upsert: a root-flagged
//! category is patched onto its knowledge base's synthetic root category,
//! and the parent reference is resolved first (`"null"` → the root
//! category). A parent that does not exist yet defers the record so the
//! caller can retry it after the phase.

use std::collections::HashMap;

use serde_json::Value;

use super::api::{DestinationApi, numeric_id};
use crate::error::{AppError, Result};
use crate::models::{
    EntityKind, ImportAction, ImportResult, NULL_PARENT, Record, SmartId, fields,
};

/// Last-resolved destination body per smart-ID, for one run.
///
/// Unbounded; entries are never evicted. Misses are not remembered so a
/// record created later in the run can still be found.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: HashMap<(EntityKind, SmartId), Value>,
}

impl ResolutionCache {
    pub fn get(&self, kind: EntityKind, id: &SmartId) -> Option<&Value> {
        self.entries.get(&(kind, id.clone()))
    }

    pub fn insert(&mut self, kind: EntityKind, id: SmartId, body: Value) {
        self.entries.insert((kind, id), body);
    }

    /// Forget an entry the destination no longer has.
    pub fn remove(&mut self, kind: EntityKind, id: &SmartId) -> Option<Value> {
        self.entries.remove(&(kind, id.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of reconciling one record.
#[derive(Debug)]
pub enum Reconciled {
    Imported(ImportResult),
    /// Dropped without creating anything; the reason is logged by the caller.
    Skipped(String),
    /// The category's parent does not exist yet; carries the original record.
    Deferred { record: Record, reason: String },
}

pub struct Reconciler {
    api: DestinationApi,
    cache: ResolutionCache,
}

impl Reconciler {
    pub fn new(api: DestinationApi) -> Self {
        Self {
            api,
            cache: ResolutionCache::default(),
        }
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Reconcile one record of the given kind.
    ///
    /// `NotFound` never escapes; other destination errors propagate.
    pub async fn reconcile(&mut self, kind: EntityKind, record: Record) -> Result<Reconciled> {
        if record.flag(fields::SKIP) {
            return Ok(Reconciled::Skipped("flagged skip".into()));
        }

        match kind {
            EntityKind::KnowledgeBase => self.upsert(kind, record).await.map(Reconciled::Imported),
            EntityKind::Category => self.reconcile_category(record).await,
            EntityKind::Article => self.reconcile_article(record).await,
            EntityKind::Translation => self.post_translation(record).await,
        }
    }

    /// Resolve a smart-ID through the cache, then the destination.
    pub async fn resolve(&mut self, kind: EntityKind, id: &SmartId) -> Result<Option<Value>> {
        if let Some(hit) = self.cache.get(kind, id) {
            return Ok(Some(hit.clone()));
        }

        match self.api.lookup(kind, id).await {
            Ok(body) => {
                self.cache.insert(kind, id.clone(), body.clone());
                Ok(Some(body))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Resolve a reference that is either a smart-ID or a numeric ID.
    async fn resolve_reference(&mut self, kind: EntityKind, reference: &str) -> Result<Option<Value>> {
        if let Some(id) = SmartId::parse(reference) {
            return self.resolve(kind, &id).await;
        }
        let Ok(numeric) = reference.trim().parse::<i64>() else {
            return Ok(None);
        };
        match self.api.get(kind, numeric).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Look up by smart-ID; PATCH when found, POST when not.
    async fn upsert(&mut self, kind: EntityKind, record: Record) -> Result<ImportResult> {
        let id = record
            .smart_id()
            .ok_or_else(|| AppError::resolution(format!("{kind} record has no foreignID")))?;
        let body = record.to_body();

        let (action, saved) = match self.resolve(kind, &id).await? {
            Some(existing) => {
                let existing_id = numeric_id(&existing, kind.id_field())?;
                match self.api.update(kind, existing_id, &body).await {
                    Ok(saved) => (ImportAction::Updated, saved),
                    Err(e) if e.is_not_found() => {
                        log::debug!("{kind} {id} is gone from the destination, recreating");
                        self.cache.remove(kind, &id);
                        (ImportAction::Created, self.api.create(kind, &body).await?)
                    }
                    Err(e) => return Err(e),
                }
            }
            None => (ImportAction::Created, self.api.create(kind, &body).await?),
        };

        let destination_id = numeric_id(&saved, kind.id_field()).ok();
        if destination_id.is_some() {
            self.cache.insert(kind, id.clone(), saved);
        }

        Ok(ImportResult {
            kind,
            action,
            foreign_id: Some(id.foreign_id().to_string()),
            destination_id,
            name: record.name(),
        })
    }

    async fn reconcile_category(&mut self, original: Record) -> Result<Reconciled> {
        let mut record = original.clone();
        let is_root = record.flag(fields::IS_ROOT);
        let parent = record.get_str(fields::PARENT_ID);
        let needs_root = is_root || parent.as_deref() == Some(NULL_PARENT);

        let knowledge_base = match record.get_str(fields::KNOWLEDGE_BASE_ID) {
            Some(reference) => match self
                .resolve_reference(EntityKind::KnowledgeBase, &reference)
                .await?
            {
                Some(kb) => Some(kb),
                None => {
                    return Ok(Reconciled::Skipped(format!(
                        "knowledge base {reference} not found"
                    )));
                }
            },
            None if needs_root => {
                return Ok(Reconciled::Skipped(
                    "no knowledge base reference to find the root category".into(),
                ));
            }
            None => None,
        };

        if let Some(kb) = &knowledge_base {
            record.set(
                fields::KNOWLEDGE_BASE_ID,
                numeric_id(kb, fields::KNOWLEDGE_BASE_ID)?,
            );
        }

        if is_root {
            // needs_root guarantees the knowledge base was resolved
            let kb = knowledge_base
                .as_ref()
                .ok_or_else(|| AppError::resolution("root category without knowledge base"))?;
            return self.link_root(record, kb).await;
        }

        match parent.as_deref() {
            Some(NULL_PARENT) => {
                let kb = knowledge_base
                    .as_ref()
                    .ok_or_else(|| AppError::resolution("null parent without knowledge base"))?;
                record.set(fields::PARENT_ID, numeric_id(kb, fields::ROOT_CATEGORY_ID)?);
            }
            Some(reference) => {
                if let Some(parent_id) = SmartId::parse(reference) {
                    match self.resolve(EntityKind::Category, &parent_id).await? {
                        Some(parent) => record.set(
                            fields::PARENT_ID,
                            numeric_id(&parent, fields::KNOWLEDGE_CATEGORY_ID)?,
                        ),
                        None => {
                            return Ok(Reconciled::Deferred {
                                record: original,
                                reason: format!("parent {reference} not found"),
                            });
                        }
                    }
                }
            }
            None => {}
        }

        self.upsert(EntityKind::Category, record)
            .await
            .map(Reconciled::Imported)
    }

    /// Patch the knowledge base's root category with this record's fields.
    async fn link_root(&mut self, mut record: Record, kb: &Value) -> Result<Reconciled> {
        let root_id = numeric_id(kb, fields::ROOT_CATEGORY_ID)?;
        record.remove(fields::PARENT_ID);

        let saved = match self.api.patch_root_category(root_id, &record.to_body()).await {
            Ok(saved) => saved,
            Err(e) if e.is_not_found() => {
                return Ok(Reconciled::Skipped(format!(
                    "root category {root_id} not found"
                )));
            }
            Err(e) => return Err(e),
        };
        if let Some(id) = record.smart_id() {
            self.cache.insert(EntityKind::Category, id, saved);
        }

        Ok(Reconciled::Imported(ImportResult {
            kind: EntityKind::Category,
            action: ImportAction::RootLinked,
            foreign_id: record.foreign_id(),
            destination_id: Some(root_id),
            name: record.name(),
        }))
    }

    async fn reconcile_article(&mut self, mut record: Record) -> Result<Reconciled> {
        if let Some(reference) = record.get_str(fields::KNOWLEDGE_CATEGORY_ID) {
            match self
                .resolve_reference(EntityKind::Category, &reference)
                .await?
            {
                Some(category) => record.set(
                    fields::KNOWLEDGE_CATEGORY_ID,
                    numeric_id(&category, fields::KNOWLEDGE_CATEGORY_ID)?,
                ),
                None => {
                    return Ok(Reconciled::Skipped(format!(
                        "category {reference} not found"
                    )));
                }
            }
        }

        let status = record.remove(fields::STATUS);
        let result = self.upsert(EntityKind::Article, record).await?;

        if let (Some(status), Some(article_id)) = (status, result.destination_id) {
            match self.api.set_article_status(article_id, &status).await {
                Ok(_) => {}
                Err(e) if e.is_not_found() => {
                    return Ok(Reconciled::Skipped(format!(
                        "status {status} not applied, article {article_id} not found"
                    )));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(Reconciled::Imported(result))
    }

    async fn post_translation(&mut self, record: Record) -> Result<Reconciled> {
        self.api.post_translation(&record.to_body()).await?;
        Ok(Reconciled::Imported(ImportResult {
            kind: EntityKind::Translation,
            action: ImportAction::Created,
            foreign_id: record.foreign_id(),
            destination_id: None,
            name: record.name(),
        }))
    }
}
