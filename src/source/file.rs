// src/source/file.rs

//! Records from a JSON export on disk.
//!
//! ```json
//! {
//!   "knowledgeBases": [ ... ],
//!   "categories":     [ ... ],
//!   "articles":       [ ... ],
//!   "translations":   [ ... ]
//! }
//! ```

use futures::stream::{self, BoxStream, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::error::{AppError, Result};
use crate::models::{EntityKind, FileSourceConfig, Record};
use crate::pipeline::transform;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Export {
    #[serde(default)]
    knowledge_bases: Vec<Value>,
    #[serde(default)]
    categories: Vec<Value>,
    #[serde(default)]
    articles: Vec<Value>,
    #[serde(default)]
    translations: Vec<Value>,
}

impl Export {
    fn section(&self, kind: EntityKind) -> &[Value] {
        match kind {
            EntityKind::KnowledgeBase => &self.knowledge_bases,
            EntityKind::Category => &self.categories,
            EntityKind::Article => &self.articles,
            EntityKind::Translation => &self.translations,
        }
    }
}

pub struct FileSource {
    config: FileSourceConfig,
    export: OnceCell<Export>,
}

impl FileSource {
    pub fn new(config: FileSourceConfig) -> Self {
        Self {
            config,
            export: OnceCell::new(),
        }
    }

    /// Read and parse the export on first use.
    async fn export(&self) -> Result<&Export> {
        self.export
            .get_or_try_init(|| async {
                let bytes = tokio::fs::read(&self.config.path).await.map_err(|e| {
                    AppError::config(format!(
                        "cannot read export {}: {}",
                        self.config.path.display(),
                        e
                    ))
                })?;
                Ok::<Export, AppError>(serde_json::from_slice(&bytes)?)
            })
            .await
    }

    async fn raw(&self, kind: EntityKind) -> Result<Vec<Value>> {
        Ok(self.export().await?.section(kind).to_vec())
    }

    pub fn records(&self, kind: EntityKind) -> BoxStream<'_, Result<Record>> {
        let raw = stream::once(self.raw(kind))
            .map(|section| match section {
                Ok(items) => stream::iter(items.into_iter().map(Record::try_from)).left_stream(),
                Err(e) => stream::iter(vec![Err(e)]).right_stream(),
            })
            .flatten();

        transform(raw, self.config.mappings.for_kind(kind)).boxed()
    }
}
