// src/source/mod.rs

//! Source adapters.
//!
//! Each adapter yields records per entity kind, already mapped into the
//! destination's field names.

mod file;
mod zendesk;

use futures::stream::BoxStream;

pub use file::FileSource;
pub use zendesk::ZendeskSource;

use crate::error::Result;
use crate::models::{EntityKind, HttpConfig, Record, SourceConfig};

/// The configured source.
pub enum Source {
    File(FileSource),
    Zendesk(ZendeskSource),
}

impl Source {
    pub fn from_config(config: &SourceConfig, http: &HttpConfig) -> Result<Self> {
        Ok(match config {
            SourceConfig::File(file) => Source::File(FileSource::new(file.clone())),
            SourceConfig::Zendesk(zendesk) => {
                Source::Zendesk(ZendeskSource::from_config(zendesk, http)?)
            }
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Source::File(_) => "file",
            Source::Zendesk(_) => "zendesk",
        }
    }

    /// Lazily produce the records of one kind, in source order.
    pub fn records(&self, kind: EntityKind) -> BoxStream<'_, Result<Record>> {
        match self {
            Source::File(source) => source.records(kind),
            Source::Zendesk(source) => source.records(kind),
        }
    }
}
