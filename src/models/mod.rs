// src/models/mod.rs

//! Domain models for the sync engine.
//!
//! Records, external-ID keys, entity kinds, and configuration.

mod config;
mod entity;
pub mod record;
mod smart_id;

pub use config::{
    BypassConfig, BypassKind, Config, DestinationConfig, FileMappings, FileSourceConfig,
    HttpConfig, LoggingConfig, SourceConfig, SyncConfig, VanillaDestinationConfig,
    ZendeskSourceConfig,
};
pub use entity::{EntityKind, ImportAction, ImportResult};
pub use record::{NULL_PARENT, Record, fields};
pub use smart_id::{SMART_ID_PREFIX, SmartId};
