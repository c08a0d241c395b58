//! Pipeline entry points.
//!
//! - `transform`: map source records into destination field sets
//! - `sync`: drive the per-kind phases against the destination

pub mod sync;
pub mod transform;

pub use sync::{Engine, PhaseReport, SyncOptions, SyncReport};
pub use transform::{FieldMapping, Filter, MappingSpec, transform};
