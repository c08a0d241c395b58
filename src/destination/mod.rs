//! Destination side: the REST client and the upsert reconciler.

mod api;
mod reconcile;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{DestinationApi, numeric_id};
pub use reconcile::{Reconciled, Reconciler, ResolutionCache};
