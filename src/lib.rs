// src/lib.rs

//! kbsync: knowledge-base migration by external ID.

pub mod destination;
pub mod error;
pub mod http;
pub mod models;
pub mod pipeline;
pub mod source;
pub mod utils;
