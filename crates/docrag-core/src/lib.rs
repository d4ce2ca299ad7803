//! docrag-core
//!
//! Domain types, capability traits, configuration, chunking and the
//! on-disk Content Store shared by the ingestion and query crates.

pub mod config;
pub mod content_store;
pub mod data_processor;
pub mod error;
pub mod request;
pub mod splitter;
pub mod traits;
pub mod types;

pub use error::{Error, Result, Stage};
