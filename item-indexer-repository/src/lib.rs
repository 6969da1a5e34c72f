//! # Item Indexer Repository
//!
//! This crate provides traits and implementations for writing item documents
//! to the search index. It includes definitions for errors, interfaces, a
//! concrete implementation for OpenSearch, and the bulk indexer that batches
//! document upserts in front of it.

pub mod bulk;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod types;

pub use bulk::{BulkIndexer, BulkIndexerStats, IndexTicket};
pub use config::BulkIndexerConfig;
pub use errors::SearchIndexError;
pub use interfaces::SearchIndexProvider;
pub use opensearch::OpenSearchProvider;
pub use types::{BatchOperationResult, BatchOperationSummary, UpsertDocumentRequest};
