//! # Item Indexer
//!
//! Item indexer for the catalog search - consumes items from RabbitMQ
//! and indexes them into OpenSearch.
//!
//! ## Architecture
//!
//! The indexer follows the Consumer-Processor-Loader pattern:
//!
//! 1. **Consumer**: Receives protobuf items from a RabbitMQ queue
//! 2. **Processor**: Transforms items into locale-keyed search documents
//! 3. **Loader**: Hands documents to the bulk indexer
//! 4. **Orchestrator**: Coordinates the ingest flow and settles messages
//!
//! ## Modules
//!
//! - [`config`]: Settings, connection retries and dependency wiring
//! - [`consumer`]: RabbitMQ consumer for item messages
//! - [`processor`]: Transforms items into documents
//! - [`loader`]: Indexes documents into OpenSearch
//! - [`orchestrator`]: Coordinates the ingest flow
//! - [`errors`]: Error types for the indexer

pub mod config;
pub mod consumer;
pub mod errors;
pub mod loader;
pub mod orchestrator;
pub mod processor;

pub use config::{Dependencies, Settings};
pub use errors::IngestError;

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A backend could not be reached within the allowed attempts.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Ingest error.
    #[error("Ingest error: {0}")]
    IngestError(#[from] IngestError),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }
}
