//! OpenSearch implementation of the search index provider.
//!
//! This module provides a concrete implementation of `SearchIndexProvider`
//! using OpenSearch as the backend.

mod connection_pool;
mod index_config;
mod provider;

pub use connection_pool::RoundRobinConnectionPool;
pub use index_config::{get_index_settings, IndexConfig, DEFAULT_INDEX_NAME, DIMENSION_FIELDS};
pub use provider::{OpenSearchCredentials, OpenSearchProvider};
