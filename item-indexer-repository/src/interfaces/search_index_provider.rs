//! Search index provider trait definition.

use async_trait::async_trait;

use crate::errors::SearchIndexError;
use crate::types::{BatchOperationSummary, UpsertDocumentRequest};

/// Abstracts the underlying search index implementation (OpenSearch, Elasticsearch, etc.).
///
/// All methods return `Result<T, SearchIndexError>` for consistent error handling across
/// different backend implementations.
///
/// # Note on Document Creation
///
/// There is no separate create or delete operation: every item message is a full
/// description of the item, so documents are only ever upserted by id.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Check that the backend is reachable.
    ///
    /// Called by the connection supervisor on startup before anything else.
    async fn check_connection(&self) -> Result<(), SearchIndexError>;

    /// Ensure the search index exists, creating it with its mapping if necessary.
    ///
    /// Idempotent: an index that already exists is left untouched.
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError>;

    /// Upsert multiple documents in a single bulk request.
    ///
    /// # Arguments
    ///
    /// * `requests` - Slice of upsert requests
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - Per-item results, in request order
    /// * `Err(SearchIndexError)` - If the bulk request fails entirely
    async fn bulk_upsert_documents(
        &self,
        requests: &[UpsertDocumentRequest],
    ) -> Result<BatchOperationSummary, SearchIndexError>;
}
