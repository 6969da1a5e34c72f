//! Loader module for the item indexer ingest.
//!
//! Hands processed documents to the bulk indexer as upsert requests.

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::errors::IngestError;
use crate::processor::ProcessedItem;
use item_indexer_repository::{
    BulkIndexer, BulkIndexerConfig, BulkIndexerStats, IndexTicket, SearchIndexProvider,
    UpsertDocumentRequest,
};

/// Loader that indexes documents into the search engine.
///
/// The loader is responsible for:
/// - Converting processed items to `UpsertDocumentRequest`s
/// - Submitting them to the bulk indexer, which batches the writes
pub struct SearchLoader {
    provider: Arc<dyn SearchIndexProvider>,
    indexer: BulkIndexer,
}

impl SearchLoader {
    /// Create a new search loader and start its bulk indexer.
    pub fn new(provider: Arc<dyn SearchIndexProvider>, config: BulkIndexerConfig) -> Self {
        let indexer = BulkIndexer::new(provider.clone(), config);
        Self { provider, indexer }
    }

    /// Submit a document for indexing.
    ///
    /// Returns once the bulk indexer has accepted the document; the ticket
    /// resolves when the write has completed.
    #[instrument(skip(self, item), fields(document_id = %item.document_id))]
    pub async fn submit(&self, item: ProcessedItem) -> Result<IndexTicket, IngestError> {
        let request = UpsertDocumentRequest::new(item.document_id, &item.document)?;
        let ticket = self.indexer.submit(request).await?;

        debug!("Document submitted to bulk indexer");
        Ok(ticket)
    }

    /// Flush every pending document and stop the bulk indexer.
    pub async fn close(&mut self) -> Result<BulkIndexerStats, IngestError> {
        Ok(self.indexer.close().await?)
    }

    /// Current bulk indexer counters.
    pub fn stats(&self) -> BulkIndexerStats {
        self.indexer.stats()
    }

    /// Check that the search backend answers.
    pub async fn check_ready(&self) -> Result<(), IngestError> {
        self.provider
            .check_connection()
            .await
            .map_err(|e| IngestError::loader(format!("Search index not ready: {}", e)))
    }
}
