//! Request and response types for search index operations.

use serde::Serialize;
use serde_json::Value;

use crate::errors::SearchIndexError;

/// Bytes added to every bulk item for its action line and separators.
const BULK_ACTION_OVERHEAD: usize = 32;

/// Request to upsert a document in the search index.
///
/// The document is merged into the existing one with the same id, or
/// created if none exists.
#[derive(Debug, Clone)]
pub struct UpsertDocumentRequest {
    /// The document's identifier in the index.
    pub document_id: String,
    /// The document body.
    pub document: Value,
    size: usize,
}

impl UpsertDocumentRequest {
    /// Create an upsert request from any serializable document.
    ///
    /// # Returns
    ///
    /// * `Ok(UpsertDocumentRequest)` - The request, with its payload size measured
    /// * `Err(SearchIndexError)` - If the id is empty or the document cannot be serialized
    pub fn new<T: Serialize>(
        document_id: impl Into<String>,
        document: &T,
    ) -> Result<Self, SearchIndexError> {
        let document_id = document_id.into();
        if document_id.is_empty() {
            return Err(SearchIndexError::validation("document_id is required"));
        }

        let document =
            serde_json::to_value(document).map_err(|e| SearchIndexError::serialization(e.to_string()))?;
        let size = document.to_string().len() + document_id.len() + BULK_ACTION_OVERHEAD;

        Ok(Self {
            document_id,
            document,
            size,
        })
    }

    /// Estimated number of bytes this request adds to a bulk body.
    pub fn estimated_size(&self) -> usize {
        self.size
    }
}

/// Result of a batch operation for a single item.
///
/// This struct represents the outcome of a single upsert within a bulk
/// request. It indicates whether the operation succeeded and includes error
/// details if it failed.
#[derive(Debug, Clone)]
pub struct BatchOperationResult {
    /// The document's identifier in the index.
    pub document_id: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error if the operation failed.
    pub error: Option<SearchIndexError>,
}

/// Summary of a batch operation containing aggregate statistics and individual results.
///
/// Results are in the same order as the requests of the batch.
#[derive(Debug, Clone)]
pub struct BatchOperationSummary {
    /// Total number of items in the batch.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Individual results for each item.
    pub results: Vec<BatchOperationResult>,
}

impl BatchOperationSummary {
    /// Build a summary from per-item results.
    pub fn from_results(results: Vec<BatchOperationResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_upsert_request_size() {
        let request = UpsertDocumentRequest::new("ikea-1", &json!({"source": "ikea"})).unwrap();
        let expected = r#"{"source":"ikea"}"#.len() + "ikea-1".len() + BULK_ACTION_OVERHEAD;
        assert_eq!(request.estimated_size(), expected);
        assert_eq!(request.document["source"], "ikea");
    }

    #[test]
    fn test_upsert_request_requires_id() {
        let result = UpsertDocumentRequest::new("", &json!({}));
        assert!(matches!(result, Err(SearchIndexError::ValidationError(_))));
    }

    #[test]
    fn test_summary_from_results() {
        let summary = BatchOperationSummary::from_results(vec![
            BatchOperationResult {
                document_id: "a".to_string(),
                success: true,
                error: None,
            },
            BatchOperationResult {
                document_id: "b".to_string(),
                success: false,
                error: Some(SearchIndexError::request_failed(400, "bad")),
            },
        ]);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
    }
}
