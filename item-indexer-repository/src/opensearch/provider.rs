//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust crate.

use async_trait::async_trait;
use opensearch::{
    auth::Credentials,
    http::{
        request::JsonBody,
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
    indices::{IndicesCreateParts, IndicesExistsParts},
    BulkParts, OpenSearch,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::connection_pool::RoundRobinConnectionPool;
use crate::opensearch::index_config::{get_index_settings, IndexConfig};
use crate::types::{BatchOperationResult, BatchOperationSummary, UpsertDocumentRequest};

/// Basic authentication credentials for the OpenSearch cluster.
#[derive(Debug, Clone)]
pub struct OpenSearchCredentials {
    pub username: String,
    pub password: String,
}

/// OpenSearch provider implementation.
///
/// # Example
///
/// ```ignore
/// use item_indexer_repository::opensearch::{IndexConfig, OpenSearchProvider};
///
/// let provider = OpenSearchProvider::new(
///     &["http://localhost:9200".to_string()],
///     None,
///     IndexConfig::new("items"),
/// )
/// .await?;
/// provider.check_connection().await?;
/// provider.ensure_index_exists().await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
    index_config: IndexConfig,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider for the given cluster nodes.
    ///
    /// No request is sent here; use `check_connection` to verify the cluster
    /// is reachable.
    ///
    /// # Arguments
    ///
    /// * `urls` - The OpenSearch node URLs (e.g., "http://localhost:9200")
    /// * `credentials` - Optional basic authentication credentials
    /// * `index_config` - The index configuration
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchProvider)` - A new provider instance
    /// * `Err(SearchIndexError)` - If a URL is invalid or the transport cannot be built
    pub async fn new(
        urls: &[String],
        credentials: Option<OpenSearchCredentials>,
        index_config: IndexConfig,
    ) -> Result<Self, SearchIndexError> {
        let mut nodes = urls
            .iter()
            .map(|url| Url::parse(url))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SearchIndexError::validation(format!("Invalid OpenSearch URL: {}", e)))?;

        let builder = match nodes.len() {
            0 => {
                return Err(SearchIndexError::validation(
                    "At least one OpenSearch URL must be provided",
                ))
            }
            1 => TransportBuilder::new(SingleNodeConnectionPool::new(nodes.remove(0))),
            _ => TransportBuilder::new(RoundRobinConnectionPool::new(nodes)?),
        };

        let builder = match credentials {
            Some(credentials) => builder.auth(Credentials::Basic(
                credentials.username,
                credentials.password,
            )),
            None => builder,
        };

        let transport = builder
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            urls = ?urls,
            index = %index_config.name,
            "Created OpenSearch provider"
        );

        Ok(Self {
            client,
            index_config,
        })
    }

    /// Build the bulk body for a batch of upserts.
    ///
    /// Each request becomes an `update` action line keyed by the document id,
    /// followed by a partial document with `doc_as_upsert` set.
    fn build_bulk_body(requests: &[UpsertDocumentRequest]) -> Vec<Value> {
        let mut body = Vec::with_capacity(requests.len() * 2);
        for request in requests {
            body.push(json!({ "update": { "_id": request.document_id } }));
            body.push(json!({ "doc": request.document, "doc_as_upsert": true }));
        }
        body
    }

    /// Map a bulk response onto the requests that produced it.
    ///
    /// The backend answers with one item per action, in request order.
    fn parse_bulk_response(
        requests: &[UpsertDocumentRequest],
        response: &Value,
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        let items = response
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| SearchIndexError::parse("Bulk response has no items"))?;

        if items.len() != requests.len() {
            return Err(SearchIndexError::parse(format!(
                "Bulk response has {} items for {} requests",
                items.len(),
                requests.len()
            )));
        }

        let results = requests
            .iter()
            .zip(items)
            .map(|(request, item)| {
                let outcome = item
                    .get("update")
                    .or_else(|| item.as_object().and_then(|o| o.values().next()))
                    .unwrap_or(&Value::Null);
                let status = outcome.get("status").and_then(Value::as_u64).unwrap_or(0) as u16;

                match outcome.get("error") {
                    None if (200..300).contains(&status) => BatchOperationResult {
                        document_id: request.document_id.clone(),
                        success: true,
                        error: None,
                    },
                    error => {
                        let reason = match error {
                            Some(error) => format!(
                                "{}: {}",
                                error.get("type").and_then(Value::as_str).unwrap_or("unknown"),
                                error.get("reason").and_then(Value::as_str).unwrap_or_default()
                            ),
                            None => "missing status in bulk response item".to_string(),
                        };
                        BatchOperationResult {
                            document_id: request.document_id.clone(),
                            success: false,
                            error: Some(SearchIndexError::request_failed(status, reason)),
                        }
                    }
                }
            })
            .collect();

        Ok(BatchOperationSummary::from_results(results))
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    async fn check_connection(&self) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .ping()
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            return Err(SearchIndexError::connection(format!(
                "Ping failed with status {}",
                status
            )));
        }

        debug!("OpenSearch cluster is reachable");
        Ok(())
    }

    /// Create the item index with its strict mapping unless it already exists.
    ///
    /// Another indexer instance creating the index concurrently is not an error.
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError> {
        let index = self.index_config.name.as_str();

        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.is_success() {
            debug!(index = %index, "Index already exists");
            return Ok(());
        }
        if status.as_u16() != 404 {
            return Err(SearchIndexError::index_creation(format!(
                "Unexpected status {} checking index {}",
                status, index
            )));
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(get_index_settings())
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            if error_body.contains("resource_already_exists_exception") {
                warn!(index = %index, "Index was created concurrently");
                return Ok(());
            }
            error!(status = %status, body = %error_body, "Index creation failed");
            return Err(SearchIndexError::index_creation(format!(
                "Create index {} failed with status {}: {}",
                index, status, error_body
            )));
        }

        info!(index = %index, "Created index");
        Ok(())
    }

    async fn bulk_upsert_documents(
        &self,
        requests: &[UpsertDocumentRequest],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        if requests.is_empty() {
            return Ok(BatchOperationSummary::from_results(Vec::new()));
        }

        let body: Vec<JsonBody<Value>> = Self::build_bulk_body(requests)
            .into_iter()
            .map(JsonBody::new)
            .collect();

        let response = self
            .client
            .bulk(BulkParts::Index(&self.index_config.name))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Bulk request failed");
            return Err(SearchIndexError::request_failed(status.as_u16(), error_body));
        }

        let response_body: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        let summary = Self::parse_bulk_response(requests, &response_body)?;
        debug!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Bulk upsert completed"
        );
        Ok(summary)
    }
}
