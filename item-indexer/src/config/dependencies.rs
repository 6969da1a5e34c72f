//! Dependency initialization and wiring for the item indexer.

use std::sync::Arc;
use tracing::info;

use crate::config::connection::connect_with_retry;
use crate::config::settings::Settings;
use crate::consumer::AmqpConsumer;
use crate::loader::SearchLoader;
use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use crate::processor::ItemProcessor;
use crate::IndexingError;
use item_indexer_repository::opensearch::{IndexConfig, OpenSearchCredentials};
use item_indexer_repository::{OpenSearchProvider, SearchIndexError, SearchIndexProvider};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// See [`Settings::from_env`] for the variables read.
    pub async fn new() -> Result<Self, IndexingError> {
        let settings = Settings::from_env()?;
        Self::from_settings(settings).await
    }

    /// Initialize all dependencies from explicit settings.
    ///
    /// Connects to OpenSearch and RabbitMQ, each within its retry policy,
    /// and makes sure the index exists.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If a backend stays unreachable or the index cannot be created
    pub async fn from_settings(settings: Settings) -> Result<Self, IndexingError> {
        info!(
            opensearch_urls = ?settings.search.urls,
            index_name = %settings.search.index_name,
            rabbitmq_host = %settings.broker.host,
            rabbitmq_port = settings.broker.port,
            queue = %settings.broker.queue_name,
            prefetch_count = settings.broker.prefetch_count,
            "Initializing dependencies"
        );

        let search_provider = Self::connect_to_opensearch(&settings).await?;
        info!("OpenSearch connection established");

        // Exits if the index cannot be created
        search_provider
            .ensure_index_exists()
            .await
            .map_err(|e| IndexingError::config(format!("Failed to ensure index exists: {}", e)))?;

        let broker = &settings.broker;
        let consumer = connect_with_retry("rabbitmq", broker.connection, move || {
            AmqpConsumer::connect(broker)
        })
        .await
        .map_err(|e| IndexingError::connection(format!("Failed to connect to RabbitMQ: {}", e)))?;
        info!("RabbitMQ connection established");

        let processor = ItemProcessor::new(settings.transform_policy);
        let loader = SearchLoader::new(Arc::new(search_provider), settings.indexer.clone());

        let config = OrchestratorConfig {
            channel_buffer_size: OrchestratorConfig::default()
                .channel_buffer_size
                .max(usize::from(settings.broker.prefetch_count)),
            ack_mode: settings.ack_mode,
            requeue_on_write_failure: settings.requeue_on_write_failure,
            ..OrchestratorConfig::default()
        };
        let orchestrator = Orchestrator::with_config(Arc::new(consumer), processor, loader, config);

        Ok(Self { orchestrator })
    }

    /// Connect to OpenSearch and check that it answers.
    async fn connect_to_opensearch(settings: &Settings) -> Result<OpenSearchProvider, IndexingError> {
        let urls = settings.search.urls.as_slice();
        let index_name = settings.search.index_name.as_str();
        let credentials = match (&settings.search.username, &settings.search.password) {
            (Some(username), password) => Some(OpenSearchCredentials {
                username: username.clone(),
                password: password.clone().unwrap_or_default(),
            }),
            (None, _) => None,
        };
        let credentials = &credentials;

        connect_with_retry("opensearch", settings.search.connection, move || async move {
            let provider =
                OpenSearchProvider::new(urls, credentials.clone(), IndexConfig::new(index_name))
                    .await?;
            provider.check_connection().await?;
            Ok::<_, SearchIndexError>(provider)
        })
        .await
        .map_err(|e| IndexingError::connection(format!("Failed to connect to OpenSearch: {}", e)))
    }
}
