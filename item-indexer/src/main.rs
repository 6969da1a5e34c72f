//! Item Indexer Main Entry Point
//!
//! This is the main binary for the catalog item indexer.
//! It consumes item messages from RabbitMQ and indexes them into OpenSearch.

use dotenv::dotenv;
use item_indexer::{Dependencies, IndexingError};
use std::env;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() -> Result<(), IndexingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("item_indexer=info,item_indexer_repository=info"));

    let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            // Structured logging for log shippers
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_thread_ids(true),
                )
                .try_init()
                .map_err(|e| IndexingError::config(format!("Failed to initialize tracing: {}", e)))?;

            info!(
                service_name = "item-indexer",
                service_version = env!("CARGO_PKG_VERSION"),
                "Tracing initialized with JSON format"
            );
        }
        "pretty" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
                .try_init()
                .map_err(|e| IndexingError::config(format!("Failed to initialize tracing: {}", e)))?;

            info!(
                service_name = "item-indexer",
                service_version = env!("CARGO_PKG_VERSION"),
                "Tracing initialized with console output"
            );
        }
        other => {
            return Err(IndexingError::config(format!(
                "Invalid LOG_FORMAT '{}', expected 'pretty' or 'json'",
                other
            )));
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), IndexingError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing()?;

    info!("Starting item indexer");

    let mut deps = match Dependencies::new().await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    match deps.orchestrator.run().await {
        Ok(()) => {
            info!("Item indexer stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Item indexer failed");
            Err(e.into())
        }
    }
}
