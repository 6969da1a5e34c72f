//! Error types for the item indexer ingest.

use item_indexer_repository::SearchIndexError;
use item_indexer_shared::TransformError;
use thiserror::Error;

/// Errors that can occur in the item indexer ingest.
#[derive(Error, Debug)]
pub enum IngestError {
    /// RabbitMQ-related error.
    #[error("Broker error: {0}")]
    BrokerError(String),

    /// The message body is not a valid item.
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// The item could not be turned into a document.
    #[error("Transform error: {0}")]
    TransformError(#[from] TransformError),

    /// Error from the loader component.
    #[error("Loader error: {0}")]
    LoaderError(String),

    /// Channel communication error.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl IngestError {
    /// Create a broker error.
    pub fn broker(msg: impl Into<String>) -> Self {
        Self::BrokerError(msg.into())
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeError(msg.into())
    }

    /// Create a loader error.
    pub fn loader(msg: impl Into<String>) -> Self {
        Self::LoaderError(msg.into())
    }

    /// Create a channel error.
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::ChannelError(msg.into())
    }
}

impl From<lapin::Error> for IngestError {
    fn from(err: lapin::Error) -> Self {
        Self::BrokerError(err.to_string())
    }
}

impl From<prost::DecodeError> for IngestError {
    fn from(err: prost::DecodeError) -> Self {
        Self::DecodeError(err.to_string())
    }
}

impl From<SearchIndexError> for IngestError {
    fn from(err: SearchIndexError) -> Self {
        Self::LoaderError(err.to_string())
    }
}
