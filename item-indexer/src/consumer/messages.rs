//! Message types for the consumer.
//!
//! Defines the messages that flow between the consumer and the orchestrator.

use item_indexer_shared::SourceItem;

/// How a delivery is settled with the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The message was handled; remove it from the queue.
    Ack,
    /// The message can never be handled; drop it or dead-letter it.
    Reject,
    /// The message may succeed later; put it back on the queue.
    Requeue,
}

/// Messages that flow through the ingest.
#[derive(Debug)]
pub enum StreamMessage {
    /// A decoded item with the delivery tag used to settle it.
    Item {
        delivery_tag: u64,
        item: SourceItem,
        redelivered: bool,
    },
    /// Settlement of a previously forwarded delivery.
    Acknowledgment {
        delivery_tag: u64,
        disposition: Disposition,
        error: Option<String>,
    },
    /// Stream has ended.
    End,
    /// An error occurred.
    Error(String),
}

impl StreamMessage {
    /// Build a settlement message.
    pub fn ack(delivery_tag: u64, disposition: Disposition, error: Option<String>) -> Self {
        Self::Acknowledgment {
            delivery_tag,
            disposition,
            error,
        }
    }
}
