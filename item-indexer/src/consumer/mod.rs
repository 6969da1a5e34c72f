//! Consumer module for the item indexer ingest.
//!
//! Provides RabbitMQ consumer functionality for receiving item messages.

mod amqp_consumer;
mod messages;

pub use amqp_consumer::{amqp_uri, decode_item, AmqpConsumer, ConsumerState};
pub use messages::{Disposition, StreamMessage};
