//! Configuration for the item indexer.
//!
//! - [`settings`]: Typed settings read from the environment
//! - [`connection`]: Bounded retry for backend connections
//! - [`dependencies`]: Wiring of the ingest components

pub mod connection;
pub mod dependencies;
pub mod settings;

pub use connection::{connect_with_retry, RetryPolicy};
pub use dependencies::Dependencies;
pub use settings::{BrokerSettings, SearchSettings, Settings};
