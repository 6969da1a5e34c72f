//! Bulk indexer for the item search index.
//!
//! Buffers upsert requests and writes them with bulk requests, trading
//! latency for throughput:
//!
//! 1. **Submission**: callers enqueue requests and get an `IndexTicket` back
//! 2. **Collector**: accumulates requests and cuts batches on size or time
//! 3. **Workers**: send batches concurrently and retry transient failures
//!
//! Each ticket resolves once its document has been written or has failed
//! for good.

mod indexer;
mod ticket;
mod worker;

pub use indexer::{BulkIndexer, BulkIndexerStats};
pub use ticket::IndexTicket;
