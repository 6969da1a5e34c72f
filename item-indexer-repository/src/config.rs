//! Configuration types for the BulkIndexer.

use std::time::Duration;

/// Configuration for the BulkIndexer.
///
/// Documents are buffered until either `flush_bytes` worth of payload has
/// accumulated or `flush_interval` has elapsed since the last flush.
#[derive(Debug, Clone)]
pub struct BulkIndexerConfig {
    /// Number of workers sending bulk requests concurrently.
    pub num_workers: usize,
    /// Buffered payload size that triggers a flush.
    pub flush_bytes: usize,
    /// Maximum time a document waits in the buffer.
    pub flush_interval: Duration,
    /// Capacity of the submission queue in front of the buffer.
    ///
    /// Submitters wait for space once it is full.
    pub queue_capacity: usize,
    /// Number of times a transient failure is retried before it is reported.
    pub max_retries: u32,
    /// Delay between two attempts of the same bulk request.
    pub retry_backoff: Duration,
}

impl Default for BulkIndexerConfig {
    fn default() -> Self {
        Self {
            num_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            flush_bytes: 5_000_000,
            flush_interval: Duration::from_secs(30),
            queue_capacity: 1000,
            max_retries: 3,
            retry_backoff: Duration::from_secs(1),
        }
    }
}

impl BulkIndexerConfig {
    /// Set the number of flush workers.
    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    /// Set both flush triggers.
    pub fn with_flush(mut self, flush_bytes: usize, flush_interval: Duration) -> Self {
        self.flush_bytes = flush_bytes;
        self.flush_interval = flush_interval;
        self
    }

    /// Set the retry policy for transient failures.
    pub fn with_retries(mut self, max_retries: u32, retry_backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff = retry_backoff;
        self
    }
}
