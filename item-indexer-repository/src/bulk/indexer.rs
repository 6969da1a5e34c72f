//! Bulk indexer implementation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::bulk::ticket::{IndexTicket, PendingUpsert};
use crate::bulk::worker::FlushWorker;
use crate::config::BulkIndexerConfig;
use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::types::UpsertDocumentRequest;

/// Shortest flush interval accepted; a zero period would spin the collector.
const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) added: AtomicU64,
    pub(crate) flushed: AtomicU64,
    pub(crate) failed: AtomicU64,
    pub(crate) requests: AtomicU64,
}

/// Snapshot of the bulk indexer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkIndexerStats {
    /// Documents accepted by `submit`.
    pub added: u64,
    /// Documents written successfully.
    pub flushed: u64,
    /// Documents that failed for good.
    pub failed: u64,
    /// Bulk requests sent, retries included.
    pub requests: u64,
}

/// Buffers document upserts and writes them with bulk requests.
///
/// The bulk indexer:
/// - Accepts documents through a bounded submission queue
/// - Flushes when the buffered payload reaches `flush_bytes` or when
///   `flush_interval` has elapsed since the last flush
/// - Sends batches from a fixed pool of workers
/// - Reports each document's outcome through its `IndexTicket`
///
/// `close` must be called to flush the remaining documents and wait for
/// them. Dropping the indexer closes the submission queue as well, in which
/// case the remaining documents are flushed in the background.
pub struct BulkIndexer {
    sender: Option<mpsc::Sender<PendingUpsert>>,
    collector: Option<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl BulkIndexer {
    /// Start a bulk indexer writing through the given provider.
    ///
    /// Spawns the collector and worker tasks, so it must be called from
    /// within a Tokio runtime.
    pub fn new(provider: Arc<dyn SearchIndexProvider>, config: BulkIndexerConfig) -> Self {
        let num_workers = config.num_workers.max(1);
        let counters = Arc::new(Counters::default());

        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let (batch_sender, batch_receiver) = mpsc::channel(num_workers);
        let batch_receiver = Arc::new(Mutex::new(batch_receiver));

        let workers = (0..num_workers)
            .map(|id| {
                let worker = FlushWorker {
                    id,
                    provider: provider.clone(),
                    max_retries: config.max_retries,
                    retry_backoff: config.retry_backoff,
                    counters: counters.clone(),
                };
                tokio::spawn(worker.run(batch_receiver.clone()))
            })
            .collect();

        let collector = Collector {
            flush_bytes: config.flush_bytes.max(1),
            flush_interval: config.flush_interval.max(MIN_FLUSH_INTERVAL),
            batches: batch_sender,
            workers,
        };
        let collector = tokio::spawn(collector.run(receiver));

        info!(
            num_workers = num_workers,
            flush_bytes = config.flush_bytes,
            flush_interval_ms = config.flush_interval.as_millis() as u64,
            max_retries = config.max_retries,
            "Started bulk indexer"
        );

        Self {
            sender: Some(sender),
            collector: Some(collector),
            counters,
        }
    }

    /// Enqueue a document for the next flush.
    ///
    /// Returns as soon as the document is in the submission queue; waits only
    /// while the queue is full.
    ///
    /// # Returns
    ///
    /// * `Ok(IndexTicket)` - Handle resolving once the document is written
    /// * `Err(SearchIndexError::IndexerClosed)` - If the indexer was closed
    pub async fn submit(&self, request: UpsertDocumentRequest) -> Result<IndexTicket, SearchIndexError> {
        let sender = self.sender.as_ref().ok_or(SearchIndexError::IndexerClosed)?;

        let (pending, ticket) = PendingUpsert::new(request);
        sender
            .send(pending)
            .await
            .map_err(|_| SearchIndexError::IndexerClosed)?;

        self.counters.added.fetch_add(1, Ordering::Relaxed);
        Ok(ticket)
    }

    /// Current counters.
    pub fn stats(&self) -> BulkIndexerStats {
        BulkIndexerStats {
            added: self.counters.added.load(Ordering::Relaxed),
            flushed: self.counters.flushed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            requests: self.counters.requests.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting documents, flush the buffer and wait for the workers.
    ///
    /// Calling `close` again is a no-op returning the final counters.
    #[instrument(skip(self))]
    pub async fn close(&mut self) -> Result<BulkIndexerStats, SearchIndexError> {
        drop(self.sender.take());

        if let Some(collector) = self.collector.take() {
            collector
                .await
                .map_err(|e| SearchIndexError::unknown(format!("Bulk indexer task failed: {}", e)))?;
        }

        let stats = self.stats();
        info!(
            added = stats.added,
            flushed = stats.flushed,
            failed = stats.failed,
            requests = stats.requests,
            "Bulk indexer closed"
        );
        Ok(stats)
    }
}

impl Drop for BulkIndexer {
    fn drop(&mut self) {
        if self.collector.is_some() {
            warn!("Bulk indexer dropped without close, remaining documents are flushed in the background");
        }
    }
}

/// Accumulates submitted documents and cuts them into batches.
struct Collector {
    flush_bytes: usize,
    flush_interval: Duration,
    batches: mpsc::Sender<Vec<PendingUpsert>>,
    workers: Vec<JoinHandle<()>>,
}

impl Collector {
    async fn run(self, mut receiver: mpsc::Receiver<PendingUpsert>) {
        let mut buffer: Vec<PendingUpsert> = Vec::new();
        let mut buffered_bytes: usize = 0;

        let mut ticker = interval_at(Instant::now() + self.flush_interval, self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                pending = receiver.recv() => {
                    match pending {
                        Some(pending) => {
                            buffered_bytes += pending.request.estimated_size();
                            buffer.push(pending);

                            if buffered_bytes >= self.flush_bytes {
                                debug!(count = buffer.len(), bytes = buffered_bytes, "Flushing on size");
                                self.dispatch(&mut buffer, &mut buffered_bytes).await;
                                ticker.reset();
                            }
                        }
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    if !buffer.is_empty() {
                        debug!(count = buffer.len(), bytes = buffered_bytes, "Flushing on interval");
                        self.dispatch(&mut buffer, &mut buffered_bytes).await;
                    }
                }
            }
        }

        if !buffer.is_empty() {
            debug!(count = buffer.len(), "Flushing remaining documents");
            self.dispatch(&mut buffer, &mut buffered_bytes).await;
        }

        let Collector {
            batches, workers, ..
        } = self;
        drop(batches);

        for worker in workers {
            if let Err(e) = worker.await {
                error!(error = %e, "Flush worker panicked");
            }
        }
    }

    /// Hand the buffered documents to the next idle worker.
    async fn dispatch(&self, buffer: &mut Vec<PendingUpsert>, buffered_bytes: &mut usize) {
        let batch = std::mem::take(buffer);
        *buffered_bytes = 0;

        if let Err(mpsc::error::SendError(batch)) = self.batches.send(batch).await {
            error!(count = batch.len(), "No flush worker left to take the batch");
            for pending in batch {
                pending.complete(Err(SearchIndexError::IndexerClosed));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BatchOperationResult, BatchOperationSummary};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::AtomicUsize;
    use tokio::time::timeout;

    /// In-memory provider applying upserts to a map, last write wins.
    #[derive(Default)]
    struct MockSearchProvider {
        documents: std::sync::Mutex<HashMap<String, Value>>,
        batches: std::sync::Mutex<Vec<Vec<String>>>,
        transient_failures: AtomicUsize,
        rejected_ids: HashSet<String>,
    }

    impl MockSearchProvider {
        fn failing_transiently(times: usize) -> Self {
            let provider = Self::default();
            provider.transient_failures.store(times, Ordering::SeqCst);
            provider
        }

        fn rejecting(ids: &[&str]) -> Self {
            Self {
                rejected_ids: ids.iter().map(|id| id.to_string()).collect(),
                ..Self::default()
            }
        }

        fn batch_count(&self) -> usize {
            self.batches.lock().unwrap().len()
        }

        fn document_count(&self) -> usize {
            self.documents.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SearchIndexProvider for MockSearchProvider {
        async fn check_connection(&self) -> Result<(), SearchIndexError> {
            Ok(())
        }

        async fn ensure_index_exists(&self) -> Result<(), SearchIndexError> {
            Ok(())
        }

        async fn bulk_upsert_documents(
            &self,
            requests: &[UpsertDocumentRequest],
        ) -> Result<BatchOperationSummary, SearchIndexError> {
            let remaining = self.transient_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.transient_failures.store(remaining - 1, Ordering::SeqCst);
                return Err(SearchIndexError::connection("connection refused"));
            }

            self.batches
                .lock()
                .unwrap()
                .push(requests.iter().map(|r| r.document_id.clone()).collect());

            let mut documents = self.documents.lock().unwrap();
            let results = requests
                .iter()
                .map(|r| {
                    if self.rejected_ids.contains(&r.document_id) {
                        return BatchOperationResult {
                            document_id: r.document_id.clone(),
                            success: false,
                            error: Some(SearchIndexError::request_failed(
                                400,
                                "mapper_parsing_exception",
                            )),
                        };
                    }
                    documents.insert(r.document_id.clone(), r.document.clone());
                    BatchOperationResult {
                        document_id: r.document_id.clone(),
                        success: true,
                        error: None,
                    }
                })
                .collect();

            Ok(BatchOperationSummary::from_results(results))
        }
    }

    fn request(id: &str, name: &str) -> UpsertDocumentRequest {
        UpsertDocumentRequest::new(id, &json!({ "source": "ikea", "name": { "en": name } }))
            .unwrap()
    }

    fn config(flush_bytes: usize, flush_interval: Duration) -> BulkIndexerConfig {
        BulkIndexerConfig::default()
            .with_workers(2)
            .with_flush(flush_bytes, flush_interval)
            .with_retries(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_flush_on_size_without_waiting_for_interval() {
        let provider = Arc::new(MockSearchProvider::default());
        let mut indexer = BulkIndexer::new(
            provider.clone(),
            config(1, Duration::from_secs(3600)),
        );

        let ticket = indexer.submit(request("ikea-1", "Chair")).await.unwrap();
        let result = timeout(Duration::from_secs(2), ticket.wait()).await;

        assert!(result.is_ok(), "size threshold should trigger a flush");
        assert!(result.unwrap().is_ok());
        assert_eq!(provider.batch_count(), 1);

        indexer.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_documents_accumulate_until_size_threshold() {
        let provider = Arc::new(MockSearchProvider::default());
        let size = request("ikea-1", "Chair").estimated_size();
        let mut indexer = BulkIndexer::new(
            provider.clone(),
            config(size * 2, Duration::from_secs(3600)),
        );

        let first = indexer.submit(request("ikea-1", "Chair")).await.unwrap();
        let second = indexer.submit(request("ikea-2", "Table")).await.unwrap();

        timeout(Duration::from_secs(2), first.wait()).await.unwrap().unwrap();
        timeout(Duration::from_secs(2), second.wait()).await.unwrap().unwrap();

        let batches = provider.batches.lock().unwrap().clone();
        assert_eq!(batches, vec![vec!["ikea-1".to_string(), "ikea-2".to_string()]]);

        indexer.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_flush_on_interval_below_size_threshold() {
        let provider = Arc::new(MockSearchProvider::default());
        let mut indexer = BulkIndexer::new(
            provider.clone(),
            config(usize::MAX, Duration::from_millis(200)),
        );

        let ticket = indexer.submit(request("ikea-1", "Chair")).await.unwrap();
        assert_eq!(provider.batch_count(), 0);

        let result = timeout(Duration::from_secs(5), ticket.wait()).await;
        assert!(result.is_ok(), "interval should trigger a flush");
        assert!(result.unwrap().is_ok());
        assert_eq!(provider.batch_count(), 1);

        indexer.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_flushes_buffered_documents() {
        let provider = Arc::new(MockSearchProvider::default());
        let mut indexer = BulkIndexer::new(
            provider.clone(),
            config(usize::MAX, Duration::from_secs(3600)),
        );

        let mut tickets = Vec::new();
        for i in 0..3 {
            tickets.push(
                indexer
                    .submit(request(&format!("ikea-{}", i), "Chair"))
                    .await
                    .unwrap(),
            );
        }

        let stats = indexer.close().await.unwrap();
        assert_eq!(stats.added, 3);
        assert_eq!(stats.flushed, 3);
        assert_eq!(stats.failed, 0);
        assert_eq!(provider.document_count(), 3);

        for ticket in tickets {
            assert!(ticket.wait().await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_submit_after_close_fails() {
        let provider = Arc::new(MockSearchProvider::default());
        let mut indexer = BulkIndexer::new(provider, BulkIndexerConfig::default());

        indexer.close().await.unwrap();
        let result = indexer.submit(request("ikea-1", "Chair")).await;

        assert!(matches!(result, Err(SearchIndexError::IndexerClosed)));
        assert!(indexer.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let provider = Arc::new(MockSearchProvider::failing_transiently(2));
        let mut indexer = BulkIndexer::new(
            provider.clone(),
            config(1, Duration::from_secs(3600)),
        );

        let ticket = indexer.submit(request("ikea-1", "Chair")).await.unwrap();
        let result = timeout(Duration::from_secs(2), ticket.wait()).await.unwrap();
        assert!(result.is_ok());

        let stats = indexer.close().await.unwrap();
        assert_eq!(stats.requests, 3);
        assert_eq!(stats.flushed, 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_are_reported() {
        let provider = Arc::new(MockSearchProvider::failing_transiently(usize::MAX));
        let mut indexer = BulkIndexer::new(
            provider.clone(),
            config(1, Duration::from_secs(3600)).with_retries(2, Duration::from_millis(1)),
        );

        let ticket = indexer.submit(request("ikea-1", "Chair")).await.unwrap();
        let result = timeout(Duration::from_secs(2), ticket.wait()).await.unwrap();
        assert!(matches!(result, Err(SearchIndexError::ConnectionError(_))));

        let stats = indexer.close().await.unwrap();
        assert_eq!(stats.requests, 3);
        assert_eq!(stats.failed, 1);
        assert_eq!(provider.document_count(), 0);
    }

    #[tokio::test]
    async fn test_rejected_document_fails_alone() {
        let provider = Arc::new(MockSearchProvider::rejecting(&["ikea-bad"]));
        let mut indexer = BulkIndexer::new(
            provider.clone(),
            config(usize::MAX, Duration::from_secs(3600)),
        );

        let good = indexer.submit(request("ikea-good", "Chair")).await.unwrap();
        let bad = indexer.submit(request("ikea-bad", "Table")).await.unwrap();
        assert_eq!(bad.document_id(), "ikea-bad");

        let stats = indexer.close().await.unwrap();
        assert_eq!(stats.requests, 1, "permanent failures are not retried");
        assert_eq!(stats.flushed, 1);
        assert_eq!(stats.failed, 1);

        assert!(good.wait().await.is_ok());
        assert!(matches!(
            bad.wait().await,
            Err(SearchIndexError::RequestFailed { status: 400, .. })
        ));
    }

    #[tokio::test]
    async fn test_same_document_upserted_twice_keeps_last_write() {
        let provider = Arc::new(MockSearchProvider::default());
        let mut indexer = BulkIndexer::new(
            provider.clone(),
            config(usize::MAX, Duration::from_secs(3600)),
        );

        indexer.submit(request("ikea-1", "Chair")).await.unwrap();
        indexer.submit(request("ikea-1", "Armchair")).await.unwrap();
        indexer.close().await.unwrap();

        let documents = provider.documents.lock().unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents["ikea-1"]["name"]["en"], "Armchair");
    }
}
