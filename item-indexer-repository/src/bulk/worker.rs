//! Flush workers.
//!
//! Workers share one batch receiver; whichever is idle takes the next batch.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, warn};

use crate::bulk::indexer::Counters;
use crate::bulk::ticket::PendingUpsert;
use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::types::UpsertDocumentRequest;

pub(crate) type BatchReceiver = Arc<Mutex<mpsc::Receiver<Vec<PendingUpsert>>>>;

pub(crate) struct FlushWorker {
    pub(crate) id: usize,
    pub(crate) provider: Arc<dyn SearchIndexProvider>,
    pub(crate) max_retries: u32,
    pub(crate) retry_backoff: Duration,
    pub(crate) counters: Arc<Counters>,
}

impl FlushWorker {
    /// Take batches until the collector closes the batch channel.
    pub(crate) async fn run(self, batches: BatchReceiver) {
        loop {
            let batch = {
                let mut receiver = batches.lock().await;
                receiver.recv().await
            };
            match batch {
                Some(batch) => self.flush(batch).await,
                None => break,
            }
        }
        debug!(worker_id = self.id, "Flush worker stopped");
    }

    /// Write one batch, retrying transient failures.
    ///
    /// Only the documents that failed transiently are sent again; every
    /// document is completed exactly once.
    async fn flush(&self, batch: Vec<PendingUpsert>) {
        let mut pending = batch;
        let mut attempt: u32 = 0;

        loop {
            let requests: Vec<UpsertDocumentRequest> =
                pending.iter().map(|p| p.request.clone()).collect();
            self.counters.requests.fetch_add(1, Ordering::Relaxed);

            debug!(
                worker_id = self.id,
                count = requests.len(),
                attempt = attempt,
                "Sending bulk request"
            );

            let can_retry = attempt < self.max_retries;
            let mut retry = Vec::new();

            match self.provider.bulk_upsert_documents(&requests).await {
                Ok(summary) => {
                    let mut results = summary.results.into_iter();
                    for upsert in pending {
                        let result = results.next().map(|r| (r.success, r.error)).unwrap_or((
                            false,
                            Some(SearchIndexError::parse("Missing item in bulk response")),
                        ));
                        match result {
                            (true, _) => {
                                self.counters.flushed.fetch_add(1, Ordering::Relaxed);
                                upsert.complete(Ok(()));
                            }
                            (false, error) => {
                                let error = error.unwrap_or_else(|| {
                                    SearchIndexError::unknown("Bulk item failed without error")
                                });
                                if can_retry && error.is_transient() {
                                    retry.push(upsert);
                                } else {
                                    self.fail(upsert, error);
                                }
                            }
                        }
                    }
                }
                Err(e) if can_retry && e.is_transient() => {
                    warn!(
                        worker_id = self.id,
                        count = pending.len(),
                        attempt = attempt,
                        error = %e,
                        "Bulk request failed, retrying"
                    );
                    retry = pending;
                }
                Err(e) => {
                    error!(
                        worker_id = self.id,
                        count = pending.len(),
                        error = %e,
                        "Bulk request failed"
                    );
                    for upsert in pending {
                        self.fail(upsert, e.clone());
                    }
                }
            }

            if retry.is_empty() {
                return;
            }

            attempt += 1;
            pending = retry;
            tokio::time::sleep(self.retry_backoff).await;
        }
    }

    fn fail(&self, upsert: PendingUpsert, error: SearchIndexError) {
        self.counters.failed.fetch_add(1, Ordering::Relaxed);
        warn!(
            worker_id = self.id,
            document_id = %upsert.request.document_id,
            error = %error,
            "Failed to index document"
        );
        upsert.complete(Err(error));
    }
}
