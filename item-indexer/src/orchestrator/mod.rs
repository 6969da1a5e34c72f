//! Orchestrator module for the item indexer ingest.
//!
//! Coordinates the consumer, processor, and loader components, and decides
//! how every delivery is settled.

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval_at, Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::consumer::{Disposition, StreamMessage};
use crate::errors::IngestError;
use crate::loader::SearchLoader;
use crate::processor::ItemProcessor;
use item_indexer_repository::{IndexTicket, SearchIndexError};
use item_indexer_shared::SourceItem;

/// Source of item messages.
///
/// Implemented by the RabbitMQ consumer and by test doubles.
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Prepare the subscription; called once before `run`.
    async fn subscribe(&self) -> Result<(), IngestError>;

    /// Forward items on `sender` and apply the settlements received on
    /// `ack_receiver`.
    ///
    /// Must send `StreamMessage::End` once no further item will be sent, and
    /// return once `ack_receiver` is closed.
    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        ack_receiver: mpsc::Receiver<StreamMessage>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError>;

    /// Release the broker connection.
    async fn close(&self) -> Result<(), IngestError>;
}

/// When a delivery is acknowledged to the broker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AckMode {
    /// As soon as the bulk indexer accepted the document.
    ///
    /// Write failures are logged but the message is already gone.
    #[default]
    OnSubmit,
    /// Only once the bulk write containing the document succeeded.
    OnFlush,
}

impl FromStr for AckMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "submit" | "on_submit" | "on-submit" => Ok(Self::OnSubmit),
            "flush" | "on_flush" | "on-flush" => Ok(Self::OnFlush),
            other => Err(format!("unknown ack mode '{}'", other)),
        }
    }
}

impl fmt::Display for AckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnSubmit => write!(f, "submit"),
            Self::OnFlush => write!(f, "flush"),
        }
    }
}

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Size of the message channel buffers.
    ///
    /// Must be at least the broker prefetch count, and the prefetch count
    /// must be non-zero: `buffer >= prefetch > 0`.
    pub channel_buffer_size: usize,
    pub ack_mode: AckMode,
    /// Requeue messages whose document could not be submitted or written.
    pub requeue_on_write_failure: bool,
    /// Period of the progress log.
    pub progress_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 1000,
            ack_mode: AckMode::default(),
            requeue_on_write_failure: false,
            progress_interval: Duration::from_secs(10),
        }
    }
}

/// Outcome of a document write, with the delivery still waiting for it.
struct WriteOutcome {
    delivery_tag: Option<u64>,
    document_id: String,
    result: Result<(), SearchIndexError>,
}

type PendingWrites = FuturesUnordered<BoxFuture<'static, WriteOutcome>>;

/// Counters reported by the progress log.
#[derive(Debug, Default)]
struct Progress {
    items_received: AtomicU64,
    documents_submitted: AtomicU64,
    documents_indexed: AtomicU64,
    messages_rejected: AtomicU64,
    write_failures: AtomicU64,
}

/// Orchestrator that coordinates the ingest components.
///
/// The orchestrator:
/// - Manages the lifecycle of ingest components
/// - Routes items from the consumer through the processor to the loader
/// - Settles every forwarded delivery exactly once
/// - Handles shutdown signals and drains in-flight work
/// - Logs ingest progress
pub struct Orchestrator {
    consumer: Arc<dyn Consumer>,
    processor: ItemProcessor,
    loader: SearchLoader,
    config: OrchestratorConfig,
    shutdown_tx: broadcast::Sender<()>,
    progress: Arc<Progress>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(consumer: Arc<dyn Consumer>, processor: ItemProcessor, loader: SearchLoader) -> Self {
        Self::with_config(consumer, processor, loader, OrchestratorConfig::default())
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        consumer: Arc<dyn Consumer>,
        processor: ItemProcessor,
        loader: SearchLoader,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            consumer,
            processor,
            loader,
            config,
            shutdown_tx,
            progress: Arc::new(Progress::default()),
        }
    }

    /// Handle used to trigger a graceful shutdown while `run` is in progress.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Run the orchestrator.
    ///
    /// Starts the consumer and processes items until the consumer stream
    /// ends, then drains: the loader is closed (flushing every buffered
    /// document), every pending write is settled, and the consumer is
    /// awaited.
    ///
    /// SIGINT and SIGTERM stop the consumer and start the drain.
    ///
    /// When the consumer ended with an error (for example a lost broker
    /// connection) that error is returned once the drain is complete.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> Result<(), IngestError> {
        info!(
            ack_mode = %self.config.ack_mode,
            requeue_on_write_failure = self.config.requeue_on_write_failure,
            transform_policy = %self.processor.policy(),
            "Starting item indexer orchestrator"
        );

        // Check if loader is ready
        self.loader.check_ready().await?;

        self.consumer.subscribe().await?;

        // Create event channel
        let (event_transmitter, mut event_receiver) =
            mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);

        // Create acknowledgment channel
        let (ack_transmitter, ack_receiver) =
            mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);

        // Start consumer in background
        let consumer = self.consumer.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();
        let consumer_handle = tokio::spawn(async move {
            let result = consumer
                .run(event_transmitter, ack_receiver, shutdown_rx)
                .await;
            if let Err(ref e) = result {
                error!(error = %e, "Consumer error");
            }
            result
        });

        info!("Ready to process items from RabbitMQ");

        let mut pending_writes = PendingWrites::new();
        let mut progress_timer = interval_at(
            Instant::now() + self.config.progress_interval,
            self.config.progress_interval,
        );
        progress_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut rates = RateTracker::default();

        let signal = shutdown_signal();
        tokio::pin!(signal);
        let mut signalled = false;

        loop {
            tokio::select! {
                msg = event_receiver.recv() => {
                    match msg {
                        Some(StreamMessage::Item { delivery_tag, item, redelivered }) => {
                            if redelivered {
                                debug!(delivery_tag = delivery_tag, "Processing redelivered message");
                            }
                            self.handle_item(delivery_tag, item, &ack_transmitter, &mut pending_writes)
                                .await;
                        }
                        Some(StreamMessage::Error(e)) => {
                            error!(error = %e, "Received error from consumer");
                        }
                        Some(StreamMessage::End) | None => {
                            info!("Consumer stream ended");
                            break;
                        }
                        Some(StreamMessage::Acknowledgment { .. }) => {
                            // Ignore acknowledgments received on the wrong channel
                            warn!("Received acknowledgment on event channel (should be on ack channel)");
                        }
                    }
                }
                Some(outcome) = pending_writes.next(), if !pending_writes.is_empty() => {
                    self.handle_write_outcome(outcome, &ack_transmitter).await;
                }
                _ = &mut signal, if !signalled => {
                    info!("Received shutdown signal");
                    signalled = true;
                    self.shutdown();
                }
                _ = progress_timer.tick() => {
                    rates.log(&self.progress);
                }
            }
        }

        // Forwarded items are all handled; flush what the bulk indexer holds
        // and settle the deliveries still waiting for their write.
        match self.loader.close().await {
            Ok(stats) => info!(
                flushed = stats.flushed,
                failed = stats.failed,
                requests = stats.requests,
                "Bulk indexer drained"
            ),
            Err(e) => error!(error = %e, "Failed to drain bulk indexer"),
        }

        while let Some(outcome) = pending_writes.next().await {
            self.handle_write_outcome(outcome, &ack_transmitter).await;
        }

        // Closing the acknowledgment channel lets the consumer finish
        drop(ack_transmitter);
        let consumer_result = match consumer_handle.await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "Consumer task panicked");
                Err(IngestError::channel(format!("Consumer task failed: {}", e)))
            }
        };

        rates.log(&self.progress);
        match consumer_result {
            Ok(()) => {
                info!("Orchestrator shutdown complete");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Orchestrator stopped after a consumer failure");
                Err(e)
            }
        }
    }

    /// Transform and submit one item, then settle or track its delivery.
    async fn handle_item(
        &self,
        delivery_tag: u64,
        item: SourceItem,
        acks: &mpsc::Sender<StreamMessage>,
        pending_writes: &mut PendingWrites,
    ) {
        self.progress.items_received.fetch_add(1, Ordering::Relaxed);

        let processed = match self.processor.process(&item) {
            Ok(processed) => processed,
            Err(e) => {
                warn!(
                    delivery_tag = delivery_tag,
                    source = %item.source,
                    id = %item.id,
                    error = %e,
                    "Failed to transform item, rejecting message"
                );
                self.progress.messages_rejected.fetch_add(1, Ordering::Relaxed);
                Self::send_ack(acks, delivery_tag, Disposition::Reject, Some(e.to_string())).await;
                return;
            }
        };

        let document_id = processed.document_id.clone();
        let ticket = match self.loader.submit(processed).await {
            Ok(ticket) => ticket,
            Err(e) => {
                error!(
                    delivery_tag = delivery_tag,
                    document_id = %document_id,
                    error = %e,
                    "Failed to submit document"
                );
                let disposition = self.write_failure_disposition();
                if disposition == Disposition::Reject {
                    self.progress.messages_rejected.fetch_add(1, Ordering::Relaxed);
                }
                Self::send_ack(acks, delivery_tag, disposition, Some(e.to_string())).await;
                return;
            }
        };
        self.progress.documents_submitted.fetch_add(1, Ordering::Relaxed);

        let awaiting_tag = match self.config.ack_mode {
            AckMode::OnSubmit => {
                Self::send_ack(acks, delivery_tag, Disposition::Ack, None).await;
                None
            }
            AckMode::OnFlush => Some(delivery_tag),
        };
        pending_writes.push(watch_write(awaiting_tag, ticket));
    }

    /// Record a write outcome and settle its delivery if it was waiting.
    async fn handle_write_outcome(&self, outcome: WriteOutcome, acks: &mpsc::Sender<StreamMessage>) {
        match outcome.result {
            Ok(()) => {
                self.progress.documents_indexed.fetch_add(1, Ordering::Relaxed);
                if let Some(delivery_tag) = outcome.delivery_tag {
                    Self::send_ack(acks, delivery_tag, Disposition::Ack, None).await;
                }
            }
            Err(e) => {
                self.progress.write_failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    document_id = %outcome.document_id,
                    error = %e,
                    "Failed to index document"
                );
                if let Some(delivery_tag) = outcome.delivery_tag {
                    let disposition = self.write_failure_disposition();
                    if disposition == Disposition::Reject {
                        self.progress.messages_rejected.fetch_add(1, Ordering::Relaxed);
                    }
                    Self::send_ack(acks, delivery_tag, disposition, Some(e.to_string())).await;
                }
            }
        }
    }

    fn write_failure_disposition(&self) -> Disposition {
        if self.config.requeue_on_write_failure {
            Disposition::Requeue
        } else {
            Disposition::Reject
        }
    }

    async fn send_ack(
        acks: &mpsc::Sender<StreamMessage>,
        delivery_tag: u64,
        disposition: Disposition,
        error: Option<String>,
    ) {
        if acks
            .send(StreamMessage::ack(delivery_tag, disposition, error))
            .await
            .is_err()
        {
            warn!(
                delivery_tag = delivery_tag,
                disposition = ?disposition,
                "Acknowledgment channel closed, delivery left unsettled"
            );
        }
    }
}

fn watch_write(delivery_tag: Option<u64>, ticket: IndexTicket) -> BoxFuture<'static, WriteOutcome> {
    let document_id = ticket.document_id().to_string();
    async move {
        let result = ticket.wait().await;
        WriteOutcome {
            delivery_tag,
            document_id,
            result,
        }
    }
    .boxed()
}

/// Resolves on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Tracks previous counter values for rate calculation.
struct RateTracker {
    prev_items: u64,
    prev_docs: u64,
    prev_time: std::time::Instant,
}

impl Default for RateTracker {
    fn default() -> Self {
        Self {
            prev_items: 0,
            prev_docs: 0,
            prev_time: std::time::Instant::now(),
        }
    }
}

impl RateTracker {
    fn log(&mut self, progress: &Progress) {
        let items = progress.items_received.load(Ordering::Relaxed);
        let docs = progress.documents_indexed.load(Ordering::Relaxed);

        let now = std::time::Instant::now();
        let elapsed_secs = now.duration_since(self.prev_time).as_secs_f64();

        let (items_per_sec, docs_per_sec) = if elapsed_secs > 0.0 {
            (
                (items.saturating_sub(self.prev_items) as f64) / elapsed_secs,
                (docs.saturating_sub(self.prev_docs) as f64) / elapsed_secs,
            )
        } else {
            (0.0, 0.0)
        };

        info!(
            items_received = items,
            documents_submitted = progress.documents_submitted.load(Ordering::Relaxed),
            documents_indexed = docs,
            messages_rejected = progress.messages_rejected.load(Ordering::Relaxed),
            write_failures = progress.write_failures.load(Ordering::Relaxed),
            items_per_sec = format!("{:.2}", items_per_sec),
            documents_per_sec = format!("{:.2}", docs_per_sec),
            "Processing progress"
        );

        self.prev_items = items;
        self.prev_docs = docs;
        self.prev_time = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_mode_from_str() {
        assert_eq!("submit".parse::<AckMode>(), Ok(AckMode::OnSubmit));
        assert_eq!("FLUSH".parse::<AckMode>(), Ok(AckMode::OnFlush));
        assert_eq!("on-flush".parse::<AckMode>(), Ok(AckMode::OnFlush));
        assert!("never".parse::<AckMode>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.ack_mode, AckMode::OnSubmit);
        assert!(!config.requeue_on_write_failure);
        assert_eq!(config.progress_interval, Duration::from_secs(10));
    }
}
