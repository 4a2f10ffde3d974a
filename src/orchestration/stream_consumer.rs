//! # Stream Consumer
//!
//! Async delivery adapter feeding batches from a [`BatchSource`] into a
//! [`StreamProcessor`]. Batches are processed one at a time on the calling
//! task; there is no concurrency within or across batches.

use crate::error::Result;
use crate::events::StreamBatch;
use crate::orchestration::stream_processor::StreamProcessor;
use crate::orchestration::types::BatchSummary;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

/// Anything that yields change-stream batches
#[async_trait]
pub trait BatchSource: Send {
    /// Next batch, or `None` once the source is exhausted
    async fn next_batch(&mut self) -> Option<StreamBatch>;
}

/// Batch source backed by a bounded tokio channel
#[derive(Debug)]
pub struct ChannelBatchSource {
    receiver: mpsc::Receiver<StreamBatch>,
}

impl ChannelBatchSource {
    pub fn new(receiver: mpsc::Receiver<StreamBatch>) -> Self {
        Self { receiver }
    }

    /// Create a source together with the sender feeding it
    pub fn channel(capacity: usize) -> (mpsc::Sender<StreamBatch>, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        (sender, Self::new(receiver))
    }
}

#[async_trait]
impl BatchSource for ChannelBatchSource {
    async fn next_batch(&mut self) -> Option<StreamBatch> {
        self.receiver.recv().await
    }
}

/// Batch source adapting any `futures` stream of batches
pub struct StreamBatchSource<S> {
    stream: S,
}

impl<S> StreamBatchSource<S>
where
    S: Stream<Item = StreamBatch> + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl<S> BatchSource for StreamBatchSource<S>
where
    S: Stream<Item = StreamBatch> + Unpin + Send,
{
    async fn next_batch(&mut self) -> Option<StreamBatch> {
        self.stream.next().await
    }
}

/// Running totals across the batches a consumer has processed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsumerStats {
    pub batches_processed: u64,
    pub records_processed: u64,
    pub handler_invocations: u64,
    pub handler_failures: u64,
    pub last_batch_id: Option<Uuid>,
    pub last_batch_at: Option<DateTime<Utc>>,
}

impl ConsumerStats {
    fn record(&mut self, summary: &BatchSummary) {
        self.batches_processed += 1;
        self.records_processed += summary.record_count as u64;
        self.handler_invocations += summary.handler_invocations as u64;
        self.handler_failures += summary.failure_count() as u64;
        self.last_batch_id = Some(summary.batch_id);
        self.last_batch_at = Some(summary.finished_at);
    }
}

/// Drains a batch source into a stream processor
#[derive(Debug, Clone)]
pub struct StreamConsumer {
    processor: Arc<StreamProcessor>,
    stats: Arc<Mutex<ConsumerStats>>,
}

impl StreamConsumer {
    pub fn new(processor: Arc<StreamProcessor>) -> Self {
        Self {
            processor,
            stats: Arc::new(Mutex::new(ConsumerStats::default())),
        }
    }

    /// Snapshot of the running totals
    pub fn stats(&self) -> ConsumerStats {
        self.stats.lock().clone()
    }

    /// Process batches until the source is exhausted.
    ///
    /// Stops with the error of the first batch that fails to decode; the
    /// stats then cover the batches completed before it.
    pub async fn run<S>(&self, source: &mut S) -> Result<ConsumerStats>
    where
        S: BatchSource + ?Sized,
    {
        info!("🚀 STREAM_CONSUMER: Started");

        while let Some(batch) = source.next_batch().await {
            match self.processor.process_batch(&batch) {
                Ok(summary) => self.stats.lock().record(&summary),
                Err(e) => {
                    error!(
                        error = %e,
                        batches_processed = self.stats.lock().batches_processed,
                        "🛑 STREAM_CONSUMER: Stopping on batch failure"
                    );
                    return Err(e);
                }
            }
        }

        let stats = self.stats();
        info!(
            batches = stats.batches_processed,
            records = stats.records_processed,
            failures = stats.handler_failures,
            "✅ STREAM_CONSUMER: Source exhausted"
        );
        Ok(stats)
    }
}
