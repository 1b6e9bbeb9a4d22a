use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::decoder::decode_now;
use super::models::{iso_timestamp, RawChangeMessage};
use super::stream::ChangeStream;
use crate::error::StreamError;
use crate::metrics::CdcMetrics;
use crate::services::IndexStore;

const MIN_BACKOFF_SECS: u64 = 1;
const MAX_BACKOFF_SECS: u64 = 60;

/// What happened to one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Undecodable,
    Processed { indexed: usize, failed: usize },
}

/// Totals for one run of the consumption loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub messages: u64,
    pub undecodable: u64,
    pub indexed: u64,
    pub failed: u64,
    pub stream_errors: u64,
}

/// Decodes change messages and writes the resulting documents, one message
/// and one document at a time.
pub struct Pipeline<S: ?Sized> {
    store: Arc<S>,
    metrics: Arc<CdcMetrics>,
}

impl<S> Pipeline<S>
where
    S: IndexStore + ?Sized,
{
    pub fn new(store: Arc<S>, metrics: Arc<CdcMetrics>) -> Self {
        Self { store, metrics }
    }

    /// Decode `message` and write each event in row order.
    ///
    /// Every failure is counted and logged here; a failed write does not stop
    /// the remaining events of the batch and nothing is retried.
    pub async fn process_message(&self, message: &RawChangeMessage) -> MessageOutcome {
        let events = match decode_now(&message.payload) {
            Ok(events) => events,
            Err(err) => {
                self.metrics.record_event_error();
                error!(
                    topic = %message.topic,
                    partition = message.partition,
                    offset = message.offset,
                    payload_bytes = message.payload.len(),
                    "Error processing CDC message: {}",
                    err
                );
                return MessageOutcome::Undecodable;
            }
        };

        if events.is_empty() {
            debug!(
                topic = %message.topic,
                partition = message.partition,
                offset = message.offset,
                "CDC message carried no row data"
            );
        }

        let mut indexed = 0;
        let mut failed = 0;

        for (position, event) in events.iter().enumerate() {
            match self.store.index_document(event).await {
                Ok(()) => {
                    indexed += 1;
                    self.metrics
                        .record_indexed(&event.table, &event.operation_type);
                    info!(
                        table = %event.table,
                        operation = %event.operation_type,
                        timestamp = %iso_timestamp(&event.timestamp),
                        "Processed CDC event"
                    );
                }
                Err(err) => {
                    failed += 1;
                    self.metrics.record_event_error();
                    error!(
                        topic = %message.topic,
                        partition = message.partition,
                        offset = message.offset,
                        row = position,
                        table = %event.table,
                        operation = %event.operation_type,
                        index = self.store.index_name(),
                        "Failed to index CDC event: {}",
                        err
                    );
                }
            }
        }

        MessageOutcome::Processed { indexed, failed }
    }

    /// Consume `stream` until it closes or `shutdown` fires.
    ///
    /// Shutdown is only observed while waiting for the next message (or
    /// backing off), so a received message is always fully processed and
    /// acknowledged before the loop exits.
    pub async fn run<C>(&self, stream: &C, mut shutdown: broadcast::Receiver<()>) -> RunSummary
    where
        C: ChangeStream + ?Sized,
    {
        info!("Starting CDC consumer loop");

        let mut summary = RunSummary::default();
        let mut consecutive_errors: u32 = 0;

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    info!("Stopping CDC consumer loop");
                    break;
                }
                next = stream.next_message() => next,
            };

            match next {
                Ok(message) => {
                    consecutive_errors = 0;
                    summary.messages += 1;

                    debug!(
                        topic = %message.topic,
                        partition = message.partition,
                        offset = message.offset,
                        "Received CDC message"
                    );

                    match self.process_message(&message).await {
                        MessageOutcome::Undecodable => summary.undecodable += 1,
                        MessageOutcome::Processed { indexed, failed } => {
                            summary.indexed += indexed as u64;
                            summary.failed += failed as u64;
                        }
                    }

                    if let Err(err) = stream.acknowledge(&message) {
                        warn!(
                            topic = %message.topic,
                            partition = message.partition,
                            offset = message.offset,
                            "Failed to store Kafka offset: {}",
                            err
                        );
                    }
                }
                Err(StreamError::Closed) => {
                    info!("Change stream closed");
                    break;
                }
                Err(err) => {
                    consecutive_errors += 1;
                    summary.stream_errors += 1;
                    self.metrics.record_consumer_error();

                    let backoff = consumer_backoff(consecutive_errors);
                    error!(
                        consecutive_errors,
                        backoff_secs = backoff.as_secs(),
                        "Kafka consumer error (will retry with backoff): {}",
                        err
                    );

                    tokio::select! {
                        biased;
                        _ = shutdown.recv() => {
                            info!("Stopping CDC consumer loop");
                            break;
                        }
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }

        info!(
            messages = summary.messages,
            indexed = summary.indexed,
            failed = summary.failed,
            undecodable = summary.undecodable,
            "CDC consumer loop finished"
        );
        summary
    }
}

/// Exponential backoff after consecutive receive errors: 1s, 2s, 4s, ... 60s.
fn consumer_backoff(consecutive_errors: u32) -> Duration {
    let secs = 2u64
        .saturating_pow(consecutive_errors.saturating_sub(1))
        .clamp(MIN_BACKOFF_SECS, MAX_BACKOFF_SECS);
    Duration::from_secs(secs)
}
