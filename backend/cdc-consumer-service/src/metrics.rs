//! Prometheus metrics for the CDC consumer.
//!
//! All collectors live in a registry owned by [`CdcMetrics`]; the pipeline
//! increments it and the telemetry endpoint renders it. Counters are atomic,
//! so one writer and any number of concurrent readers need no extra locking.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Rendered text exposition plus the content type to serve it with.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub body: Vec<u8>,
    pub content_type: String,
}

pub struct CdcMetrics {
    registry: Registry,
    /// Successful writes labelled by source table and operation
    operations_total: IntCounterVec,
    /// Successful writes
    events_processed_total: IntCounter,
    /// Undecodable messages plus failed writes
    events_errors_total: IntCounter,
    /// Transport receive errors
    consumer_errors_total: IntCounter,
}

impl CdcMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let operations_total = IntCounterVec::new(
            Opts::new(
                "tidb_cdc_operations_total",
                "Total number of TiDB CDC operations processed",
            ),
            &["table_name", "operation_type"],
        )?;

        let events_processed_total = IntCounter::new(
            "cdc_events_processed_total",
            "Total number of CDC events processed",
        )?;

        let events_errors_total = IntCounter::new(
            "cdc_events_errors_total",
            "Total number of CDC event processing errors",
        )?;

        let consumer_errors_total = IntCounter::new(
            "cdc_consumer_errors_total",
            "Total number of Kafka consumer errors encountered",
        )?;

        registry.register(Box::new(operations_total.clone()))?;
        registry.register(Box::new(events_processed_total.clone()))?;
        registry.register(Box::new(events_errors_total.clone()))?;
        registry.register(Box::new(consumer_errors_total.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry,
            operations_total,
            events_processed_total,
            events_errors_total,
            consumer_errors_total,
        })
    }

    /// A document for `table`/`operation_type` was written.
    pub fn record_indexed(&self, table: &str, operation_type: &str) {
        self.operations_total
            .with_label_values(&[table, operation_type])
            .inc();
        self.events_processed_total.inc();
    }

    /// A message failed to decode or a document failed to write.
    pub fn record_event_error(&self) {
        self.events_errors_total.inc();
    }

    pub fn record_consumer_error(&self) {
        self.consumer_errors_total.inc();
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed_total.get()
    }

    pub fn events_errored(&self) -> u64 {
        self.events_errors_total.get()
    }

    pub fn consumer_errors(&self) -> u64 {
        self.consumer_errors_total.get()
    }

    pub fn operations(&self, table: &str, operation_type: &str) -> u64 {
        self.operations_total
            .get_metric_with_label_values(&[table, operation_type])
            .map(|counter| counter.get())
            .unwrap_or(0)
    }

    /// Render every registered collector in the text exposition format.
    pub fn render(&self) -> prometheus::Result<MetricsSnapshot> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut body = Vec::new();
        encoder.encode(&metric_families, &mut body)?;

        Ok(MetricsSnapshot {
            body,
            content_type: encoder.format_type().to_string(),
        })
    }
}
