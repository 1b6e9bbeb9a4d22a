//! CDC consumer service
//!
//! Reads Canal-JSON change batches from Kafka, writes one Elasticsearch
//! document per changed row, and exposes Prometheus metrics plus a health
//! probe over HTTP.

pub mod config;
pub mod error;
pub mod events;
pub mod metrics;
pub mod readiness;
pub mod services;
pub mod telemetry;

pub use config::Config;
pub use error::{ConsumerError, DecodeError, IndexStoreError, ProvisionError, StreamError};
pub use events::{ChangeEvent, ChangeStream, KafkaChangeStream, Pipeline, RawChangeMessage};
pub use metrics::CdcMetrics;
pub use services::{ElasticsearchClient, IndexStore};
