use elasticsearch::http::transport::BuildError;
use rdkafka::error::KafkaError;
use resilience::RetryError;
use thiserror::Error;

/// A raw stream payload could not be parsed as a change batch.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid change batch payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures talking to the index store. A failed document write is reported
/// through this type as well.
#[derive(Debug, Error)]
pub enum IndexStoreError {
    #[error("invalid Elasticsearch URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to build transport: {0}")]
    TransportBuild(#[from] BuildError),
    #[error("transport error: {0}")]
    Transport(#[from] elasticsearch::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Index existence check or creation failed. Never fatal.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("failed to check whether index '{index}' exists: {source}")]
    ExistenceCheck {
        index: String,
        #[source]
        source: IndexStoreError,
    },
    #[error("failed to create index '{index}': {source}")]
    Create {
        index: String,
        #[source]
        source: IndexStoreError,
    },
}

/// Failures of the change stream transport.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),
    #[error("metadata probe task failed: {0}")]
    ProbeTask(String),
    #[error("change stream closed")]
    Closed,
}

/// Startup failures that leave the consumer with nothing to do.
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("failed to create Kafka consumer: {0}")]
    Create(#[source] KafkaError),
    #[error("failed to subscribe to topic '{topic}': {source}")]
    Subscribe {
        topic: String,
        #[source]
        source: KafkaError,
    },
    #[error("Kafka brokers never became ready: {0}")]
    NotReady(#[from] RetryError<StreamError>),
    #[error("failed to bind telemetry server on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}
