use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::models::RawChangeMessage;
use crate::config::KafkaConfig;
use crate::error::{ConsumerError, StreamError};

const METADATA_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of raw change messages for the pipeline.
#[async_trait]
pub trait ChangeStream: Send + Sync {
    /// Wait for the next message. [`StreamError::Closed`] ends consumption;
    /// any other error is transient.
    async fn next_message(&self) -> Result<RawChangeMessage, StreamError>;

    /// Mark `message` as done so its offset may be committed.
    fn acknowledge(&self, message: &RawChangeMessage) -> Result<(), StreamError>;

    /// Round-trip to the brokers, used while waiting for them at startup.
    async fn probe(&self) -> Result<(), StreamError>;
}

/// Kafka subscription to a single topic.
///
/// Offsets are auto-committed, but only offsets the pipeline has
/// acknowledged are stored, so a commit never runs ahead of processing.
pub struct KafkaChangeStream {
    consumer: Arc<StreamConsumer>,
    topic: String,
}

impl KafkaChangeStream {
    pub fn connect(config: &KafkaConfig) -> Result<Self, ConsumerError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("client.id", &config.client_id)
            .set("enable.auto.commit", "true")
            .set("auto.commit.interval.ms", "5000")
            .set("enable.auto.offset.store", "false")
            .set("auto.offset.reset", "latest")
            .set("enable.partition.eof", "false")
            .set("session.timeout.ms", "30000")
            .set("max.poll.interval.ms", "300000")
            .set("retry.backoff.ms", "100")
            .create()
            .map_err(ConsumerError::Create)?;

        consumer
            .subscribe(&[config.topic.as_str()])
            .map_err(|source| ConsumerError::Subscribe {
                topic: config.topic.clone(),
                source,
            })?;

        info!(
            topic = %config.topic,
            group_id = %config.group_id,
            "Subscribed to CDC topic"
        );

        Ok(Self {
            consumer: Arc::new(consumer),
            topic: config.topic.clone(),
        })
    }
}

#[async_trait]
impl ChangeStream for KafkaChangeStream {
    async fn next_message(&self) -> Result<RawChangeMessage, StreamError> {
        let message = self.consumer.recv().await?;

        Ok(RawChangeMessage {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        })
    }

    fn acknowledge(&self, message: &RawChangeMessage) -> Result<(), StreamError> {
        // The stored offset is the next one to read.
        self.consumer
            .store_offset(&message.topic, message.partition, message.offset + 1)?;
        Ok(())
    }

    async fn probe(&self) -> Result<(), StreamError> {
        let consumer = Arc::clone(&self.consumer);
        let topic = self.topic.clone();

        // librdkafka metadata requests block the calling thread.
        tokio::task::spawn_blocking(move || {
            consumer
                .fetch_metadata(Some(&topic), METADATA_TIMEOUT)
                .map(|_| ())
        })
        .await
        .map_err(|e| StreamError::ProbeTask(e.to_string()))??;

        Ok(())
    }
}
