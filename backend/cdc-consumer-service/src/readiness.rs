//! Startup wait for Kafka and Elasticsearch.
//!
//! Both dependencies are probed with bounded exponential backoff before the
//! index is provisioned and consumption starts.

use resilience::{with_retry, RetryConfig};
use std::future::Future;
use tracing::{error, info, warn};

use crate::error::ConsumerError;
use crate::events::ChangeStream;
use crate::services::{ensure_index_exists, IndexStore};

/// How startup preparation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Startup {
    Ready,
    ShutdownRequested,
}

/// Wait for both dependencies and provision the index, giving up as soon as
/// `shutdown` resolves.
///
/// Provisioning failures are logged and do not fail startup.
pub async fn prepare<S, C, F>(
    store: &S,
    stream: &C,
    config: &RetryConfig,
    shutdown: F,
) -> Result<Startup, ConsumerError>
where
    S: IndexStore + ?Sized,
    C: ChangeStream + ?Sized,
    F: Future<Output = ()>,
{
    let startup = async {
        wait_for_index_store(store, config).await;
        wait_for_stream(stream, config).await?;

        if let Err(e) = ensure_index_exists(store).await {
            error!("Error creating index: {}", e);
        }
        Ok::<_, ConsumerError>(())
    };

    tokio::select! {
        biased;
        _ = shutdown => Ok(Startup::ShutdownRequested),
        result = startup => result.map(|()| Startup::Ready),
    }
}

/// Wait until the index store answers a ping.
///
/// Returns `false` once retries are exhausted; the caller carries on and lets
/// provisioning and writes report their own failures.
pub async fn wait_for_index_store<S>(store: &S, config: &RetryConfig) -> bool
where
    S: IndexStore + ?Sized,
{
    match with_retry("elasticsearch ping", config, || store.ping()).await {
        Ok(()) => {
            info!(index = store.index_name(), "Elasticsearch is reachable");
            true
        }
        Err(err) => {
            warn!(
                attempts = err.attempts(),
                "Elasticsearch not reachable, continuing startup: {}", err
            );
            false
        }
    }
}

/// Wait until the brokers answer a metadata request.
///
/// Exhausting retries is fatal: without the stream there is nothing to do.
pub async fn wait_for_stream<C>(stream: &C, config: &RetryConfig) -> Result<(), ConsumerError>
where
    C: ChangeStream + ?Sized,
{
    with_retry("kafka metadata", config, || stream.probe()).await?;
    info!("Kafka brokers are reachable");
    Ok(())
}
