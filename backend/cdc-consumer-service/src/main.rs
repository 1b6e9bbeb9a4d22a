use anyhow::Context;
use cdc_consumer_service::config::{Config, LogFormat};
use cdc_consumer_service::events::{KafkaChangeStream, Pipeline};
use cdc_consumer_service::metrics::CdcMetrics;
use cdc_consumer_service::readiness::{prepare, Startup};
use cdc_consumer_service::services::ElasticsearchClient;
use cdc_consumer_service::telemetry;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    }
}

async fn stop_server(
    handle: actix_web::dev::ServerHandle,
    task: JoinHandle<std::io::Result<()>>,
) {
    handle.stop(true).await;
    match task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("Metrics server error: {}", e),
        Err(e) => tracing::error!("Metrics server task join error: {}", e),
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cdc_consumer_service=info,info"));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_current_span(false)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    init_tracing(config.log_format);

    tracing::info!(
        brokers = %config.kafka.brokers,
        topic = %config.kafka.topic,
        elasticsearch = %config.elasticsearch.url,
        index = %config.elasticsearch.index,
        "Starting CDC consumer service"
    );

    let metrics = Arc::new(CdcMetrics::new().context("Failed to register metrics")?);

    let server = telemetry::start_server(config.telemetry.port, Arc::clone(&metrics))
        .context("Failed to start metrics server")?;
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);
    tracing::info!(
        port = config.telemetry.port,
        "Metrics available at /metrics, health at /health"
    );

    // Watched from here on, including during the readiness wait.
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let store = Arc::new(
        ElasticsearchClient::new(&config.elasticsearch.url, &config.elasticsearch.index)
            .context("Failed to build Elasticsearch client")?,
    );

    let stream = Arc::new(
        KafkaChangeStream::connect(&config.kafka).context("Failed to connect to Kafka")?,
    );

    let retry = config.readiness.retry_config();
    let startup = prepare(store.as_ref(), stream.as_ref(), &retry, &mut shutdown)
        .await
        .context("Kafka did not become ready")?;

    if startup == Startup::ShutdownRequested {
        tracing::info!("Received shutdown signal");
        stop_server(server_handle, server_task).await;
        tracing::info!("CDC consumer service shut down");
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    let pipeline = Pipeline::new(Arc::clone(&store), Arc::clone(&metrics));
    let consumer_stream = Arc::clone(&stream);
    let mut consumer_task =
        tokio::spawn(async move { pipeline.run(consumer_stream.as_ref(), shutdown_rx).await });

    tracing::info!("CDC consumer started, waiting for messages");

    tokio::select! {
        _ = &mut shutdown => {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
            match (&mut consumer_task).await {
                Ok(summary) => tracing::info!(
                    messages = summary.messages,
                    indexed = summary.indexed,
                    failed = summary.failed,
                    "CDC consumer stopped"
                ),
                Err(e) => tracing::error!("CDC consumer task join error: {}", e),
            }
        }
        result = &mut consumer_task => {
            match result {
                Ok(_) => tracing::warn!("CDC consumer loop ended before shutdown"),
                Err(e) => tracing::error!("CDC consumer task join error: {}", e),
            }
        }
    }

    stop_server(server_handle, server_task).await;

    tracing::info!("CDC consumer service shut down");
    Ok(())
}
