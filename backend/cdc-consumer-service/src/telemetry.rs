//! HTTP surface for operators: Prometheus scrape target and liveness probe.
//!
//! Handlers only read the metrics sink, so they never wait on the
//! consumption loop.

use actix_web::{dev::Server, web, App, HttpResponse, HttpServer};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use crate::error::ConsumerError;
use crate::events::models::iso_timestamp;
use crate::metrics::CdcMetrics;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

/// Register `/metrics` and `/health`. Expects `web::Data<CdcMetrics>` in app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/metrics", web::get().to(serve_metrics))
        .route("/health", web::get().to(health));
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics(metrics: web::Data<CdcMetrics>) -> HttpResponse {
    match metrics.render() {
        Ok(snapshot) => HttpResponse::Ok()
            .content_type(snapshot.content_type)
            .body(snapshot.body),
        Err(err) => {
            error!("Error generating metrics: {}", err);
            HttpResponse::InternalServerError()
                .content_type("text/plain; charset=utf-8")
                .body("Error generating metrics")
        }
    }
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        timestamp: iso_timestamp(&Utc::now()),
    })
}

/// Bind the telemetry listener on all interfaces.
///
/// Signal handling is left to the caller, which stops the server through its
/// handle.
pub fn start_server(port: u16, metrics: Arc<CdcMetrics>) -> Result<Server, ConsumerError> {
    let metrics = web::Data::from(metrics);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(metrics.clone())
            .configure(configure)
    })
    .bind(("0.0.0.0", port))
    .map_err(|source| ConsumerError::Bind { port, source })?
    .workers(1)
    .disable_signals()
    .run();

    Ok(server)
}
