//! API server assembly: router, middleware, HTTP and metrics listeners.

use crate::rest::{self, AppState};
use crate::service::RotationService;
use axum::routing::{get, post};
use axum::Router;
use rotation_core::config::AppConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// HTTP server exposing the rotation API.
pub struct ApiServer {
    config: AppConfig,
    service: Arc<RotationService>,
}

impl ApiServer {
    pub fn new(config: AppConfig, service: Arc<RotationService>) -> Self {
        Self { config, service }
    }

    /// Build the application router.
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/add-banner", post(rest::add_banner))
            .route("/remove-banner", post(rest::remove_banner))
            .route("/record-click", post(rest::record_click))
            .route("/select-banner", post(rest::select_banner))
            // Operational endpoints
            .route("/health", get(rest::health_check))
            .route("/ready", get(rest::readiness))
            .route("/live", get(rest::liveness))
            // Middleware
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Start the HTTP server. Runs until the listener fails.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let state = AppState {
            service: self.service.clone(),
            node_id: self.config.node_id.clone(),
            start_time: Instant::now(),
        };

        let app = Self::router(state);

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the Prometheus metrics exporter on its own port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        builder
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}
