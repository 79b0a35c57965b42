//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use rates_types::{ExchangeRateCache, TrailRepository};

use super::handlers::{self, AppState};
use crate::{HistoricalSyncService, LatestRateService, TrailService};

/// HTTP Server for the exchange-rate management API.
pub struct HttpServer<C: ExchangeRateCache, T: TrailRepository> {
    state: Arc<AppState<C, T>>,
}

impl<C: ExchangeRateCache, T: TrailRepository> HttpServer<C, T> {
    /// Creates a new HTTP server over the given services.
    pub fn new(
        latest: Arc<LatestRateService<C, T>>,
        history: Arc<HistoricalSyncService<C, T>>,
        trails: TrailService<T>,
    ) -> Self {
        Self {
            state: Arc::new(AppState {
                latest,
                history,
                trails,
            }),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Build HTTP metrics layer (uses globally set MeterProvider)
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        Router::new()
            .route("/health", get(handlers::health))
            .route(
                "/api/exchange-rates",
                put(handlers::create_or_update::<C, T>)
                    .delete(handlers::purge::<C, T>),
            )
            .route(
                "/api/exchange-rates/refresh",
                post(handlers::refresh::<C, T>),
            )
            .route(
                "/api/exchange-rates/history-update",
                post(handlers::history_update::<C, T>),
            )
            .route(
                "/api/exchange-rates/latest",
                get(handlers::list_latest::<C, T>),
            )
            .route(
                "/api/exchange-rates/latest/{currency}",
                get(handlers::get_latest::<C, T>),
            )
            .route("/api/trails", get(handlers::list_trails::<C, T>))
            .route("/api/trails/{id}", get(handlers::get_trail::<C, T>))
            .layer(metrics)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
