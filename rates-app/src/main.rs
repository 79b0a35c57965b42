//! # Rates Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Build the rate providers and their registry
//! - Initialize the cache and trail adapters
//! - Start the sync scheduler and the HTTP server

mod config;

use std::sync::Arc;

use opentelemetry::global;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace as sdktrace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rates_hex::{
    EventPublisher, HistoricalSyncService, LatestRateService, ProviderRegistry, SyncScheduler,
    TrailService, events::log_events, inbound::HttpServer,
};
use rates_providers::{FixedRateProvider, NbpProvider};
use rates_repo::{InMemoryRateCache, InMemoryTrailRepository};
use rates_types::{CurrencyCode, CurrencyRateProvider, ExchangeRateCache, TrailRepository};

use config::{Config, ProviderKind};

fn init_tracer() -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // Use gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("rates-service"), provider))
}

fn build_providers(config: &Config) -> anyhow::Result<Vec<Arc<dyn CurrencyRateProvider>>> {
    let mut providers: Vec<Arc<dyn CurrencyRateProvider>> = Vec::new();
    for kind in &config.providers {
        match kind {
            ProviderKind::Fixed => providers.push(Arc::new(
                FixedRateProvider::new(kind.name(), CurrencyCode::USD).with_fluctuation(0.5),
            )),
            ProviderKind::Nbp => providers.push(Arc::new(NbpProvider::new(
                kind.name(),
                config.nbp_base_url.as_str(),
                config.settings.provider_timeout,
            )?)),
        }
    }
    Ok(providers)
}

/// Wires services over the chosen adapters and serves until shutdown.
async fn run<C: ExchangeRateCache, T: TrailRepository>(
    config: &Config,
    cache: Arc<C>,
    trail_repo: Arc<T>,
) -> anyhow::Result<()> {
    let registry = Arc::new(ProviderRegistry::new(
        build_providers(config)?,
        &config.settings,
    )?);
    tracing::info!(providers = ?registry.names(), "Providers registered");

    let warmed = registry.warm_up().await;
    tracing::info!("{} provider(s) warmed up", warmed);

    let trails = TrailService::new(trail_repo);
    let events = EventPublisher::default();
    tokio::spawn(log_events(events.subscribe()));

    let latest = Arc::new(LatestRateService::new(
        cache.clone(),
        registry.clone(),
        trails.clone(),
        events,
        &config.settings,
    ));
    let history = Arc::new(HistoricalSyncService::new(
        cache,
        registry,
        trails.clone(),
        &config.settings,
    ));

    let scheduler = SyncScheduler::new(
        latest.clone(),
        history.clone(),
        config.refresh_interval,
        config.history_interval,
    );
    tokio::spawn(scheduler.run());

    let server = HttpServer::new(latest, history, trails);
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize OpenTelemetry tracing
    let (otel_tracer, otel_provider) = init_tracer()?;
    let telemetry = tracing_opentelemetry::layer().with_tracer(otel_tracer);

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rates_app=debug,rates_hex=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry)
        .init();

    // Load configuration
    let config = Config::from_env()?;

    tracing::info!("Starting rates server on port {}", config.port);

    match config.database_url.as_deref() {
        #[cfg(feature = "sqlite")]
        Some(url) => {
            tracing::info!("Using database: {}", url);
            let pool = rates_repo::sqlite::connect(url).await?;
            run(
                &config,
                Arc::new(rates_repo::SqliteRateCache::new(pool.clone())),
                Arc::new(rates_repo::SqliteTrailRepository::new(pool)),
            )
            .await?;
        }
        _ => {
            tracing::info!("Using in-memory stores");
            run(
                &config,
                Arc::new(InMemoryRateCache::new()),
                Arc::new(InMemoryTrailRepository::new()),
            )
            .await?;
        }
    }

    // Ensure traces are flushed before exit
    let _ = otel_provider.shutdown();
    Ok(())
}
