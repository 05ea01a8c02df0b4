use anyhow::Context;
use currency_monitor::{
    AppState,
    config::AppConfig,
    handlers,
    jobs::rate_ingestion::start_rate_ingestion_job,
    scrapers::{extractor::RateExtractor, fetcher::RateFetcher},
    services::{
        ingestion::IngestionPipeline,
        rate_store::RateStore,
        report::{ReportFormatter, ReportService},
    },
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    // Load environment variables
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();

    tracing::info!("Connecting to rate store...");
    let store = RateStore::connect(&config.database_url, config.store_retry)
        .await
        .context("Failed to connect to rate store")?;

    tracing::info!("Initializing schema...");
    store
        .initialize()
        .await
        .context("Failed to initialize rate store")?;

    let extractor = RateExtractor::new(config.extraction_rules()?)?;
    let fetcher = RateFetcher::new(config.scraper.clone())?;
    let pipeline = IngestionPipeline::new(fetcher, extractor, store.clone(), config.utc_offset_hours);
    let reports = ReportService::new(store, ReportFormatter::new(config.tolerance));

    match config.ingest_interval_secs {
        Some(secs) => {
            start_rate_ingestion_job(pipeline.clone(), secs);
        }
        None => tracing::info!("INGEST_INTERVAL_SECS not set, periodic ingestion disabled"),
    }

    let app = handlers::router(AppState { pipeline, reports });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
