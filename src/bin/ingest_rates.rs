//! One-shot rate ingestion, meant for an external scheduler.
//!
//! Exits 0 when the run completed, even if the source was unreachable or
//! its layout was not recognized. Exits 1 when the store could not be
//! initialized or written.

use anyhow::Context;
use currency_monitor::{
    config::AppConfig,
    scrapers::{extractor::RateExtractor, fetcher::RateFetcher},
    services::{
        ingestion::{IngestOutcome, IngestionPipeline},
        rate_store::RateStore,
    },
    telemetry,
};

#[tokio::main]
async fn main() {
    telemetry::init_tracing();
    dotenvy::dotenv().ok();

    if let Err(e) = run(AppConfig::from_env()).await {
        tracing::error!("Ingestion aborted: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    let store = RateStore::connect(&config.database_url, config.store_retry)
        .await
        .context("Failed to connect to rate store")?;
    store
        .initialize()
        .await
        .context("Failed to initialize rate store")?;

    let extractor = RateExtractor::new(config.extraction_rules()?)?;
    let fetcher = RateFetcher::new(config.scraper.clone())?;
    let pipeline = IngestionPipeline::new(fetcher, extractor, store, config.utc_offset_hours);

    let report = pipeline
        .run_once()
        .await
        .context("Failed to store rates")?;

    match report.outcome {
        IngestOutcome::Persisted => tracing::info!(
            timestamp = %report.timestamp,
            persisted = report.persisted,
            "Ingestion run completed"
        ),
        IngestOutcome::FetchFailed => {
            tracing::warn!(timestamp = %report.timestamp, "Ingestion run completed without data: source unreachable")
        }
        IngestOutcome::LayoutChanged { markers_found } => tracing::warn!(
            timestamp = %report.timestamp,
            markers_found,
            "Ingestion run completed without data: page layout not recognized"
        ),
    }

    Ok(())
}
