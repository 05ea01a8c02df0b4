// src/lib.rs

use services::{ingestion::IngestionPipeline, report::ReportService};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: IngestionPipeline,
    pub reports: ReportService,
}

pub mod entities {
    pub mod prelude;
    pub mod exchange_rates;
    pub mod metadata;
}

pub mod services {
    pub mod rate_store;
    pub mod comparison;
    pub mod report;
    pub mod ingestion;
}

pub mod config;
pub mod telemetry;
pub mod models;
pub mod scrapers;
pub mod handlers;
pub mod jobs;
