use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod ingest;
pub mod report;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(report::index))
        .route("/download_report", get(report::download_report))
        .route("/ingest", post(ingest::trigger_ingestion))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
