use axum::{Json, extract::State, http::StatusCode};

use crate::AppState;
use crate::models::api::{ErrorResponse, IngestResponse};

/// Run one ingestion now. Fetch and layout problems are reported in the
/// body with 200; only a store failure is a 500.
pub async fn trigger_ingestion(
    State(state): State<AppState>,
) -> Result<Json<IngestResponse>, (StatusCode, Json<ErrorResponse>)> {
    let report = state.pipeline.run_once().await.map_err(|e| {
        tracing::error!("Manual ingestion failed: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Failed to store rates: {}", e),
            }),
        )
    })?;

    Ok(Json(IngestResponse {
        timestamp: report.timestamp,
        outcome: report.outcome.as_str().to_string(),
        persisted: report.persisted,
    }))
}
