use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse},
};

use crate::AppState;
use crate::models::api::ErrorResponse;

const INDEX_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Currency rate monitor</title>
</head>
<body>
    <h1>Currency rate monitor</h1>
    <p>Bank buy and sell rates compared against the best available rate.</p>
    <p><a href="/download_report">Download report</a></p>
</body>
</html>
"#;

pub async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

pub async fn download_report(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let report = state.reports.generate().await.map_err(|e| {
        tracing::error!("Failed to build report: {}", e);
        error_response("Failed to read rate history")
    })?;

    let Some(report) = report else {
        return Err(error_response("No data available to build a report"));
    };

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        report.filename
    ))
    .map_err(|e| {
        tracing::error!("Invalid report filename {}: {}", report.filename, e);
        error_response("Failed to build report")
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(report.content_type),
    );
    headers.insert(header::CONTENT_DISPOSITION, disposition);

    Ok((headers, report.body))
}

fn error_response(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}
