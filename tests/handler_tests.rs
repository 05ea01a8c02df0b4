mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use currency_monitor::handlers::router;
use serde_json::Value;
use tower::ServiceExt;

use crate::common::{
    connect_test_store, full_page, run_ts, setup_test_store, spawn_mock_source, test_app_state,
};

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn send(app: Router, method: &str, uri: &str) -> axum::response::Response {
    app.oneshot(
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_index_page() {
    let (_dir, store) = setup_test_store().await;
    let app = router(test_app_state(store, "http://127.0.0.1:9/currency/minsk"));

    let response = send(app, "GET", "/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains("/download_report"));
}

#[tokio::test]
async fn test_download_report_without_data_is_an_error() {
    let (_dir, store) = setup_test_store().await;
    let app = router(test_app_state(store, "http://127.0.0.1:9/currency/minsk"));

    let response = send(app, "GET", "/download_report").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(json["error"].as_str().unwrap().contains("No data"));
}

#[tokio::test]
async fn test_download_report_returns_attachment() {
    let (_dir, store) = setup_test_store().await;
    let source = spawn_mock_source(full_page(), 0).await;
    let state = test_app_state(store, &source.url);
    state.pipeline.run_once_at(run_ts(10)).await.unwrap();

    let response = send(router(state), "GET", "/download_report").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );

    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"currency_report_"));
    assert!(disposition.ends_with(".csv\""));

    let body = String::from_utf8(body_bytes(response).await).unwrap();
    let lines: Vec<&str> = body.lines().collect();
    // Header plus one row per tracked-bank currency
    assert_eq!(lines.len(), 4);
    assert!(lines[1..].iter().all(|l| l.contains("БелВЭБ")));
    assert!(
        lines
            .iter()
            .any(|l| l.starts_with("2025-03-14 10:00,USD,БелВЭБ,3.2000,3.2100,-0.0100,within_tolerance"))
    );
}

#[tokio::test]
async fn test_trigger_ingestion() {
    let (_dir, store) = setup_test_store().await;
    let source = spawn_mock_source(full_page(), 0).await;
    let app = router(test_app_state(store.clone(), &source.url));

    let response = send(app, "POST", "/ingest").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["outcome"], "persisted");
    assert_eq!(json["persisted"], 6);
    assert_eq!(store.load_all().await.unwrap().len(), 6);
}

#[tokio::test]
async fn test_trigger_ingestion_reports_store_failure() {
    let (_dir, store) = connect_test_store().await;
    let source = spawn_mock_source(full_page(), 0).await;
    let app = router(test_app_state(store, &source.url));

    let response = send(app, "POST", "/ingest").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
