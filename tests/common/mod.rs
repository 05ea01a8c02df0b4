#![allow(dead_code)]

use axum::{Router, extract::State, http::StatusCode, routing::get};
use chrono::{NaiveDate, NaiveDateTime};
use currency_monitor::{
    AppState,
    scrapers::{ScraperConfig, extractor::RateExtractor, fetcher::RateFetcher, rules::ExtractionRules},
    services::{
        ingestion::IngestionPipeline,
        rate_store::{RateStore, StoreRetryPolicy},
        report::{ReportFormatter, ReportService},
    },
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

pub const BEST_CELLS: [&str; 6] = ["3,2500", "3,2100", "3,5600", "3,5100", "3,6000", "3,5500"];
pub const BELVEB_CELLS: [&str; 6] = ["3,2700", "3,2000", "3,5700", "3,5000", "3,6100", "3,5400"];

pub fn fast_retry() -> StoreRetryPolicy {
    StoreRetryPolicy {
        max_attempts: 3,
        delay: Duration::from_millis(5),
    }
}

pub fn run_ts(hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 14)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

/// Store backed by a fresh SQLite file. Keep the `TempDir` alive for the test.
pub async fn setup_test_store() -> (TempDir, RateStore) {
    let (dir, store) = connect_test_store().await;
    store.initialize().await.expect("Failed to initialize test store");
    (dir, store)
}

/// Connected but without tables: every write fails.
pub async fn connect_test_store() -> (TempDir, RateStore) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("rates.db").display());
    let store = RateStore::connect(&url, fast_retry())
        .await
        .expect("Failed to connect test store");
    (dir, store)
}

/// Markup shaped like the live rates page
pub fn rates_page(best: &[&str], banks: &[(&str, &[&str])]) -> String {
    let accents: String = best
        .iter()
        .map(|v| format!(r#"<span class="accent">{}</span>"#, v))
        .collect();

    let rows: String = banks
        .iter()
        .map(|(name_cell, values)| {
            let cells: String = values
                .iter()
                .map(|v| {
                    format!(
                        r#"<td class="currencies-courses__currency-cell"><span>{}</span></td>"#,
                        v
                    )
                })
                .collect();
            format!(
                r#"<tr class="currencies-courses__row-main"><td>{}</td>{}</tr>"#,
                name_cell, cells
            )
        })
        .collect();

    format!(
        "<html><body><div class=\"best\">{}</div><table><tbody>{}</tbody></table></body></html>",
        accents, rows
    )
}

pub fn full_page() -> String {
    rates_page(
        &BEST_CELLS,
        &[
            (
                r#"<a href="https://belveb.by"><img src="/img/belveb.svg"></a> БелВЭБ"#,
                &BELVEB_CELLS[..],
            ),
            (
                r#"<a href="https://otherbank.by">Other</a>"#,
                &["3,30", "3,10", "3,60", "3,40", "3,70", "3,50"][..],
            ),
        ],
    )
}

/// Local stand-in for the rates site
pub struct MockSource {
    pub url: String,
    hits: Arc<AtomicUsize>,
}

impl MockSource {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct MockState {
    hits: Arc<AtomicUsize>,
    failures: usize,
    body: Arc<String>,
}

async fn serve_page(State(state): State<MockState>) -> (StatusCode, String) {
    let hit = state.hits.fetch_add(1, Ordering::SeqCst);
    if hit < state.failures {
        (StatusCode::INTERNAL_SERVER_ERROR, "upstream error".to_string())
    } else {
        (StatusCode::OK, state.body.as_ref().clone())
    }
}

/// Answers 500 for the first `failures` requests, then `body`.
pub async fn spawn_mock_source(body: String, failures: usize) -> MockSource {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/currency/minsk", get(serve_page))
        .with_state(MockState {
            hits: hits.clone(),
            failures,
            body: Arc::new(body),
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock source");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockSource {
        url: format!("http://{}/currency/minsk", addr),
        hits,
    }
}

pub fn test_pipeline(store: RateStore, source_url: &str) -> IngestionPipeline {
    let fetcher = RateFetcher::new(ScraperConfig {
        source_url: source_url.to_string(),
        request_timeout_secs: 5,
        retry_max: 3,
        retry_delay_ms: 5,
        ..Default::default()
    })
    .expect("Failed to build fetcher");
    let extractor = RateExtractor::new(ExtractionRules::default()).expect("Default rules compile");

    IngestionPipeline::new(fetcher, extractor, store, 3)
}

pub fn test_app_state(store: RateStore, source_url: &str) -> AppState {
    AppState {
        pipeline: test_pipeline(store.clone(), source_url),
        reports: ReportService::new(store, ReportFormatter::default()),
    }
}
