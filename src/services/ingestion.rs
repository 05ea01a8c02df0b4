//! Ingestion pipeline: fetch the rates page, extract observations, append them.
//!
//! Network and layout problems end the run with zero rows; only a store
//! failure is returned as an error.

use chrono::{DateTime, Duration, NaiveDateTime, Timelike, Utc};
use serde::Serialize;
use tracing::Instrument;

use super::rate_store::{RateStore, StoreError};
use crate::scrapers::extractor::{ExtractError, RateExtractor};
use crate::scrapers::fetcher::RateFetcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestOutcome {
    /// Observations were extracted and handed to the store
    Persisted,
    /// Every fetch attempt failed
    FetchFailed,
    /// The page was fetched but the best-rate markers were missing
    LayoutChanged { markers_found: usize },
}

impl IngestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestOutcome::Persisted => "persisted",
            IngestOutcome::FetchFailed => "fetch_failed",
            IngestOutcome::LayoutChanged { .. } => "layout_changed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionReport {
    pub timestamp: NaiveDateTime,
    pub outcome: IngestOutcome,
    pub persisted: usize,
}

/// Run timestamp: now in the source's fixed zone, truncated to the minute.
pub fn run_timestamp(now: DateTime<Utc>, utc_offset_hours: i32) -> NaiveDateTime {
    let local = now.naive_utc() + Duration::hours(i64::from(utc_offset_hours));

    local
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(local)
}

#[derive(Clone)]
pub struct IngestionPipeline {
    fetcher: RateFetcher,
    extractor: std::sync::Arc<RateExtractor>,
    store: RateStore,
    utc_offset_hours: i32,
}

impl IngestionPipeline {
    pub fn new(
        fetcher: RateFetcher,
        extractor: RateExtractor,
        store: RateStore,
        utc_offset_hours: i32,
    ) -> Self {
        Self {
            fetcher,
            extractor: std::sync::Arc::new(extractor),
            store,
            utc_offset_hours,
        }
    }

    /// One ingestion run stamped with the current time
    pub async fn run_once(&self) -> Result<IngestionReport, StoreError> {
        self.run_once_at(run_timestamp(Utc::now(), self.utc_offset_hours))
            .await
    }

    pub async fn run_once_at(&self, timestamp: NaiveDateTime) -> Result<IngestionReport, StoreError> {
        let span = tracing::info_span!("ingest", run_ts = %timestamp);
        self.run(timestamp).instrument(span).await
    }

    async fn run(&self, timestamp: NaiveDateTime) -> Result<IngestionReport, StoreError> {
        let url = &self.fetcher.config().source_url;
        tracing::info!(url = %url, "Starting rate ingestion");

        let Some(html) = self.fetcher.fetch(url).await else {
            tracing::warn!("Rates source unreachable, no data for this run");
            return Ok(IngestionReport {
                timestamp,
                outcome: IngestOutcome::FetchFailed,
                persisted: 0,
            });
        };

        let observations = match self.extractor.try_extract(&html, timestamp) {
            Ok(observations) => observations,
            Err(ExtractError::MissingBestRates { found, required }) => {
                tracing::warn!(
                    found,
                    required,
                    "Best-rate markers missing, source layout may have changed"
                );
                return Ok(IngestionReport {
                    timestamp,
                    outcome: IngestOutcome::LayoutChanged {
                        markers_found: found,
                    },
                    persisted: 0,
                });
            }
        };

        let persisted = if observations.is_empty() {
            tracing::warn!("No observations extracted, nothing to store");
            0
        } else {
            self.store.append(&observations).await?
        };

        tracing::info!(persisted, "Rate ingestion finished");
        Ok(IngestionReport {
            timestamp,
            outcome: IngestOutcome::Persisted,
            persisted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn test_run_timestamp_shifts_and_truncates() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 6, 59, 42).unwrap()
            + Duration::milliseconds(250);
        let expected = NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(9, 59, 0)
            .unwrap();

        assert_eq!(run_timestamp(now, 3), expected);
    }

    #[test]
    fn test_run_timestamp_crosses_midnight() {
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 22, 30, 0).unwrap();
        assert_eq!(
            run_timestamp(now, 3),
            NaiveDate::from_ymd_opt(2026, 1, 1)
                .unwrap()
                .and_hms_opt(1, 30, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(IngestOutcome::Persisted.as_str(), "persisted");
        assert_eq!(
            IngestOutcome::LayoutChanged { markers_found: 4 }.as_str(),
            "layout_changed"
        );
    }
}
