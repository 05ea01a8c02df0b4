//! Comparison report: load history, join against best rates, render CSV.

use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::Instrument;

use super::comparison::compare;
use super::rate_store::{RateStore, StoreError};
use crate::models::rate::{ComparisonRow, ToleranceBand};

pub const DEFAULT_TOLERANCE: Decimal = dec!(0.015);

const HEADERS: [&str; 11] = [
    "Timestamp",
    "Currency",
    "Source",
    "Buy rate",
    "Best buy rate",
    "Buy deviation",
    "Buy band",
    "Sell rate",
    "Best sell rate",
    "Sell deviation",
    "Sell band",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub filename: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

/// Renders comparison rows, classifying each deviation cell against the tolerance.
#[derive(Debug, Clone, Copy)]
pub struct ReportFormatter {
    tolerance: Decimal,
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl ReportFormatter {
    pub fn new(tolerance: Decimal) -> Self {
        Self { tolerance }
    }

    pub fn band(&self, deviation: Decimal) -> ToleranceBand {
        ToleranceBand::classify(deviation, self.tolerance)
    }

    /// `None` when there are no rows: an empty report is never produced.
    pub fn render(&self, rows: &[ComparisonRow], generated_at: NaiveDateTime) -> Option<Report> {
        if rows.is_empty() {
            return None;
        }

        let mut ordered: Vec<&ComparisonRow> = rows.iter().collect();
        ordered.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| a.currency.code().cmp(b.currency.code()))
                .then_with(|| a.source_name.cmp(&b.source_name))
        });

        let mut csv = String::new();
        csv.push_str(&HEADERS.join(","));
        csv.push('\n');

        for row in ordered {
            let fields = [
                row.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                row.currency.code().to_string(),
                csv_field(&row.source_name),
                format_rate(row.buy_rate),
                format_rate(row.best_buy_rate),
                format_rate(row.buy_deviation),
                self.band(row.buy_deviation).as_str().to_string(),
                format_rate(row.sell_rate),
                format_rate(row.best_sell_rate),
                format_rate(row.sell_deviation),
                self.band(row.sell_deviation).as_str().to_string(),
            ];
            csv.push_str(&fields.join(","));
            csv.push('\n');
        }

        Some(Report {
            filename: format!("currency_report_{}.csv", generated_at.format("%Y%m%d_%H%M%S")),
            content_type: "text/csv; charset=utf-8",
            body: csv.into_bytes(),
        })
    }
}

fn format_rate(value: Decimal) -> String {
    format!("{:.4}", value)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Reporting path: reads the store only.
#[derive(Clone)]
pub struct ReportService {
    store: RateStore,
    formatter: ReportFormatter,
}

impl ReportService {
    pub fn new(store: RateStore, formatter: ReportFormatter) -> Self {
        Self { store, formatter }
    }

    /// `Ok(None)` is the explicit "nothing to report" outcome.
    pub async fn generate(&self) -> Result<Option<Report>, StoreError> {
        self.build().instrument(tracing::info_span!("report")).await
    }

    async fn build(&self) -> Result<Option<Report>, StoreError> {
        let history = self.store.load_all().await?;
        if history.is_empty() {
            tracing::warn!("No rate history, nothing to report");
            return Ok(None);
        }

        let rows = compare(&history);
        if rows.is_empty() {
            tracing::warn!("No bank rates matched a best rate, nothing to report");
            return Ok(None);
        }

        let report = self.formatter.render(&rows, Utc::now().naive_utc());
        if let Some(report) = &report {
            tracing::info!(
                rows = rows.len(),
                bytes = report.body.len(),
                filename = %report.filename,
                "Report generated"
            );
        }

        Ok(report)
    }
}
