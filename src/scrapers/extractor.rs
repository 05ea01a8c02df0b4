use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::str::FromStr;
use thiserror::Error;

use super::rules::{CompiledSelectors, ExtractionRules, RulesError};
use crate::models::rate::{BEST_RATE_SOURCE, RateObservation};

lazy_static! {
    static ref RATE_REGEX: Regex = Regex::new(r"^\d+(\.\d+)?$").unwrap();
}

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The page no longer has the expected best-rate markers;
    /// usually a layout change on the source site
    #[error("found {found} best-rate markers, need at least {required}")]
    MissingBestRates { found: usize, required: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateParseError {
    #[error("empty rate cell")]
    Empty,
    #[error("malformed rate '{0}'")]
    Malformed(String),
    #[error("rate {value} outside (0, {max}]")]
    OutOfBounds { value: Decimal, max: Decimal },
}

/// Normalize a locale-formatted rate ("3,2450", "1 000,50") and parse it.
pub fn parse_rate(raw: &str, max_rate: Decimal) -> Result<Decimal, RateParseError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if cleaned.is_empty() {
        return Err(RateParseError::Empty);
    }

    if !RATE_REGEX.is_match(&cleaned) {
        return Err(RateParseError::Malformed(raw.trim().to_string()));
    }

    let value =
        Decimal::from_str(&cleaned).map_err(|_| RateParseError::Malformed(raw.trim().to_string()))?;

    if value <= Decimal::ZERO || value > max_rate {
        return Err(RateParseError::OutOfBounds { value, max: max_rate });
    }

    Ok(value)
}

/// Turns a rates page into observations according to an [`ExtractionRules`] set.
pub struct RateExtractor {
    rules: ExtractionRules,
    selectors: CompiledSelectors,
}

impl RateExtractor {
    pub fn new(rules: ExtractionRules) -> Result<Self, RulesError> {
        let selectors = rules.compile()?;
        Ok(Self { rules, selectors })
    }

    /// Like [`try_extract`](Self::try_extract), but a structural failure is
    /// logged and yields no records.
    pub fn extract(&self, html: &str, timestamp: NaiveDateTime) -> Vec<RateObservation> {
        match self.try_extract(html, timestamp) {
            Ok(observations) => observations,
            Err(e) => {
                tracing::warn!(error = %e, "Rates page layout not recognized, nothing extracted");
                Vec::new()
            }
        }
    }

    /// Extract best rates and every configured bank's rates.
    ///
    /// Best rates are mandatory: without enough markers the whole page is
    /// rejected. Bank rows and single cells fail on their own.
    pub fn try_extract(
        &self,
        html: &str,
        timestamp: NaiveDateTime,
    ) -> Result<Vec<RateObservation>, ExtractError> {
        let document = Html::parse_document(html);
        let required = self.rules.required_cells();

        let best_cells = cell_texts(document.root_element(), &self.selectors.best_rate);
        if best_cells.len() < required {
            return Err(ExtractError::MissingBestRates {
                found: best_cells.len(),
                required,
            });
        }

        let mut observations = self.observations_from_cells(BEST_RATE_SOURCE, &best_cells, timestamp);
        let best_count = observations.len();

        let mut matched_banks = HashSet::new();
        for row in document.select(&self.selectors.bank_row) {
            let Some(name_cell) = row.select(&self.selectors.bank_name).next() else {
                continue;
            };

            let Some(bank) = self
                .rules
                .banks
                .iter()
                .find(|bank| !matched_banks.contains(&bank.name) && bank.matches(&name_cell))
            else {
                continue;
            };
            matched_banks.insert(bank.name.clone());

            let cells = cell_texts(row, &self.selectors.rate_cell);
            if cells.len() < required {
                tracing::warn!(
                    bank = %bank.name,
                    cells = cells.len(),
                    required,
                    "Bank row has too few rate cells, skipping"
                );
                continue;
            }

            observations.extend(self.observations_from_cells(&bank.name, &cells, timestamp));
        }

        for bank in &self.rules.banks {
            if !matched_banks.contains(&bank.name) {
                tracing::debug!(bank = %bank.name, "Bank not found on page");
            }
        }

        tracing::info!(
            best = best_count,
            banks = matched_banks.len(),
            total = observations.len(),
            "Extracted rate observations"
        );

        Ok(observations)
    }

    /// Map positional cells to currencies; an unparseable pair is dropped alone.
    fn observations_from_cells(
        &self,
        source: &str,
        cells: &[String],
        timestamp: NaiveDateTime,
    ) -> Vec<RateObservation> {
        let mut observations = Vec::with_capacity(self.rules.currencies.len());

        for (currency, pair) in self.rules.currencies.iter().zip(cells.chunks_exact(2)) {
            let (buy_raw, sell_raw) = self.rules.cell_order.buy_sell(&pair[0], &pair[1]);

            let parsed = parse_rate(buy_raw, self.rules.max_rate)
                .and_then(|buy| parse_rate(sell_raw, self.rules.max_rate).map(|sell| (buy, sell)));

            match parsed {
                Ok((buy_rate, sell_rate)) => observations.push(RateObservation {
                    timestamp,
                    currency: *currency,
                    source_name: source.to_string(),
                    buy_rate,
                    sell_rate,
                }),
                Err(e) => {
                    tracing::warn!(
                        source = %source,
                        currency = %currency,
                        buy = %buy_raw,
                        sell = %sell_raw,
                        error = %e,
                        "Dropping unparseable rate"
                    );
                }
            }
        }

        observations
    }
}

fn cell_texts(scope: ElementRef<'_>, selector: &Selector) -> Vec<String> {
    scope
        .select(selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .collect()
}
