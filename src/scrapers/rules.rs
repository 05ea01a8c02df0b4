//! Page-structure assumptions for the rates page, kept as data.
//!
//! A layout change on the source site should only need a new rule set
//! (see `EXTRACTION_RULES_PATH`), not code changes in the extractor.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::models::rate::Currency;

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("rule set needs at least one currency")]
    NoCurrencies,
    #[error("failed to read rules file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse rules file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Which cell of a currency's two-cell group holds the sell rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellOrder {
    SellFirst,
    BuyFirst,
}

impl CellOrder {
    /// Split a (first, second) cell pair into (buy, sell)
    pub fn buy_sell<'a>(&self, first: &'a str, second: &'a str) -> (&'a str, &'a str) {
        match self {
            CellOrder::SellFirst => (second, first),
            CellOrder::BuyFirst => (first, second),
        }
    }
}

/// Attributes a table row to a named bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankRule {
    /// Stored as `source_name`
    pub name: String,
    /// Lowercase fragments looked up in the name cell's text and raw markup
    /// (domain names, logo file names)
    pub markers: Vec<String>,
}

impl BankRule {
    pub fn matches(&self, name_cell: &ElementRef<'_>) -> bool {
        let text = name_cell.text().collect::<String>().to_lowercase();
        let markup = name_cell.html().to_lowercase();

        self.markers.iter().any(|marker| {
            let marker = marker.to_lowercase();
            !marker.is_empty() && (text.contains(&marker) || markup.contains(&marker))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRules {
    /// Elements carrying the best rates, two per currency
    pub best_rate_selector: String,
    pub bank_row_selector: String,
    /// Cell inside a bank row holding the bank's name and logo
    pub bank_name_selector: String,
    /// Rate cells inside a bank row, two per currency
    pub rate_cell_selector: String,
    /// Positional currency order: cells 0-1 are the first currency, 2-3 the second, ...
    pub currencies: Vec<Currency>,
    pub cell_order: CellOrder,
    /// Upper sanity bound on a decoded rate
    pub max_rate: Decimal,
    pub banks: Vec<BankRule>,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            best_rate_selector: "span.accent".to_string(),
            bank_row_selector: "tr.currencies-courses__row-main".to_string(),
            bank_name_selector: "td:first-child".to_string(),
            rate_cell_selector: "td.currencies-courses__currency-cell span".to_string(),
            currencies: Currency::ALL.to_vec(),
            cell_order: CellOrder::SellFirst,
            max_rate: dec!(1000),
            banks: vec![BankRule {
                name: "БелВЭБ".to_string(),
                markers: vec![
                    "belveb.by".to_string(),
                    "belveb.svg".to_string(),
                    "belveb".to_string(),
                ],
            }],
        }
    }
}

impl ExtractionRules {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| RulesError::Read {
            path: path.display().to_string(),
            source,
        })?;

        serde_json::from_str(&raw).map_err(|source| RulesError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Cells needed for a complete row: two per currency
    pub fn required_cells(&self) -> usize {
        self.currencies.len() * 2
    }

    pub fn compile(&self) -> Result<CompiledSelectors, RulesError> {
        if self.currencies.is_empty() {
            return Err(RulesError::NoCurrencies);
        }

        Ok(CompiledSelectors {
            best_rate: parse_selector(&self.best_rate_selector)?,
            bank_row: parse_selector(&self.bank_row_selector)?,
            bank_name: parse_selector(&self.bank_name_selector)?,
            rate_cell: parse_selector(&self.rate_cell_selector)?,
        })
    }
}

pub struct CompiledSelectors {
    pub best_rate: Selector,
    pub bank_row: Selector,
    pub bank_name: Selector,
    pub rate_cell: Selector,
}

fn parse_selector(selector: &str) -> Result<Selector, RulesError> {
    Selector::parse(selector).map_err(|e| RulesError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}
