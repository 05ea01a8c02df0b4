use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Reserved source name for the aggregator's best available rate.
/// Every other source name denotes a bank.
pub const BEST_RATE_SOURCE: &str = "Лучший курс";

/// Currencies quoted on the source page, in page order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
    /// Banknote lot of 100 rubles
    #[serde(rename = "RUB 100")]
    Rub100,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Usd, Currency::Eur, Currency::Rub100];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Rub100 => "RUB 100",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown currency code '{0}'")]
pub struct UnknownCurrency(pub String);

impl FromStr for Currency {
    type Err = UnknownCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::ALL
            .into_iter()
            .find(|c| c.code() == s.trim())
            .ok_or_else(|| UnknownCurrency(s.to_string()))
    }
}

/// One quoted rate for one currency from one source at one moment.
///
/// `sell_rate >= buy_rate` is expected from real quotes but not enforced;
/// inverted pairs are kept as published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateObservation {
    pub timestamp: NaiveDateTime,
    pub currency: Currency,
    pub source_name: String,
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
}

impl RateObservation {
    pub fn is_best(&self) -> bool {
        self.source_name == BEST_RATE_SOURCE
    }

    /// Rows with a blank source or non-positive rates are not persisted
    pub fn is_valid(&self) -> bool {
        !self.source_name.trim().is_empty()
            && self.buy_rate > Decimal::ZERO
            && self.sell_rate > Decimal::ZERO
    }
}

/// A bank observation joined to the best rate at the same timestamp and currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub timestamp: NaiveDateTime,
    pub currency: Currency,
    pub source_name: String,
    pub buy_rate: Decimal,
    pub best_buy_rate: Decimal,
    /// bank - best
    pub buy_deviation: Decimal,
    pub buy_deviation_abs: Decimal,
    pub sell_rate: Decimal,
    pub best_sell_rate: Decimal,
    /// bank - best
    pub sell_deviation: Decimal,
    pub sell_deviation_abs: Decimal,
}

impl ComparisonRow {
    pub fn new(bank: &RateObservation, best: &RateObservation) -> Self {
        let buy_deviation = bank.buy_rate - best.buy_rate;
        let sell_deviation = bank.sell_rate - best.sell_rate;

        Self {
            timestamp: bank.timestamp,
            currency: bank.currency,
            source_name: bank.source_name.clone(),
            buy_rate: bank.buy_rate,
            best_buy_rate: best.buy_rate,
            buy_deviation,
            buy_deviation_abs: buy_deviation.abs(),
            sell_rate: bank.sell_rate,
            best_sell_rate: best.sell_rate,
            sell_deviation,
            sell_deviation_abs: sell_deviation.abs(),
        }
    }
}

/// Highlight band of a deviation cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToleranceBand {
    WithinTolerance,
    ExceedsTolerance,
}

impl ToleranceBand {
    /// The threshold itself is within tolerance.
    pub fn classify(deviation: Decimal, threshold: Decimal) -> Self {
        if deviation.abs() <= threshold {
            ToleranceBand::WithinTolerance
        } else {
            ToleranceBand::ExceedsTolerance
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToleranceBand::WithinTolerance => "within_tolerance",
            ToleranceBand::ExceedsTolerance => "exceeds_tolerance",
        }
    }
}
