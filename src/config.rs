//! Environment-driven configuration.
//!
//! Every setting has a default; a present but unparseable value is logged and
//! replaced by the default.

use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::scrapers::ScraperConfig;
use crate::scrapers::rules::{ExtractionRules, RulesError};
use crate::services::rate_store::StoreRetryPolicy;
use crate::services::report::DEFAULT_TOLERANCE;

const ENV_DATABASE_URL: &str = "DATABASE_URL";
const ENV_BIND_ADDR: &str = "BIND_ADDR";
const ENV_SOURCE_URL: &str = "RATES_SOURCE_URL";
const ENV_FETCH_TIMEOUT: &str = "FETCH_TIMEOUT_SECS";
const ENV_FETCH_MAX_ATTEMPTS: &str = "FETCH_MAX_ATTEMPTS";
const ENV_FETCH_RETRY_DELAY: &str = "FETCH_RETRY_DELAY_MS";
const ENV_STORE_MAX_ATTEMPTS: &str = "STORE_MAX_ATTEMPTS";
const ENV_STORE_RETRY_DELAY: &str = "STORE_RETRY_DELAY_MS";
const ENV_TOLERANCE: &str = "DEVIATION_TOLERANCE";
const ENV_UTC_OFFSET: &str = "SOURCE_UTC_OFFSET_HOURS";
const ENV_INGEST_INTERVAL: &str = "INGEST_INTERVAL_SECS";
const ENV_RULES_PATH: &str = "EXTRACTION_RULES_PATH";

pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/currency_data.db?mode=rwc";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

/// Minsk and Moscow, no DST
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 3;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub scraper: ScraperConfig,
    pub store_retry: StoreRetryPolicy,
    pub tolerance: Decimal,
    pub utc_offset_hours: i32,
    /// Periodic ingestion inside the server; disabled when unset
    pub ingest_interval_secs: Option<u64>,
    pub rules_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            scraper: ScraperConfig::default(),
            store_retry: StoreRetryPolicy::default(),
            tolerance: DEFAULT_TOLERANCE,
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
            ingest_interval_secs: None,
            rules_path: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let scraper = ScraperConfig {
            source_url: get(ENV_SOURCE_URL).unwrap_or(defaults.scraper.source_url.clone()),
            user_agent: defaults.scraper.user_agent.clone(),
            request_timeout_secs: parse_or(&get, ENV_FETCH_TIMEOUT, defaults.scraper.request_timeout_secs),
            retry_max: parse_or(&get, ENV_FETCH_MAX_ATTEMPTS, defaults.scraper.retry_max),
            retry_delay_ms: parse_or(&get, ENV_FETCH_RETRY_DELAY, defaults.scraper.retry_delay_ms),
        };

        let store_retry = StoreRetryPolicy {
            max_attempts: parse_or(&get, ENV_STORE_MAX_ATTEMPTS, defaults.store_retry.max_attempts),
            delay: Duration::from_millis(parse_or(
                &get,
                ENV_STORE_RETRY_DELAY,
                defaults.store_retry.delay.as_millis() as u64,
            )),
        };

        Self {
            database_url: get(ENV_DATABASE_URL).unwrap_or(defaults.database_url),
            bind_addr: get(ENV_BIND_ADDR).unwrap_or(defaults.bind_addr),
            scraper,
            store_retry,
            tolerance: parse_or(&get, ENV_TOLERANCE, defaults.tolerance),
            utc_offset_hours: parse_or(&get, ENV_UTC_OFFSET, defaults.utc_offset_hours),
            ingest_interval_secs: get(ENV_INGEST_INTERVAL)
                .and_then(|v| parse_logged::<u64>(ENV_INGEST_INTERVAL, &v))
                .filter(|secs| *secs > 0),
            rules_path: get(ENV_RULES_PATH).map(PathBuf::from),
        }
    }

    /// Built-in rules unless `EXTRACTION_RULES_PATH` points to a rule file
    pub fn extraction_rules(&self) -> Result<ExtractionRules, RulesError> {
        match &self.rules_path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading extraction rules");
                ExtractionRules::from_file(path)
            }
            None => Ok(ExtractionRules::default()),
        }
    }
}

fn parse_or<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    get(key)
        .and_then(|v| parse_logged(key, &v))
        .unwrap_or(default)
}

fn parse_logged<T: FromStr>(key: &str, value: &str) -> Option<T> {
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!("Ignoring invalid {}='{}', using default", key, value);
            None
        }
    }
}
