//! Append-only persistence of rate observations.
//!
//! Storage-unavailable conditions (lock contention, pool exhaustion, lost
//! connection) are retried a fixed number of times with a fixed delay before
//! the operation fails.

use chrono::Utc;
use migration::{Migrator, SCHEMA_VERSION, SCHEMA_VERSION_KEY};
use rust_decimal::Decimal;
use sea_orm_migration::MigratorTrait;
use sea_orm::{
    ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, DbErr, EntityTrait, Order,
    QueryOrder, Set, TransactionTrait,
};
use std::future::Future;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::entities::{exchange_rates, metadata, prelude::*};
use crate::models::rate::{Currency, RateObservation};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable after {attempts} attempts during {operation}: {source}")]
    Unavailable {
        operation: &'static str,
        attempts: u32,
        #[source]
        source: DbErr,
    },
    #[error("database error during {operation}: {source}")]
    Database {
        operation: &'static str,
        #[source]
        source: DbErr,
    },
    #[error("schema version marker missing after initialization")]
    SchemaMarkerMissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreRetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for StoreRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

#[derive(Clone)]
pub struct RateStore {
    db: DatabaseConnection,
    retry: StoreRetryPolicy,
}

impl RateStore {
    pub fn new(db: DatabaseConnection, retry: StoreRetryPolicy) -> Self {
        Self { db, retry }
    }

    /// Connect with the same retry policy used for every store operation
    pub async fn connect(database_url: &str, retry: StoreRetryPolicy) -> Result<Self, StoreError> {
        ensure_sqlite_dir(database_url);

        let mut options = ConnectOptions::new(database_url.to_string());
        options.sqlx_logging(false);

        let db = with_retry(retry, "connect", || Database::connect(options.clone())).await?;
        tracing::info!("Connected to rate store");

        Ok(Self::new(db, retry))
    }

    /// Create tables and the schema-version marker if absent. Safe on every startup.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        with_retry(self.retry, "initialize", || Migrator::up(&self.db, None)).await?;

        if self.schema_version().await?.is_none() {
            tracing::warn!("Schema version marker missing, restoring it");
            let marker = metadata::ActiveModel {
                key: Set(SCHEMA_VERSION_KEY.to_string()),
                value: Set(Some(SCHEMA_VERSION.to_string())),
            };
            with_retry(self.retry, "initialize", || marker.clone().insert(&self.db)).await?;

            if self.schema_version().await?.is_none() {
                return Err(StoreError::SchemaMarkerMissing);
            }
        }

        tracing::info!(schema_version = SCHEMA_VERSION, "Rate store initialized");
        Ok(())
    }

    pub async fn schema_version(&self) -> Result<Option<String>, StoreError> {
        let marker = with_retry(self.retry, "schema_version", || {
            Metadata::find_by_id(SCHEMA_VERSION_KEY.to_string()).one(&self.db)
        })
        .await?;

        Ok(marker.and_then(|m| m.value))
    }

    /// Insert every valid observation in one transaction.
    ///
    /// Invalid rows are skipped and counted; returns the number persisted.
    pub async fn append(&self, batch: &[RateObservation]) -> Result<usize, StoreError> {
        let mut rows = Vec::with_capacity(batch.len());
        let mut skipped = 0;

        for observation in batch {
            match to_active_model(observation) {
                Some(row) => rows.push(row),
                None => {
                    skipped += 1;
                    tracing::warn!(
                        source = %observation.source_name,
                        currency = %observation.currency,
                        buy = %observation.buy_rate,
                        sell = %observation.sell_rate,
                        "Skipping invalid rate observation"
                    );
                }
            }
        }

        if rows.is_empty() {
            tracing::warn!(skipped, "No valid observations to store");
            return Ok(0);
        }

        let inserted = rows.len();
        with_retry(self.retry, "append", || insert_all(&self.db, rows.clone())).await?;

        tracing::info!(inserted, skipped, "Stored rate observations");
        Ok(inserted)
    }

    /// Full history, newest first, then by currency.
    pub async fn load_all(&self) -> Result<Vec<RateObservation>, StoreError> {
        let rows = with_retry(self.retry, "load_all", || {
            ExchangeRates::find()
                .order_by(exchange_rates::Column::Timestamp, Order::Desc)
                .order_by(exchange_rates::Column::Currency, Order::Asc)
                .order_by(exchange_rates::Column::Id, Order::Asc)
                .all(&self.db)
        })
        .await?;

        let total = rows.len();
        let observations: Vec<RateObservation> = rows.into_iter().filter_map(from_model).collect();

        if observations.len() < total {
            tracing::warn!(
                dropped = total - observations.len(),
                "Ignored stored rows with unknown currency or unrepresentable rates"
            );
        }

        tracing::info!(count = observations.len(), "Loaded rate history");
        Ok(observations)
    }
}

/// SQLite creates the file with `mode=rwc` but not its directory
fn ensure_sqlite_dir(database_url: &str) {
    let Some(rest) = database_url.strip_prefix("sqlite:") else {
        return;
    };
    let path = rest.trim_start_matches("//").split('?').next().unwrap_or_default();
    if path.is_empty() || path.contains(":memory:") {
        return;
    }

    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!(dir = %parent.display(), error = %e, "Could not create store directory");
        }
    }
}

async fn insert_all(
    db: &DatabaseConnection,
    rows: Vec<exchange_rates::ActiveModel>,
) -> Result<(), DbErr> {
    let txn = db.begin().await?;
    ExchangeRates::insert_many(rows).exec(&txn).await?;
    txn.commit().await
}

fn to_active_model(observation: &RateObservation) -> Option<exchange_rates::ActiveModel> {
    if !observation.is_valid() {
        return None;
    }

    let buy_rate = column_from_decimal(observation.buy_rate)?;
    let sell_rate = column_from_decimal(observation.sell_rate)?;

    Some(exchange_rates::ActiveModel {
        timestamp: Set(observation.timestamp),
        currency: Set(observation.currency.code().to_string()),
        buy_rate: Set(buy_rate),
        sell_rate: Set(sell_rate),
        source_name: Set(observation.source_name.clone()),
        created_at: Set(Some(Utc::now().naive_utc())),
        ..Default::default()
    })
}

fn from_model(row: exchange_rates::Model) -> Option<RateObservation> {
    let currency = match row.currency.parse::<Currency>() {
        Ok(currency) => currency,
        Err(e) => {
            tracing::debug!(id = row.id, error = %e, "Skipping stored row");
            return None;
        }
    };

    Some(RateObservation {
        timestamp: row.timestamp,
        currency,
        source_name: row.source_name,
        buy_rate: decimal_from_column(row.buy_rate)?,
        sell_rate: decimal_from_column(row.sell_rate)?,
    })
}

/// Nearest double to the decimal value
fn column_from_decimal(value: Decimal) -> Option<f64> {
    f64::from_str(&value.to_string())
        .ok()
        .filter(|v| v.is_finite())
}

/// Rebuild the decimal from the shortest text that round-trips the double
fn decimal_from_column(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_str(&value.to_string()).ok()
}

/// Lock contention, connection trouble and a missing or damaged schema;
/// anything else fails immediately.
fn is_transient(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        other => {
            let message = other.to_string().to_lowercase();
            message.contains("database is locked")
                || message.contains("database table is locked")
                || message.contains("busy")
                || message.contains("unable to open database")
                || message.contains("no such table")
                || message.contains("file is not a database")
                || message.contains("database disk image is malformed")
        }
    }
}

async fn with_retry<T, F, Fut>(
    policy: StoreRetryPolicy,
    operation: &'static str,
    mut op: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if is_transient(&e) && attempt < attempts => {
                tracing::warn!(
                    "Store unavailable during {} ({}/{}): {}. Retrying in {:?}",
                    operation,
                    attempt,
                    attempts,
                    e,
                    policy.delay
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) if is_transient(&e) => {
                tracing::error!(operation, attempts, error = %e, "Store unavailable, giving up");
                return Err(StoreError::Unavailable {
                    operation,
                    attempts,
                    source: e,
                });
            }
            Err(e) => {
                tracing::error!(operation, error = %e, "Store operation failed");
                return Err(StoreError::Database {
                    operation,
                    source: e,
                });
            }
        }
    }
}
