//! `SeaORM` Entity for the append-only exchange_rates table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "exchange_rates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Run timestamp in the source's local zone, minute precision
    pub timestamp: DateTime,
    /// Currency code, e.g. "USD" or "RUB 100"
    pub currency: String,
    #[sea_orm(column_type = "Double")]
    pub buy_rate: f64,
    #[sea_orm(column_type = "Double")]
    pub sell_rate: f64,
    /// Bank name, or the reserved best-rate marker
    pub source_name: String,
    pub created_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
