use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveModelBehavior;
use serde::{Deserialize, Serialize};

/// Fixed primary key: the snapshot table holds exactly one row that
/// `rebuild()` overwrites.
pub const SNAPSHOT_ROW_ID: i32 = 1;

/// Cached dashboard overview, written only by an explicit rebuild.
///
/// Reads served from this row are eventually consistent with concurrent
/// ledger writes; the live computation path is authoritative.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dashboard_snapshots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub total_products: i64,
    pub active_products: i64,
    pub total_stock: i64,
    pub low_stock_products: i64,
    pub inventory_value: Decimal,
    pub total_sales: Decimal,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
    pub generated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
