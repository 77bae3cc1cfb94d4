use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::EntityStatus;

/// Units of measure accepted for catalog entries.
pub const RECOGNIZED_UNITS: [&str; 10] = [
    "pcs", "box", "pack", "carton", "dozen", "kg", "g", "l", "ml", "m",
];

/// Product catalog entry.
///
/// `quantity` is owned by the movement ledger: the only write path is
/// `ProductService::adjust_quantity`, invoked inside the same transaction as
/// the corresponding stock movement insert.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Stock keeping unit, unique and stored uppercase-normalized
    #[validate(length(min = 1, max = 64, message = "SKU must be between 1 and 64 characters"))]
    pub sku: String,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Product name must be between 1 and 255 characters"
    ))]
    pub name: String,

    pub category_id: Option<Uuid>,

    /// Cost of acquiring one unit
    pub purchase_price: Decimal,

    /// Price one unit sells for; never below purchase_price
    pub selling_price: Decimal,

    /// On-hand quantity; mutated only via the movement ledger
    pub quantity: i32,

    /// Unit of measure, member of RECOGNIZED_UNITS
    pub unit: String,

    /// Quantity at or below which the product reports as low stock
    pub low_stock_threshold: i32,

    /// active | inactive
    pub status: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn is_active(&self) -> bool {
        self.status == EntityStatus::Active.as_str()
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.low_stock_threshold
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.quantity == 0
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(has_many = "super::stock_movement::Entity")]
    StockMovements,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::stock_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockMovements.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        if insert {
            if let ActiveValue::NotSet = active_model.status {
                active_model.status = Set(EntityStatus::Active.as_str().to_string());
            }
            active_model.created_at = Set(Utc::now());
        }

        active_model.updated_at = Set(Some(Utc::now()));

        let model: Model = active_model.clone().try_into().map_err(|_| {
            DbErr::Custom("Failed to convert ActiveModel to Model for validation".to_string())
        })?;

        if let Err(err) = model.validate() {
            return Err(DbErr::Custom(format!("Validation error: {}", err)));
        }

        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> Model {
        Model {
            id: Uuid::new_v4(),
            sku: "WIDGET-1".into(),
            name: "Widget".into(),
            category_id: None,
            purchase_price: dec!(8.00),
            selling_price: dec!(20.00),
            quantity: 10,
            unit: "pcs".into(),
            low_stock_threshold: 5,
            status: "active".into(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn low_stock_is_inclusive_of_threshold() {
        let mut product = sample();
        assert!(!product.is_low_stock());

        product.quantity = 5;
        assert!(product.is_low_stock());

        product.quantity = 0;
        assert!(product.is_low_stock());
        assert!(product.is_out_of_stock());
    }

    #[test]
    fn recognized_units_contain_the_basics() {
        assert!(RECOGNIZED_UNITS.contains(&"pcs"));
        assert!(RECOGNIZED_UNITS.contains(&"kg"));
        assert!(!RECOGNIZED_UNITS.contains(&"lightyear"));
    }
}
