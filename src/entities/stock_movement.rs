use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    In,
    Out,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "in",
            MovementType::Out => "out",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in" => Some(MovementType::In),
            "out" => Some(MovementType::Out),
            _ => None,
        }
    }

    /// Applies this movement to a stock level. Returns the resulting level,
    /// or `None` when an out-movement would drive stock negative — callers
    /// must reject that case, never clamp it.
    pub fn apply(&self, current: i32, quantity: i32) -> Option<i32> {
        match self {
            MovementType::In => current.checked_add(quantity),
            MovementType::Out => {
                let next = current - quantity;
                if next < 0 {
                    None
                } else {
                    Some(next)
                }
            }
        }
    }
}

/// Business reason a movement occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementReference {
    Purchase,
    Sale,
    Manual,
    Adjustment,
    Return,
}

impl MovementReference {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementReference::Purchase => "purchase",
            MovementReference::Sale => "sale",
            MovementReference::Manual => "manual",
            MovementReference::Adjustment => "adjustment",
            MovementReference::Return => "return",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "purchase" => Some(MovementReference::Purchase),
            "sale" => Some(MovementReference::Sale),
            "manual" => Some(MovementReference::Manual),
            "adjustment" => Some(MovementReference::Adjustment),
            "return" => Some(MovementReference::Return),
            _ => None,
        }
    }
}

/// Append-only audit record of one stock quantity change. Rows are inserted
/// exactly once per stock-affecting event and never updated or deleted.
///
/// Invariant: `new_stock = previous_stock + quantity` for type=in,
/// `previous_stock - quantity` for type=out, and `new_stock >= 0` always.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    /// Stored as string in the DB, converted to/from MovementType
    pub r#type: String,
    pub quantity: i32,
    pub previous_stock: i32,
    pub new_stock: i32,
    /// Stored as string in the DB, converted to/from MovementReference
    pub reference_type: String,
    /// Optional link to the order or invoice that caused the movement
    pub reference_id: Option<Uuid>,
    pub performed_by: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn movement_type(&self) -> Option<MovementType> {
        MovementType::from_str(&self.r#type)
    }

    pub fn reference(&self) -> Option<MovementReference> {
        MovementReference::from_str(&self.reference_type)
    }

    /// Quantity with sign applied: positive for in, negative for out.
    pub fn signed_quantity(&self) -> i32 {
        match self.movement_type() {
            Some(MovementType::In) => self.quantity,
            Some(MovementType::Out) => -self.quantity,
            None => 0,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_adds_for_in_movements() {
        assert_eq!(MovementType::In.apply(10, 5), Some(15));
        assert_eq!(MovementType::In.apply(0, 1), Some(1));
    }

    #[test]
    fn apply_rejects_underflow_instead_of_clamping() {
        assert_eq!(MovementType::Out.apply(10, 3), Some(7));
        assert_eq!(MovementType::Out.apply(7, 7), Some(0));
        assert_eq!(MovementType::Out.apply(7, 8), None);
        assert_eq!(MovementType::Out.apply(0, 1), None);
    }

    #[test]
    fn movement_enums_round_trip() {
        for t in [MovementType::In, MovementType::Out] {
            assert_eq!(MovementType::from_str(t.as_str()), Some(t));
        }
        for r in [
            MovementReference::Purchase,
            MovementReference::Sale,
            MovementReference::Manual,
            MovementReference::Adjustment,
            MovementReference::Return,
        ] {
            assert_eq!(MovementReference::from_str(r.as_str()), Some(r));
        }
        assert_eq!(MovementType::from_str("sideways"), None);
        assert_eq!(MovementReference::from_str("gift"), None);
    }

    #[test]
    fn signed_quantity_reflects_direction() {
        let mut entry = Model {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            r#type: "in".into(),
            quantity: 4,
            previous_stock: 0,
            new_stock: 4,
            reference_type: "purchase".into(),
            reference_id: None,
            performed_by: "tester".into(),
            note: None,
            created_at: Utc::now(),
        };
        assert_eq!(entry.signed_quantity(), 4);

        entry.r#type = "out".into();
        assert_eq!(entry.signed_quantity(), -4);
    }
}
