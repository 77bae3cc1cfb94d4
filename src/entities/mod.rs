use serde::{Deserialize, Serialize};

pub mod category;
pub mod dashboard_snapshot;
pub mod invoice;
pub mod invoice_item;
pub mod product;
pub mod purchase_order;
pub mod purchase_order_item;
pub mod staff_member;
pub mod stock_movement;
pub mod vendor;

/// Lifecycle status shared by products and the reference entities
/// (categories, vendors, staff). Records are soft-deactivated, never
/// hard-removed while orders or invoices reference them.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    Active,
    Inactive,
}

impl EntityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityStatus::Active => "active",
            EntityStatus::Inactive => "inactive",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn entity_status_round_trips_through_strings() {
        assert_eq!(EntityStatus::Active.as_str(), "active");
        assert_eq!(
            EntityStatus::from_str("inactive").unwrap(),
            EntityStatus::Inactive
        );
        assert!(EntityStatus::from_str("archived").is_err());
    }
}
