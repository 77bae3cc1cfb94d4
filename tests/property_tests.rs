//! Property-based tests for the ledger arithmetic and input normalization.
//!
//! These use proptest to verify invariants across a wide range of inputs,
//! helping to catch edge cases that unit tests might miss.

use proptest::prelude::*;
use stockledger_api::{
    entities::stock_movement::{MovementReference, MovementType},
    errors::StockShortage,
    services::products::normalize_sku,
};

fn quantity_strategy() -> impl Strategy<Value = i32> {
    1i32..1_000_000
}

fn stock_strategy() -> impl Strategy<Value = i32> {
    0i32..1_000_000
}

// Property: stock arithmetic never produces a negative level
proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn in_movements_always_add(current in stock_strategy(), qty in quantity_strategy()) {
        let next = MovementType::In.apply(current, qty);
        prop_assert_eq!(next, Some(current + qty));
    }

    #[test]
    fn out_movements_reject_exactly_the_underflow_cases(
        current in stock_strategy(),
        qty in quantity_strategy(),
    ) {
        match MovementType::Out.apply(current, qty) {
            Some(next) => {
                prop_assert!(qty <= current, "accepted an over-large deduction");
                prop_assert_eq!(next, current - qty);
                prop_assert!(next >= 0);
            }
            None => {
                prop_assert!(qty > current, "rejected a deduction that fits");
            }
        }
    }

    #[test]
    fn applied_sequences_never_go_negative(
        initial in 0i32..1000,
        script in prop::collection::vec((any::<bool>(), 1i32..100), 0..50),
    ) {
        let mut stock = initial;
        let mut signed_sum = 0i32;

        for (is_in, qty) in script {
            let movement = if is_in { MovementType::In } else { MovementType::Out };
            if let Some(next) = movement.apply(stock, qty) {
                // The snapshot invariant: new = previous +/- quantity
                match movement {
                    MovementType::In => prop_assert_eq!(next, stock + qty),
                    MovementType::Out => prop_assert_eq!(next, stock - qty),
                }
                stock = next;
                signed_sum += if is_in { qty } else { -qty };
            }
            prop_assert!(stock >= 0, "stock went negative");
        }

        // Final level equals initial plus the running signed sum of
        // accepted movements
        prop_assert_eq!(stock, initial + signed_sum);
    }
}

// Property: SKU normalization
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn sku_normalization_is_idempotent(raw in "[a-zA-Z0-9 _-]{0,32}") {
        let once = normalize_sku(&raw);
        let twice = normalize_sku(&once);
        prop_assert_eq!(&once, &twice);
        prop_assert!(!once.starts_with(' ') && !once.ends_with(' '));
        prop_assert!(once.chars().all(|c| !c.is_ascii_lowercase()));
    }

    #[test]
    fn equivalent_skus_normalize_identically(raw in "[a-z0-9-]{1,24}") {
        prop_assert_eq!(normalize_sku(&raw), normalize_sku(&raw.to_uppercase()));
    }
}

// Property: shortage reporting
proptest! {
    #[test]
    fn shortage_names_product_and_shortfall(
        requested in 1i32..10_000,
        available in 0i32..10_000,
    ) {
        prop_assume!(requested > available);

        let shortage = StockShortage::new("PROP-SKU", requested, available);
        prop_assert_eq!(shortage.shortfall(), requested - available);

        let message = shortage.to_string();
        prop_assert!(message.contains("PROP-SKU"));
        let requested_needle = format!("requested {}", requested);
        prop_assert!(message.contains(&requested_needle));
        let available_needle = format!("available {}", available);
        prop_assert!(message.contains(&available_needle));
        let shortfall_needle = format!("short by {}", requested - available);
        prop_assert!(message.contains(&shortfall_needle));
    }
}

// Property: the movement enums round-trip through their storage strings
proptest! {
    #[test]
    fn movement_strings_round_trip(_seed in any::<u8>()) {
        for movement in [MovementType::In, MovementType::Out] {
            prop_assert_eq!(MovementType::from_str(movement.as_str()), Some(movement));
        }
        for reference in [
            MovementReference::Purchase,
            MovementReference::Sale,
            MovementReference::Manual,
            MovementReference::Adjustment,
            MovementReference::Return,
        ] {
            prop_assert_eq!(MovementReference::from_str(reference.as_str()), Some(reference));
        }
    }
}
