// crates/growth-ir/tests/coercion_properties.rs
// ============================================================================
// Statistical/property coverage for the evaluator's coercion chain.
// ============================================================================

#![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

use growth_ir::IrValue;
use proptest::prelude::*;

proptest! {
    #[test]
    fn integers_round_trip_through_number_coercion(n in any::<i64>()) {
        let value = IrValue::from_i64(n);
        let coerced = value.as_number().unwrap();
        prop_assert_eq!(coerced.to_string(), n.to_string());
    }

    #[test]
    fn numeric_strings_equal_their_number_literal(n in -10_000_i64..10_000) {
        let as_string = IrValue::String(n.to_string());
        let as_number = IrValue::from_i64(n);
        prop_assert_eq!(as_string.as_number(), as_number.as_number());
    }

    #[test]
    fn non_numeric_strings_never_coerce(s in "[a-zA-Z]{1,16}") {
        let value = IrValue::String(s);
        prop_assert!(value.as_number().is_none());
    }
}
