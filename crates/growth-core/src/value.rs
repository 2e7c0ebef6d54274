// crates/growth-core/src/value.rs
// ============================================================================
// Module: Dynamic Property Value
// Description: Typed dynamic value shared by event properties, user
// property bags, and the IR evaluator.
// Purpose: Replace the "dynamic property bag" notion named in the data
// model with one concrete, serializable type instead of raw JSON, so
// coercion rules stay localized to the evaluator (spec §9).
// Dependencies: bigdecimal, serde, time
// ============================================================================

//! ## Overview
//! [`DynValue`] is the single currency events, user properties, and IR
//! literals are expressed in. Numbers use [`BigDecimal`] rather than `f64`
//! so the evaluator's numeric coercion (spec §4.1) is decimal-aware and
//! deterministic, matching the teacher's comparator convention
//! (`decision-gate-core::runtime::comparator`).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde::Serialize;
use time::Duration as TimeDuration;
use time::OffsetDateTime;

// ============================================================================
// SECTION: DynValue
// ============================================================================

/// A typed dynamic value for event properties, user properties, and IR
/// literals.
///
/// # Invariants
/// - `Number` carries exact decimal text; no value is silently widened to
///   `f64` anywhere in the core.
/// - `Timestamp` is always UTC; callers normalize before constructing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DynValue {
    /// Absence of a value, distinct from "key not present".
    Null,
    /// Boolean value.
    Bool(bool),
    /// Arbitrary-precision decimal number.
    Number(
        #[serde(with = "big_decimal_as_string")]
        BigDecimal,
    ),
    /// UTF-8 string value.
    String(String),
    /// Absolute point in time.
    Timestamp(#[serde(with = "time::serde::rfc3339")] OffsetDateTime),
    /// Span of time.
    Duration(
        #[serde(with = "duration_as_seconds")]
        TimeDuration,
    ),
    /// Ordered list of values.
    List(Vec<DynValue>),
    /// String-keyed map of values, ordered for deterministic hashing.
    Map(BTreeMap<String, DynValue>),
}

impl DynValue {
    /// Creates a number value from an `i64`.
    #[must_use]
    pub fn from_i64(value: i64) -> Self {
        Self::Number(BigDecimal::from(value))
    }

    /// Creates a number value from an `f64`, returning `Null` if the value
    /// is not finite (`NaN`/`inf` have no decimal representation).
    #[must_use]
    pub fn from_f64(value: f64) -> Self {
        BigDecimal::from_str(&value.to_string()).map_or(Self::Null, Self::Number)
    }

    /// Returns true when the value is semantically "unset" (`Null`, or an
    /// empty string/list/map) for the evaluator's `is_set`/`is_not_set`
    /// predicate atoms.
    #[must_use]
    pub fn is_unset(&self) -> bool {
        match self {
            Self::Null => true,
            Self::String(value) => value.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Map(entries) => entries.is_empty(),
            Self::Bool(_) | Self::Number(_) | Self::Timestamp(_) | Self::Duration(_) => false,
        }
    }

    /// Returns the value coerced to a `BigDecimal`, when a numeric
    /// interpretation exists (spec §4.1: "numeric comparison attempted
    /// first").
    #[must_use]
    pub fn as_number(&self) -> Option<BigDecimal> {
        match self {
            Self::Number(value) => Some(value.clone()),
            Self::Bool(value) => Some(BigDecimal::from(i64::from(*value))),
            Self::String(value) => BigDecimal::from_str(value.trim()).ok(),
            Self::Timestamp(value) => BigDecimal::from_str(&value.unix_timestamp().to_string()).ok(),
            Self::Duration(value) => BigDecimal::from_str(&value.whole_seconds().to_string()).ok(),
            Self::Null | Self::List(_) | Self::Map(_) => None,
        }
    }

    /// Returns the value rendered as a string, for lexicographic fallback
    /// comparison (spec §4.1: "then lexicographic string comparison").
    #[must_use]
    pub fn as_display_string(&self) -> Option<String> {
        match self {
            Self::String(value) => Some(value.clone()),
            Self::Number(value) => Some(value.to_string()),
            Self::Bool(value) => Some(value.to_string()),
            Self::Timestamp(value) => crate::time::format_rfc3339(*value).ok(),
            Self::Null | Self::Duration(_) | Self::List(_) | Self::Map(_) => None,
        }
    }

    /// Returns the value as a boolean, when a boolean interpretation
    /// exists (spec §4.1: "then boolean equality").
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the elements of a list value, if this is one.
    #[must_use]
    pub fn as_list(&self) -> Option<&[DynValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

mod big_decimal_as_string {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    pub(super) fn serialize<S: Serializer>(value: &BigDecimal, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&value.to_string())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<BigDecimal, D::Error> {
        let raw = String::deserialize(de)?;
        BigDecimal::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

mod duration_as_seconds {
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;
    use time::Duration;

    pub(super) fn serialize<S: Serializer>(value: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_i64(value.whole_seconds())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        let raw = i64::deserialize(de)?;
        Ok(Duration::seconds(raw))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use super::*;

    #[test]
    fn is_unset_matches_spec_atoms() {
        assert!(DynValue::Null.is_unset());
        assert!(DynValue::String(String::new()).is_unset());
        assert!(!DynValue::String("x".to_string()).is_unset());
        assert!(!DynValue::Bool(false).is_unset());
    }

    #[test]
    fn numeric_coercion_accepts_numeric_strings() {
        let value = DynValue::String("42.5".to_string());
        assert_eq!(value.as_number(), BigDecimal::from_str("42.5").ok());
    }

    #[test]
    fn numeric_coercion_rejects_non_numeric_strings() {
        let value = DynValue::String("not-a-number".to_string());
        assert_eq!(value.as_number(), None);
    }

    #[test]
    fn round_trips_through_json() {
        let value = DynValue::List(vec![DynValue::from_i64(1), DynValue::Bool(true)]);
        let json = serde_json::to_string(&value).unwrap();
        let back: DynValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
