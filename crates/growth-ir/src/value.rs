// crates/growth-ir/src/value.rs
// ============================================================================
// Module: IR Value
// Description: The typed value vocabulary the evaluator produces and
// consumes: literals, property reads, and adapter answers all speak this
// type.
// Purpose: Keep the evaluator fully independent of any domain crate's
// property-bag representation; domain crates convert at the adapter
// boundary instead of sharing a type.
// Dependencies: bigdecimal, time
// ============================================================================

//! ## Overview
//! [`IrValue`] mirrors the shape of a domain event/user property value
//! (null, bool, decimal number, string, timestamp, duration, list) without
//! depending on any crate that owns such a type. This is the same
//! separation the evaluator's ancestor keeps between its generic
//! requirement tree and a caller-supplied evidence type.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

// ============================================================================
// SECTION: IrValue
// ============================================================================

/// A typed value flowing through the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum IrValue {
    /// Absence of a value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Arbitrary-precision decimal number.
    Number(#[serde(with = "big_decimal_as_string")] BigDecimal),
    /// UTF-8 string value.
    String(String),
    /// Absolute point in time.
    Timestamp(#[serde(with = "time::serde::rfc3339")] OffsetDateTime),
    /// Span of time, in whole seconds.
    Duration(i64),
    /// Ordered list of values.
    List(Vec<IrValue>),
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

impl IrValue {
    /// Creates a number value from an `i64`.
    #[must_use]
    pub fn from_i64(value: i64) -> Self {
        Self::Number(BigDecimal::from(value))
    }

    /// Returns true when this value is "unset" for the `is_set`/`is_not_set`
    /// predicate atoms (spec §4.1 predicate sub-language).
    #[must_use]
    pub fn is_unset(&self) -> bool {
        match self {
            Self::Null => true,
            Self::String(value) => value.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Bool(_) | Self::Number(_) | Self::Timestamp(_) | Self::Duration(_) => false,
        }
    }

    /// Coerces this value to a number, when a numeric interpretation exists
    /// (spec §4.1: "numeric comparison attempted first").
    #[must_use]
    pub fn as_number(&self) -> Option<BigDecimal> {
        match self {
            Self::Number(value) => Some(value.clone()),
            Self::Bool(value) => Some(BigDecimal::from(i64::from(*value))),
            Self::String(value) => BigDecimal::from_str(value.trim()).ok(),
            Self::Timestamp(value) => BigDecimal::from_str(&value.unix_timestamp().to_string()).ok(),
            Self::Duration(value) => Some(BigDecimal::from(*value)),
            Self::Null | Self::List(_) => None,
        }
    }

    /// Coerces this value to a display string, for lexicographic fallback
    /// comparison (spec §4.1: "then lexicographic string comparison").
    #[must_use]
    pub fn as_display_string(&self) -> Option<String> {
        match self {
            Self::String(value) => Some(value.clone()),
            Self::Number(value) => Some(value.to_string()),
            Self::Bool(value) => Some(value.to_string()),
            Self::Timestamp(value) => value
                .format(&time::format_description::well_known::Rfc3339)
                .ok(),
            Self::Null | Self::Duration(_) | Self::List(_) => None,
        }
    }

    /// Coerces this value to a boolean, when a boolean interpretation
    /// exists (spec §4.1: "then boolean equality").
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Coerces this value to a timestamp. Accepts epoch seconds, RFC 3339
    /// (with or without fractional seconds), or any numerically coercible
    /// value (spec §4.1: "Dates accept epoch seconds, ISO-8601 ... or any
    /// value coercible to number").
    #[must_use]
    pub fn as_timestamp(&self) -> Option<OffsetDateTime> {
        if let Self::Timestamp(value) = self {
            return Some(*value);
        }
        if let Self::String(raw) = self {
            if let Ok(parsed) = OffsetDateTime::parse(raw, &time::format_description::well_known::Rfc3339) {
                return Some(parsed);
            }
        }
        let seconds = self.as_number()?;
        let whole = seconds.with_scale(0).to_string();
        let unix = i64::from_str(&whole).ok()?;
        OffsetDateTime::from_unix_timestamp(unix).ok()
    }

    /// Returns the elements of a list value, if this is one.
    #[must_use]
    pub fn as_list(&self) -> Option<&[IrValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}
