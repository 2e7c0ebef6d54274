// crates/growth-ir/src/predicate.rs
// ============================================================================
// Module: Predicate Sub-language
// Description: Evaluation of `PredNode`/`PredOp` atoms over a single
// candidate event's properties.
// Purpose: Shared by event-history adapters to implement an `Events.*`
// query's `where` clause without reimplementing coercion rules.
// Dependencies: crate::node, crate::value, regex, time
// ============================================================================

//! ## Overview
//! Adapters filter candidate events with [`matches`], which applies the
//! same numeric-then-string-then-boolean coercion chain the top-level
//! evaluator uses, plus the predicate-only atoms (`icontains`, `contains`,
//! `regex`, date comparisons) that only make sense against a single
//! property value (spec §4.1).

// ============================================================================
// SECTION: Imports
// ============================================================================

use regex::Regex;
use time::OffsetDateTime;

use crate::node::PredNode;
use crate::node::PredOp;
use crate::value::IrValue;

// ============================================================================
// SECTION: Matching
// ============================================================================

/// Evaluates a predicate tree against a property lookup function.
///
/// `get` resolves a property key to its value on the candidate event;
/// absent properties resolve to `None`, matched as [`IrValue::Null`].
#[must_use]
pub fn matches(pred: &PredNode, get: &dyn Fn(&str) -> Option<IrValue>) -> bool {
    match pred {
        PredNode::Atom { key, op } => {
            let value = get(key).unwrap_or(IrValue::Null);
            matches_atom(&value, op)
        }
        PredNode::And(children) => children.iter().all(|child| matches(child, get)),
        PredNode::Or(children) => children.iter().any(|child| matches(child, get)),
    }
}

fn matches_atom(value: &IrValue, op: &PredOp) -> bool {
    match op {
        PredOp::IsSet => !value.is_unset(),
        PredOp::IsNotSet => value.is_unset(),
        PredOp::Eq(other) => crate::eval::values_equal(value, other),
        PredOp::Neq(other) => !crate::eval::values_equal(value, other),
        PredOp::Gt(other) => crate::eval::ordered_compare(value, other) == Some(std::cmp::Ordering::Greater),
        PredOp::Gte(other) => matches!(
            crate::eval::ordered_compare(value, other),
            Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
        ),
        PredOp::Lt(other) => crate::eval::ordered_compare(value, other) == Some(std::cmp::Ordering::Less),
        PredOp::Lte(other) => matches!(
            crate::eval::ordered_compare(value, other),
            Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
        ),
        PredOp::Icontains(needle) => substring_match(value, needle, true),
        PredOp::Contains(needle) => substring_match(value, needle, false),
        PredOp::Regex(pattern) => Regex::new(pattern)
            .ok()
            .zip(value.as_display_string())
            .is_some_and(|(re, hay)| re.is_match(&hay)),
        PredOp::In(items) => items.iter().any(|item| crate::eval::numeric_tolerant_equal(value, item)),
        PredOp::NotIn(items) => !items.iter().any(|item| crate::eval::numeric_tolerant_equal(value, item)),
        PredOp::IsDateExact(other) => same_calendar_day(value, other),
        PredOp::IsDateAfter(other) => compare_dates(value, other) == Some(std::cmp::Ordering::Greater),
        PredOp::IsDateBefore(other) => compare_dates(value, other) == Some(std::cmp::Ordering::Less),
    }
}

fn substring_match(value: &IrValue, needle: &IrValue, case_insensitive: bool) -> bool {
    let Some(needle_str) = needle.as_display_string() else {
        return false;
    };
    let haystacks: Vec<String> = match value {
        IrValue::List(items) => items.iter().filter_map(IrValue::as_display_string).collect(),
        other => other.as_display_string().into_iter().collect(),
    };
    haystacks.iter().any(|hay| {
        if case_insensitive {
            hay.to_lowercase().contains(&needle_str.to_lowercase())
        } else {
            hay.contains(&needle_str)
        }
    })
}

fn same_calendar_day(left: &IrValue, right: &IrValue) -> bool {
    match (floor_to_day(left), floor_to_day(right)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn compare_dates(left: &IrValue, right: &IrValue) -> Option<std::cmp::Ordering> {
    let left = left.as_timestamp()?;
    let right = right.as_timestamp()?;
    Some(left.cmp(&right))
}

fn floor_to_day(value: &IrValue) -> Option<OffsetDateTime> {
    let timestamp = value.as_timestamp()?;
    let midnight = timestamp.replace_time(time::Time::MIDNIGHT);
    Some(midnight)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use super::*;

    fn props(entries: &[(&str, IrValue)]) -> impl Fn(&str) -> Option<IrValue> + '_ {
        move |key| entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v.clone())
    }

    #[test]
    fn is_set_and_is_not_set() {
        let get = props(&[("plan", IrValue::String("pro".to_string()))]);
        assert!(matches(&PredNode::Atom { key: "plan".to_string(), op: PredOp::IsSet }, &get));
        assert!(matches(&PredNode::Atom { key: "missing".to_string(), op: PredOp::IsNotSet }, &get));
    }

    #[test]
    fn icontains_is_case_insensitive_and_checks_lists() {
        let get = props(&[("tags", IrValue::List(vec![IrValue::String("Pro-User".to_string())]))]);
        assert!(matches(
            &PredNode::Atom { key: "tags".to_string(), op: PredOp::Icontains(IrValue::String("pro".to_string())) },
            &get
        ));
    }

    #[test]
    fn regex_compile_error_is_false() {
        let get = props(&[("name", IrValue::String("x".to_string()))]);
        assert!(!matches(
            &PredNode::Atom { key: "name".to_string(), op: PredOp::Regex("(".to_string()) },
            &get
        ));
    }

    #[test]
    fn and_or_compose() {
        let get = props(&[("a", IrValue::from_i64(1)), ("b", IrValue::from_i64(2))]);
        let tree = PredNode::And(vec![
            PredNode::Atom { key: "a".to_string(), op: PredOp::Eq(IrValue::from_i64(1)) },
            PredNode::Or(vec![
                PredNode::Atom { key: "b".to_string(), op: PredOp::Eq(IrValue::from_i64(99)) },
                PredNode::Atom { key: "b".to_string(), op: PredOp::Eq(IrValue::from_i64(2)) },
            ]),
        ]);
        assert!(matches(&tree, &get));
    }
}
