// crates/growth-ir/src/eval.rs
// ============================================================================
// Module: Node Evaluation
// Description: Recursive evaluation of an IR node tree against an
// `EvalContext`, and the coercion chain shared by comparisons and
// predicate atoms.
// Purpose: One evaluator implementation for campaign triggers, segment
// membership, branch conditions, and wait-until predicates (spec §4.1).
// Dependencies: crate::context, crate::error, crate::node, crate::value
// ============================================================================

//! ## Overview
//! [`evaluate`] walks an [`IrEnvelope`] top-down. Adapter calls
//! (`Segment`, `Feature`, `Events.*`) are the only points that can fail;
//! everywhere else evaluation is pure. [`evaluate_predicate`] wraps
//! [`evaluate`] with the fail-closed contract the rest of the core relies
//! on: any evaluation error, or a non-boolean result, is `false`, never a
//! propagated error or a panic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use time::Duration;

use crate::context::EvalContext;
use crate::error::IrError;
use crate::node::CompareOp;
use crate::node::IrEnvelope;
use crate::node::IrNode;
use crate::node::CURRENT_VERSION;
use crate::value::IrValue;

// ============================================================================
// SECTION: Entry points
// ============================================================================

/// Evaluates an envelope to its typed result (spec §4.1 contract).
///
/// # Errors
///
/// Returns [`IrError::UnsupportedVersion`] if the envelope's version is not
/// understood, or an adapter error if a `Segment`/`Feature`/`Events` node's
/// adapter call fails.
pub async fn evaluate(envelope: &IrEnvelope, ctx: &EvalContext<'_>) -> Result<IrValue, IrError> {
    if envelope.version != CURRENT_VERSION {
        return Err(IrError::UnsupportedVersion(envelope.version));
    }
    eval_node(&envelope.expr, ctx).await
}

/// Evaluates an envelope as a predicate, fail-closed: any evaluation error
/// or non-boolean result is treated as `false` (spec §4.1/§9: the core
/// never lets evaluator errors propagate past a predicate boundary).
pub async fn evaluate_predicate(envelope: &IrEnvelope, ctx: &EvalContext<'_>) -> bool {
    match evaluate(envelope, ctx).await {
        Ok(value) => truthy(&value),
        Err(_) => false,
    }
}

/// Coerces an evaluated value to boolean for use in `And`/`Or`/`Not` and as
/// the predicate result. `Null` is falsy; numbers, strings, and lists are
/// falsy only when empty/zero; everything else is truthy.
#[must_use]
pub fn truthy(value: &IrValue) -> bool {
    match value {
        IrValue::Null => false,
        IrValue::Bool(flag) => *flag,
        IrValue::Number(number) => !number.is_zero(),
        IrValue::String(text) => !text.is_empty(),
        IrValue::List(items) => !items.is_empty(),
        IrValue::Timestamp(_) | IrValue::Duration(_) => true,
    }
}

// ============================================================================
// SECTION: Node evaluation
// ============================================================================

#[async_recursion::async_recursion]
async fn eval_node(node: &IrNode, ctx: &EvalContext<'_>) -> Result<IrValue, IrError> {
    match node {
        IrNode::Literal(value) => Ok(value.clone()),
        IrNode::And(children) => {
            for child in children {
                if !truthy(&eval_node(child, ctx).await?) {
                    return Ok(IrValue::Bool(false));
                }
            }
            Ok(IrValue::Bool(true))
        }
        IrNode::Or(children) => {
            for child in children {
                if truthy(&eval_node(child, ctx).await?) {
                    return Ok(IrValue::Bool(true));
                }
            }
            Ok(IrValue::Bool(false))
        }
        IrNode::Not(inner) => Ok(IrValue::Bool(!truthy(&eval_node(inner, ctx).await?))),
        IrNode::Compare { op, left, right } => {
            let left = eval_node(left, ctx).await?;
            let right = eval_node(right, ctx).await?;
            Ok(IrValue::Bool(apply_compare(&left, &right, *op)))
        }
        IrNode::User { op, key, value } => {
            let property = ctx.user.get(key).unwrap_or(IrValue::Null);
            eval_property_read(property, value.as_deref(), *op, ctx).await
        }
        IrNode::Event { op, key, value } => {
            let property = ctx.event.and_then(|event| event.get(key)).unwrap_or(IrValue::Null);
            eval_property_read(property, value.as_deref(), *op, ctx).await
        }
        IrNode::Segment { op, id, within } => {
            let member = ctx.segments.is_member(id, *within).await?;
            match op {
                CompareOp::Eq => Ok(IrValue::Bool(member)),
                CompareOp::Neq => Ok(IrValue::Bool(!member)),
                other => Err(IrError::InvalidNode(format!("segment nodes do not support {other:?}"))),
            }
        }
        IrNode::Feature { op, id, value } => {
            let granted = ctx.features.value(id).await?;
            match (value, granted) {
                (None, resolved) => Ok(IrValue::Bool(resolved.is_some_and(|v| truthy(&v)))),
                (Some(_), None) => Ok(IrValue::Bool(false)),
                (Some(expected), Some(actual)) => {
                    let expected = eval_node(expected, ctx).await?;
                    Ok(IrValue::Bool(apply_compare(&actual, &expected, *op)))
                }
            }
        }
        IrNode::Events(query) => ctx.history.query(query, ctx.now).await,
        IrNode::TimeNow => Ok(IrValue::Timestamp(ctx.now)),
        IrNode::TimeAgo(seconds) => Ok(IrValue::Timestamp(ctx.now - Duration::seconds(*seconds))),
        IrNode::TimeWindow { value, interval } => {
            let back = Duration::seconds(value * interval.seconds());
            Ok(IrValue::Timestamp(ctx.now - back))
        }
        IrNode::JourneyId => Ok(ctx.journey_id.map_or(IrValue::Null, |id| IrValue::String(id.to_string()))),
    }
}

async fn eval_property_read(
    property: IrValue,
    value: Option<&IrNode>,
    op: CompareOp,
    ctx: &EvalContext<'_>,
) -> Result<IrValue, IrError> {
    match value {
        None => Ok(property),
        Some(node) => {
            let expected = eval_node(node, ctx).await?;
            Ok(IrValue::Bool(apply_compare(&property, &expected, op)))
        }
    }
}

// ============================================================================
// SECTION: Comparison and coercion
// ============================================================================

fn apply_compare(left: &IrValue, right: &IrValue, op: CompareOp) -> bool {
    match op {
        CompareOp::Eq => values_equal(left, right),
        CompareOp::Neq => !values_equal(left, right),
        CompareOp::Lt => ordered_compare(left, right) == Some(Ordering::Less),
        CompareOp::Lte => matches!(ordered_compare(left, right), Some(Ordering::Less | Ordering::Equal)),
        CompareOp::Gt => ordered_compare(left, right) == Some(Ordering::Greater),
        CompareOp::Gte => matches!(ordered_compare(left, right), Some(Ordering::Greater | Ordering::Equal)),
        CompareOp::In => membership(left, right),
        CompareOp::NotIn => !membership(left, right),
    }
}

fn membership(left: &IrValue, right: &IrValue) -> bool {
    let Some(items) = right.as_list() else {
        return false;
    };
    items.iter().any(|item| numeric_tolerant_equal(left, item))
}

/// Equality with the coercion chain from spec §4.1: numeric first (with
/// `in`-style tolerance so float-derived literals still match), then
/// lexicographic string, then boolean.
#[must_use]
pub(crate) fn numeric_tolerant_equal(left: &IrValue, right: &IrValue) -> bool {
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return numbers_within_one_ulp(&a, &b);
    }
    values_equal(left, right)
}

/// Equality with the coercion chain from spec §4.1, without numeric
/// tolerance (used for plain `==`/`!=` and predicate `eq`/`neq`).
#[must_use]
pub(crate) fn values_equal(left: &IrValue, right: &IrValue) -> bool {
    if matches!(left, IrValue::Null) || matches!(right, IrValue::Null) {
        return matches!(left, IrValue::Null) && matches!(right, IrValue::Null);
    }
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (left.as_display_string(), right.as_display_string()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (left.as_bool(), right.as_bool()) {
        return a == b;
    }
    false
}

/// Ordering with the same coercion chain as [`values_equal`]; boolean has
/// no natural order, so the chain bottoms out at `None` rather than a
/// boolean comparison.
#[must_use]
pub(crate) fn ordered_compare(left: &IrValue, right: &IrValue) -> Option<Ordering> {
    if matches!(left, IrValue::Null) || matches!(right, IrValue::Null) {
        return None;
    }
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return Some(a.cmp(&b));
    }
    if let (Some(a), Some(b)) = (left.as_display_string(), right.as_display_string()) {
        return Some(a.cmp(&b));
    }
    None
}

fn numbers_within_one_ulp(left: &BigDecimal, right: &BigDecimal) -> bool {
    if left == right {
        return true;
    }
    let magnitude = left.abs().max(right.abs());
    let Ok(epsilon) = BigDecimal::from_str("0.0000000000000002220446049250313") else {
        return false;
    };
    let tolerance = magnitude * epsilon;
    (left - right).abs() <= tolerance
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use async_trait::async_trait;
    use time::OffsetDateTime;

    use super::*;
    use crate::context::EventView;
    use crate::context::EventHistoryAdapter;
    use crate::context::FeatureAdapter;
    use crate::context::SegmentAdapter;
    use crate::context::UserView;
    use crate::node::EventHistoryQuery;
    use crate::node::IrNode;

    struct MapUser(std::collections::BTreeMap<String, IrValue>);
    impl UserView for MapUser {
        fn get(&self, key: &str) -> Option<IrValue> {
            self.0.get(key).cloned()
        }
    }

    struct NoopSegments(bool);
    #[async_trait]
    impl SegmentAdapter for NoopSegments {
        async fn is_member(&self, _segment_id: &str, _within: Option<i64>) -> Result<bool, IrError> {
            Ok(self.0)
        }
    }

    struct NoopFeatures(Option<IrValue>);
    #[async_trait]
    impl FeatureAdapter for NoopFeatures {
        async fn value(&self, _feature_id: &str) -> Result<Option<IrValue>, IrError> {
            Ok(self.0.clone())
        }
    }

    struct NoopHistory;
    #[async_trait]
    impl EventHistoryAdapter for NoopHistory {
        async fn query(&self, _query: &EventHistoryQuery, _now: OffsetDateTime) -> Result<IrValue, IrError> {
            Ok(IrValue::from_i64(0))
        }
    }

    fn ctx<'a>(
        user: &'a dyn UserView,
        segments: &'a dyn SegmentAdapter,
        features: &'a dyn FeatureAdapter,
        history: &'a dyn EventHistoryAdapter,
    ) -> EvalContext<'a> {
        EvalContext {
            now: OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
            user,
            event: None,
            journey_id: None,
            segments,
            features,
            history,
        }
    }

    #[tokio::test]
    async fn branch_on_user_property_matches_spec_scenario() {
        let mut props = std::collections::BTreeMap::new();
        props.insert("plan".to_string(), IrValue::String("pro".to_string()));
        let user = MapUser(props);
        let segments = NoopSegments(false);
        let features = NoopFeatures(None);
        let history = NoopHistory;
        let eval_ctx = ctx(&user, &segments, &features, &history);

        let node = IrNode::User {
            op: CompareOp::Eq,
            key: "plan".to_string(),
            value: Some(Box::new(IrNode::Literal(IrValue::String("pro".to_string())))),
        };
        let envelope = IrEnvelope::new(node);
        assert!(evaluate_predicate(&envelope, &eval_ctx).await);
    }

    #[tokio::test]
    async fn and_short_circuits_on_first_false() {
        let user = MapUser(std::collections::BTreeMap::new());
        let segments = NoopSegments(false);
        let features = NoopFeatures(None);
        let history = NoopHistory;
        let eval_ctx = ctx(&user, &segments, &features, &history);

        let node = IrNode::And(vec![IrNode::Literal(IrValue::Bool(false)), IrNode::Literal(IrValue::Bool(true))]);
        let envelope = IrEnvelope::new(node);
        assert!(!evaluate_predicate(&envelope, &eval_ctx).await);
    }

    #[tokio::test]
    async fn unsupported_version_is_an_error_not_a_panic() {
        let user = MapUser(std::collections::BTreeMap::new());
        let segments = NoopSegments(false);
        let features = NoopFeatures(None);
        let history = NoopHistory;
        let eval_ctx = ctx(&user, &segments, &features, &history);

        let envelope = IrEnvelope { version: 999, expr: IrNode::Literal(IrValue::Bool(true)) };
        assert!(evaluate(&envelope, &eval_ctx).await.is_err());
        assert!(!evaluate_predicate(&envelope, &eval_ctx).await);
    }

    #[test]
    fn null_is_equal_only_to_null() {
        assert!(values_equal(&IrValue::Null, &IrValue::Null));
        assert!(!values_equal(&IrValue::Null, &IrValue::Bool(false)));
        assert_eq!(ordered_compare(&IrValue::Null, &IrValue::from_i64(1)), None);
    }

    #[test]
    fn numeric_comparison_beats_string_comparison() {
        let left = IrValue::String("10".to_string());
        let right = IrValue::String("9".to_string());
        assert_eq!(ordered_compare(&left, &right), Some(Ordering::Greater));
    }

    #[test]
    fn membership_uses_tight_numeric_tolerance() {
        let left = IrValue::from_i64(10);
        let list = IrValue::List(vec![IrValue::Number(BigDecimal::from_str("10.0").unwrap())]);
        assert!(membership(&left, &list));
        let not_in_list = IrValue::List(vec![IrValue::from_i64(11)]);
        assert!(!membership(&left, &not_in_list));
    }
}
