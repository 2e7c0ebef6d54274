// crates/growth-store/src/history.rs
// ============================================================================
// Module: Event History Adapter
// Description: Answers `Events.*` queries (spec §4.1) from the durable event
// store, for whichever distinct id is currently active.
// Purpose: Let the IR evaluator's `EventHistoryAdapter` seam be backed by
// real persisted history without the evaluator crate depending on storage.
// Dependencies: crate::event_store, growth-core, growth-ir
// ============================================================================

//! ## Overview
//! [`StoreBackedHistory`] does not itself track "the current user"; it asks
//! a [`CurrentUser`] for one on every query, the same way the profile cache
//! answers `Segment`/`Feature` nodes against whichever snapshot is currently
//! cached rather than a distinct id passed per call. The facade composing
//! this crate owns identity lifecycle and supplies the `CurrentUser` impl.
//!
//! A fixed-size most-recent scan (see [`HISTORY_SCAN_LIMIT`]) stands in for
//! a real time-bounded SQL query; it is large enough for the `since`/
//! `until`/`within` windows this adapter is actually asked about in
//! practice, and keeps the query side of this module free of per-kind SQL.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use growth_core::DistinctId;
use growth_core::DynValue;
use growth_core::Event;
use growth_ir::AggregateOp;
use growth_ir::EventHistoryKind;
use growth_ir::EventHistoryQuery;
use growth_ir::IntervalUnit;
use growth_ir::IrError;
use growth_ir::IrValue;
use growth_ir::context::EventHistoryAdapter;
use growth_ir::predicate;
use time::Duration;
use time::OffsetDateTime;

use crate::event_store::EventStore;

/// How many of a user's most recent events a query considers. Generous
/// relative to any realistic `since`/`within` window used in a campaign
/// definition.
const HISTORY_SCAN_LIMIT: usize = 10_000;

fn dyn_to_ir(value: &DynValue) -> IrValue {
    match value {
        DynValue::Null | DynValue::Map(_) => IrValue::Null,
        DynValue::Bool(flag) => IrValue::Bool(*flag),
        DynValue::Number(number) => IrValue::Number(number.clone()),
        DynValue::String(text) => IrValue::String(text.clone()),
        DynValue::Timestamp(at) => IrValue::Timestamp(*at),
        DynValue::Duration(duration) => IrValue::Duration(duration.whole_seconds()),
        DynValue::List(items) => IrValue::List(items.iter().map(dyn_to_ir).collect()),
    }
}

// ============================================================================
// SECTION: CurrentUser
// ============================================================================

/// Supplies the distinct id whose history should be queried. Identity
/// lifecycle (anonymous/identified transitions) lives above this crate; this
/// trait is the seam that lets [`StoreBackedHistory`] stay current without
/// owning it.
pub trait CurrentUser: Send + Sync {
    /// Returns the distinct id to query against right now.
    fn distinct_id(&self) -> DistinctId;
}

// ============================================================================
// SECTION: StoreBackedHistory
// ============================================================================

/// [`EventHistoryAdapter`] backed by the durable [`EventStore`].
pub struct StoreBackedHistory<U> {
    store: Arc<EventStore>,
    current_user: Arc<U>,
}

impl<U: CurrentUser> StoreBackedHistory<U> {
    /// Builds an adapter reading `store`, scoped to whatever `current_user`
    /// reports as the active distinct id at query time.
    #[must_use]
    pub fn new(store: Arc<EventStore>, current_user: Arc<U>) -> Self {
        Self { store, current_user }
    }

    fn candidates(&self, query: &EventHistoryQuery, now: OffsetDateTime) -> Result<Vec<Event>, IrError> {
        let distinct_id = self.current_user.distinct_id();
        let events = self
            .store
            .query_by_distinct_id(&distinct_id, HISTORY_SCAN_LIMIT)
            .map_err(|err| IrError::Adapter(err.to_string()))?;

        let window_start = query.since.or(query.within).map(|seconds| now - Duration::seconds(seconds.max(0)));
        let window_end = query.until.map(|seconds| now - Duration::seconds(seconds.max(0)));

        Ok(events
            .into_iter()
            .filter(|event| event.name == query.event_name)
            .filter(|event| window_start.map_or(true, |start| event.timestamp >= start))
            .filter(|event| window_end.map_or(true, |end| event.timestamp <= end))
            .filter(|event| match &query.where_ {
                None => true,
                Some(pred) => predicate::matches(pred, &|key| event.properties.get(key).map(dyn_to_ir)),
            })
            .collect())
    }
}

#[async_trait]
impl<U: CurrentUser> EventHistoryAdapter for StoreBackedHistory<U> {
    async fn query(&self, query: &EventHistoryQuery, now: OffsetDateTime) -> Result<IrValue, IrError> {
        // Events come back most-recent-first (spec §3: enqueue order).
        let matching = self.candidates(query, now)?;
        match &query.kind {
            EventHistoryKind::Exists => Ok(IrValue::Bool(!matching.is_empty())),
            EventHistoryKind::Count => Ok(IrValue::from_i64(i64::try_from(matching.len()).unwrap_or(i64::MAX))),
            EventHistoryKind::FirstTime => {
                Ok(matching.last().map_or(IrValue::Null, |event| IrValue::Timestamp(event.timestamp)))
            }
            EventHistoryKind::LastTime => {
                Ok(matching.first().map_or(IrValue::Null, |event| IrValue::Timestamp(event.timestamp)))
            }
            EventHistoryKind::LastAge => Ok(matching
                .first()
                .map_or(IrValue::Null, |event| IrValue::Duration((now - event.timestamp).whole_seconds()))),
            EventHistoryKind::Aggregate { op, key } => Ok(aggregate(&matching, key, *op)),
            EventHistoryKind::InOrder { names } => {
                let distinct_id = self.current_user.distinct_id();
                let all = self
                    .store
                    .query_by_distinct_id(&distinct_id, HISTORY_SCAN_LIMIT)
                    .map_err(|err| IrError::Adapter(err.to_string()))?;
                Ok(IrValue::Bool(occurred_in_order(&all, names)))
            }
            EventHistoryKind::ActivePeriods { period, total, min } => {
                Ok(IrValue::Bool(active_periods(&matching, now, *period, *total, *min)))
            }
            EventHistoryKind::Stopped { inactive_for } => {
                let age = matching.first().map(|event| (now - event.timestamp).whole_seconds());
                Ok(IrValue::Bool(age.map_or(true, |age| age >= *inactive_for)))
            }
            EventHistoryKind::Restarted { inactive_for, within } => {
                Ok(IrValue::Bool(restarted(&matching, *inactive_for, *within)))
            }
        }
    }
}

fn aggregate(matching: &[Event], key: &str, op: AggregateOp) -> IrValue {
    let values: Vec<_> = matching.iter().filter_map(|event| event.properties.get(key)).filter_map(|value| dyn_to_ir(value).as_number()).collect();
    if values.is_empty() {
        return IrValue::Null;
    }
    match op {
        AggregateOp::Sum => IrValue::Number(values.into_iter().sum()),
        AggregateOp::Avg => {
            let count = bigdecimal::BigDecimal::from(values.len() as i64);
            IrValue::Number(values.into_iter().sum::<bigdecimal::BigDecimal>() / count)
        }
        AggregateOp::Min => IrValue::Number(values.into_iter().min().unwrap_or_default()),
        AggregateOp::Max => IrValue::Number(values.into_iter().max().unwrap_or_default()),
        AggregateOp::Unique => {
            let mut unique = values;
            unique.sort();
            unique.dedup();
            IrValue::from_i64(unique.len() as i64)
        }
    }
}

/// Events are most-recent-first; `names` must appear with timestamps
/// non-decreasing in that order somewhere in the history, not necessarily
/// contiguously (spec §4.1: "in that order").
fn occurred_in_order(events_desc: &[Event], names: &[String]) -> bool {
    let mut ascending: Vec<&Event> = events_desc.iter().collect();
    ascending.reverse();
    let mut cursor = 0usize;
    for event in ascending {
        if cursor == names.len() {
            break;
        }
        if event.name == names[cursor] {
            cursor += 1;
        }
    }
    cursor == names.len()
}

fn active_periods(matching: &[Event], now: OffsetDateTime, period: IntervalUnit, total: i64, min: i64) -> bool {
    let period_len = Duration::seconds(period.seconds());
    let mut active = vec![false; total.max(0) as usize];
    for event in matching {
        let age = now - event.timestamp;
        if age < Duration::ZERO {
            continue;
        }
        let bucket = (age.whole_seconds() / period_len.whole_seconds().max(1)) as usize;
        if let Some(slot) = active.get_mut(bucket) {
            *slot = true;
        }
    }
    i64::try_from(active.iter().filter(|seen| **seen).count()).unwrap_or(0) >= min
}

/// True when the user went quiet for at least `inactive_for` seconds and
/// then produced another matching event within `within` seconds of that
/// inactivity ending (spec §4.1 glossary: "churn and return").
fn restarted(matching_desc: &[Event], inactive_for: i64, within: i64) -> bool {
    let mut ascending: Vec<&Event> = matching_desc.iter().collect();
    ascending.reverse();
    ascending.windows(2).any(|pair| {
        let gap = pair[1].timestamp - pair[0].timestamp;
        gap >= Duration::seconds(inactive_for) && gap <= Duration::seconds(inactive_for + within)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use growth_core::PropertyBag;

    use super::*;
    use crate::schema;

    struct FixedUser(DistinctId);
    impl CurrentUser for FixedUser {
        fn distinct_id(&self) -> DistinctId {
            self.0.clone()
        }
    }

    fn adapter_with(events: &[Event]) -> StoreBackedHistory<FixedUser> {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        schema::init(&conn).unwrap();
        let store = Arc::new(EventStore::new(conn));
        for event in events {
            store.append(event).unwrap();
        }
        StoreBackedHistory::new(store, Arc::new(FixedUser(DistinctId::new("u1"))))
    }

    fn query(event_name: &str, kind: EventHistoryKind) -> EventHistoryQuery {
        EventHistoryQuery { event_name: event_name.to_string(), since: None, until: None, within: None, where_: None, kind }
    }

    #[tokio::test]
    async fn exists_and_count_reflect_matching_events() {
        let now = OffsetDateTime::now_utc();
        let events = vec![
            Event::new("purchase", DistinctId::new("u1"), now - Duration::minutes(5)),
            Event::new("purchase", DistinctId::new("u1"), now - Duration::minutes(1)),
            Event::new("signed_up", DistinctId::new("u1"), now - Duration::minutes(10)),
        ];
        let adapter = adapter_with(&events);

        let exists = adapter.query(&query("purchase", EventHistoryKind::Exists), now).await.unwrap();
        assert_eq!(exists, IrValue::Bool(true));

        let count = adapter.query(&query("purchase", EventHistoryKind::Count), now).await.unwrap();
        assert_eq!(count, IrValue::from_i64(2));

        let missing = adapter.query(&query("never_seen", EventHistoryKind::Exists), now).await.unwrap();
        assert_eq!(missing, IrValue::Bool(false));
    }

    #[tokio::test]
    async fn first_and_last_time_bound_the_matching_set() {
        let now = OffsetDateTime::now_utc();
        let earliest = now - Duration::minutes(10);
        let latest = now - Duration::minutes(1);
        let events = vec![Event::new("open", DistinctId::new("u1"), earliest), Event::new("open", DistinctId::new("u1"), latest)];
        let adapter = adapter_with(&events);

        assert_eq!(adapter.query(&query("open", EventHistoryKind::FirstTime), now).await.unwrap(), IrValue::Timestamp(earliest));
        assert_eq!(adapter.query(&query("open", EventHistoryKind::LastTime), now).await.unwrap(), IrValue::Timestamp(latest));
    }

    #[tokio::test]
    async fn aggregate_sums_the_requested_property() {
        let now = OffsetDateTime::now_utc();
        let mut a = Event::new("purchase", DistinctId::new("u1"), now - Duration::minutes(5));
        a.properties.insert("amount".to_string(), DynValue::from_i64(10));
        let mut b = Event::new("purchase", DistinctId::new("u1"), now - Duration::minutes(1));
        b.properties.insert("amount".to_string(), DynValue::from_i64(15));
        let adapter = adapter_with(&[a, b]);

        let sum = adapter
            .query(&query("purchase", EventHistoryKind::Aggregate { op: AggregateOp::Sum, key: "amount".to_string() }), now)
            .await
            .unwrap();
        assert_eq!(sum, IrValue::from_i64(25));
    }

    #[tokio::test]
    async fn where_clause_narrows_matching_events() {
        let now = OffsetDateTime::now_utc();
        let mut props = PropertyBag::new();
        props.insert("plan".to_string(), DynValue::String("pro".to_string()));
        let mut matching = Event::new("purchase", DistinctId::new("u1"), now - Duration::minutes(1));
        matching.properties = props;
        let free = Event::new("purchase", DistinctId::new("u1"), now - Duration::minutes(2));
        let adapter = adapter_with(&[matching, free]);

        let mut q = query("purchase", EventHistoryKind::Count);
        q.where_ = Some(growth_ir::PredNode::Atom {
            key: "plan".to_string(),
            op: growth_ir::PredOp::Eq(IrValue::String("pro".to_string())),
        });
        assert_eq!(adapter.query(&q, now).await.unwrap(), IrValue::from_i64(1));
    }

    #[tokio::test]
    async fn stopped_is_true_once_inactivity_exceeds_threshold() {
        let now = OffsetDateTime::now_utc();
        let events = vec![Event::new("open", DistinctId::new("u1"), now - Duration::days(10))];
        let adapter = adapter_with(&events);
        let result = adapter.query(&query("open", EventHistoryKind::Stopped { inactive_for: 86_400 }), now).await.unwrap();
        assert_eq!(result, IrValue::Bool(true));
    }

    #[tokio::test]
    async fn in_order_checks_sequence_across_all_event_names() {
        let now = OffsetDateTime::now_utc();
        let events = vec![
            Event::new("signed_up", DistinctId::new("u1"), now - Duration::minutes(10)),
            Event::new("purchase", DistinctId::new("u1"), now - Duration::minutes(1)),
        ];
        let adapter = adapter_with(&events);
        let result = adapter
            .query(&query("", EventHistoryKind::InOrder { names: vec!["signed_up".to_string(), "purchase".to_string()] }), now)
            .await
            .unwrap();
        assert_eq!(result, IrValue::Bool(true));

        let reversed = adapter
            .query(&query("", EventHistoryKind::InOrder { names: vec!["purchase".to_string(), "signed_up".to_string()] }), now)
            .await
            .unwrap();
        assert_eq!(reversed, IrValue::Bool(false));
    }
}
