// crates/growth-store/src/event_store.rs
// ============================================================================
// Module: Event Store
// Description: Append-only, queryable, prunable store of enriched events.
// Purpose: Durable backing for track history queries the IR evaluator's
// event-history adapter consults, and for identity reassignment on
// `identify` (spec §4.2).
// Dependencies: crate::schema, growth-core, rusqlite
// ============================================================================

//! ## Overview
//! Appends preserve enqueue order via SQLite's autoincrementing `seq`
//! column rather than the event's own timestamp, matching spec §3's
//! invariant that "the store preserves enqueue order" even when
//! timestamps race.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::str::FromStr;
use std::sync::Mutex;

use bigdecimal::BigDecimal;
use growth_core::DistinctId;
use growth_core::Event;
use growth_core::EventId;
use growth_core::FeatureId;
use growth_core::PropertyBag;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::StoreError;

// ============================================================================
// SECTION: EventStore
// ============================================================================

/// Durable, append-only event store (spec §4.2).
///
/// # Invariants
/// - Appends never reorder: query results reflect enqueue order, not
///   `timestamp` order, per spec §3.
pub struct EventStore {
    conn: Mutex<Connection>,
}

impl EventStore {
    /// Opens (creating if needed) an event store at `conn`, which must
    /// already have [`crate::schema::init`] applied.
    #[must_use]
    pub fn new(conn: Connection) -> Self {
        Self { conn: Mutex::new(conn) }
    }

    /// Appends an event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the underlying write fails.
    pub fn append(&self, event: &Event) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.execute(
            "INSERT INTO events (id, name, distinct_id, session_id, timestamp, properties, value, entity_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                event.id.to_string(),
                event.name,
                event.distinct_id.as_str(),
                event.session_id,
                event.timestamp.format(&Rfc3339)?,
                serde_json::to_string(&event.properties)?,
                event.value.as_ref().map(ToString::to_string),
                event.entity_id.as_ref().map(|id| id.as_str().to_string()),
            ],
        )?;
        Ok(())
    }

    /// Returns up to `limit` events for `distinct_id`, most-recent-first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query or row decoding fails.
    pub fn query_by_distinct_id(&self, distinct_id: &DistinctId, limit: usize) -> Result<Vec<Event>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut stmt = conn.prepare(
            "SELECT id, name, distinct_id, session_id, timestamp, properties, value, entity_id
             FROM events WHERE distinct_id = ?1 ORDER BY seq DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![distinct_id.as_str(), limit as i64], row_to_event)?;
        rows.collect::<Result<Vec<_>, _>>()?.into_iter().collect()
    }

    /// Returns up to `limit` events for `session_id`, most-recent-first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query or row decoding fails.
    pub fn query_by_session_id(&self, session_id: &str, limit: usize) -> Result<Vec<Event>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut stmt = conn.prepare(
            "SELECT id, name, distinct_id, session_id, timestamp, properties, value, entity_id
             FROM events WHERE session_id = ?1 ORDER BY seq DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![session_id, limit as i64], row_to_event)?;
        rows.collect::<Result<Vec<_>, _>>()?.into_iter().collect()
    }

    /// Atomically rewrites ownership of all of `old_id`'s events to
    /// `new_id` (spec §4.2: "`reassign(oldDistinctId, newDistinctId)`
    /// rewrites ownership atomically").
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the underlying write fails.
    pub fn reassign(&self, old_id: &DistinctId, new_id: &DistinctId) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.execute(
            "UPDATE events SET distinct_id = ?1 WHERE distinct_id = ?2",
            params![new_id.as_str(), old_id.as_str()],
        )?;
        Ok(())
    }

    /// Looks up a single event by id, for trigger-broker correlation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query or row decoding fails.
    pub fn get(&self, id: &EventId) -> Result<Option<Event>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.query_row(
            "SELECT id, name, distinct_id, session_id, timestamp, properties, value, entity_id
             FROM events WHERE id = ?1",
            params![id.to_string()],
            row_to_event,
        )
        .optional()?
        .transpose()
    }

    /// Deletes events older than `cutoff` (spec §4.2: "Events older than a
    /// configurable TTL ... may be pruned at any safe point").
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the underlying write fails.
    pub fn prune_older_than(&self, cutoff: OffsetDateTime) -> Result<usize, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let deleted = conn.execute("DELETE FROM events WHERE timestamp < ?1", params![cutoff.format(&Rfc3339)?])?;
        Ok(deleted)
    }
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<Event, StoreError>> {
    Ok(decode_event(row))
}

fn decode_event(row: &rusqlite::Row<'_>) -> Result<Event, StoreError> {
    let id_raw: String = row.get(0)?;
    let name: String = row.get(1)?;
    let distinct_id: String = row.get(2)?;
    let session_id: Option<String> = row.get(3)?;
    let timestamp_raw: String = row.get(4)?;
    let properties_raw: String = row.get(5)?;
    let value_raw: Option<String> = row.get(6)?;
    let entity_id_raw: Option<String> = row.get(7)?;

    let id = uuid::Uuid::parse_str(&id_raw).map_or_else(|_| EventId::new(), EventId::from_uuid);
    let timestamp = OffsetDateTime::parse(&timestamp_raw, &Rfc3339)?;
    let properties: PropertyBag = serde_json::from_str(&properties_raw)?;

    Ok(Event {
        id,
        name,
        distinct_id: DistinctId::new(distinct_id),
        timestamp,
        session_id,
        properties,
        value: value_raw.and_then(|raw| BigDecimal::from_str(&raw).ok()),
        entity_id: entity_id_raw.map(FeatureId::new),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use super::*;

    fn store() -> EventStore {
        let conn = Connection::open_in_memory().unwrap();
        crate::schema::init(&conn).unwrap();
        EventStore::new(conn)
    }

    #[test]
    fn append_and_query_round_trips() {
        let store = store();
        let event = Event::new("purchase", DistinctId::new("u1"), OffsetDateTime::now_utc());
        store.append(&event).unwrap();

        let events = store.query_by_distinct_id(&DistinctId::new("u1"), 10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "purchase");
    }

    #[test]
    fn query_is_most_recent_first() {
        let store = store();
        let now = OffsetDateTime::now_utc();
        store.append(&Event::new("first", DistinctId::new("u1"), now)).unwrap();
        store.append(&Event::new("second", DistinctId::new("u1"), now)).unwrap();

        let events = store.query_by_distinct_id(&DistinctId::new("u1"), 10).unwrap();
        assert_eq!(events[0].name, "second");
        assert_eq!(events[1].name, "first");
    }

    #[test]
    fn reassign_rewrites_ownership_atomically() {
        let store = store();
        let now = OffsetDateTime::now_utc();
        store.append(&Event::new("app_open", DistinctId::new("anon-1"), now)).unwrap();

        store.reassign(&DistinctId::new("anon-1"), &DistinctId::new("user-1")).unwrap();

        assert!(store.query_by_distinct_id(&DistinctId::new("anon-1"), 10).unwrap().is_empty());
        assert_eq!(store.query_by_distinct_id(&DistinctId::new("user-1"), 10).unwrap().len(), 1);
    }

    #[test]
    fn prune_removes_only_events_older_than_cutoff() {
        let store = store();
        let old = OffsetDateTime::now_utc() - time::Duration::days(10);
        let fresh = OffsetDateTime::now_utc();
        store.append(&Event::new("old", DistinctId::new("u1"), old)).unwrap();
        store.append(&Event::new("fresh", DistinctId::new("u1"), fresh)).unwrap();

        let cutoff = OffsetDateTime::now_utc() - time::Duration::days(7);
        let removed = store.prune_older_than(cutoff).unwrap();
        assert_eq!(removed, 1);

        let remaining = store.query_by_distinct_id(&DistinctId::new("u1"), 10).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "fresh");
    }
}
