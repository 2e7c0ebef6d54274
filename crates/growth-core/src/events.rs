// crates/growth-core/src/events.rs
// ============================================================================
// Module: Event Model
// Description: The immutable event record produced by the track API.
// Purpose: Canonical shape shared by the event store, network queue,
// trigger broker, and journey service.
// Dependencies: crate::identifiers, crate::value
// ============================================================================

//! ## Overview
//! An [`Event`] is immutable after creation (spec §3). Enrichment (stamping
//! `distinctId`, `sessionId`, and a fresh [`EventId`]) happens once, at
//! track time, before the event is appended to the store or handed to the
//! journey service.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::identifiers::DistinctId;
use crate::identifiers::EventId;
use crate::identifiers::FeatureId;
use crate::value::DynValue;

/// An event's property bag: string-keyed, ordered for deterministic
/// serialization and hashing.
pub type PropertyBag = BTreeMap<String, DynValue>;

/// An immutable, enriched event (spec §3).
///
/// # Invariants
/// - Never mutated after construction; "updates" create a new `Event`.
/// - `timestamp` is monotonic per `(distinct_id, session_id)` at enqueue
///   time; the event store preserves enqueue order regardless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Time-ordered identifier minted at creation.
    pub id: EventId,
    /// Event name (e.g. `"purchase"`, `"$identify"`).
    pub name: String,
    /// Owning distinct id at the time the event was enriched.
    pub distinct_id: DistinctId,
    /// Creation timestamp.
    pub timestamp: OffsetDateTime,
    /// Session the event was produced in, if session tracking is active.
    pub session_id: Option<String>,
    /// Event property bag.
    pub properties: PropertyBag,
    /// Optional numeric value associated with the event (e.g. purchase amount).
    pub value: Option<BigDecimal>,
    /// Optional entity identifier for entity-scoped entitlement events.
    pub entity_id: Option<FeatureId>,
}

impl Event {
    /// Builds a new, unenriched event with a fresh id and the given clock
    /// reading. Enrichment (distinct id / session id stamping) happens in
    /// the identity layer before the event is persisted.
    #[must_use]
    pub fn new(name: impl Into<String>, distinct_id: DistinctId, now: OffsetDateTime) -> Self {
        Self {
            id: EventId::new(),
            name: name.into(),
            distinct_id,
            timestamp: now,
            session_id: None,
            properties: PropertyBag::new(),
            value: None,
            entity_id: None,
        }
    }

    /// Returns a builder-style copy with the given properties merged in.
    #[must_use]
    pub fn with_properties(mut self, properties: PropertyBag) -> Self {
        self.properties.extend(properties);
        self
    }

    /// Returns a builder-style copy bound to the given session.
    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Returns a builder-style copy carrying a numeric value.
    #[must_use]
    pub fn with_value(mut self, value: BigDecimal) -> Self {
        self.value = Some(value);
        self
    }

    /// Returns true when this is the reserved identity-migration event
    /// emitted on the anonymous-to-identified transition (spec §4.3).
    #[must_use]
    pub fn is_identify_event(&self) -> bool {
        self.name == IDENTIFY_EVENT_NAME
    }
}

/// Reserved event name for the identity-migration event (spec §4.3, §8
/// scenario 6: `getEventsForUser(...).filter(≠$identify)`).
pub const IDENTIFY_EVENT_NAME: &str = "$identify";

/// Reserved property key carrying the prior anonymous id on `$identify`.
pub const ANON_DISTINCT_ID_PROPERTY: &str = "$anon_distinct_id";
