// crates/growth-store/src/journey_store.rs
// ============================================================================
// Module: Journey Store
// Description: Durable snapshot of live journeys and the completion log
// used for reentry-policy gating.
// Purpose: Back the journey service's "persist on every externally
// observable transition" requirement (spec §4.6) and its startup replay.
// Dependencies: crate::schema, growth-core, rusqlite
// ============================================================================

//! ## Overview
//! A journey lives in exactly one of two tables: `live_journeys` while
//! `is_live()`, or `journey_completions` once it terminates (spec §3: "A
//! completed journey is removed from the live set and appended to a
//! completion log; it never transitions back"). [`JourneyStore::save`]
//! performs that move atomically.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use growth_core::CampaignId;
use growth_core::DistinctId;
use growth_core::Journey;
use growth_core::JourneyId;
use growth_core::JourneyStatus;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::StoreError;

// ============================================================================
// SECTION: JourneyStore
// ============================================================================

/// Durable journey snapshot store (spec §3, §4.6).
pub struct JourneyStore {
    conn: Mutex<Connection>,
}

impl JourneyStore {
    /// Opens a journey store over `conn`, which must already have
    /// [`crate::schema::init`] applied.
    #[must_use]
    pub fn new(conn: Connection) -> Self {
        Self { conn: Mutex::new(conn) }
    }

    /// Persists `journey`'s current state. Live journeys are upserted into
    /// `live_journeys`; a journey that has just terminated is moved into
    /// `journey_completions` and removed from the live table in one
    /// transaction (spec §3 invariant).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the underlying write fails.
    pub fn save(&self, journey: &Journey) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let tx = conn.transaction()?;
        let payload = serde_json::to_string(journey)?;

        if journey.is_live() {
            tx.execute(
                "INSERT INTO live_journeys (id, campaign_id, distinct_id, payload, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at",
                params![
                    journey.id.to_string(),
                    journey.campaign_id.as_str(),
                    journey.distinct_id.as_str(),
                    payload,
                    journey.updated_at.format(&Rfc3339)?,
                ],
            )?;
        } else {
            tx.execute("DELETE FROM live_journeys WHERE id = ?1", params![journey.id.to_string()])?;
            let completed_at = journey.completed_at.unwrap_or(journey.updated_at);
            let exit_reason = journey.exit_reason.map_or_else(|| "unknown".to_string(), |reason| {
                serde_json::to_value(reason).map(|v| v.as_str().unwrap_or("unknown").to_string()).unwrap_or_default()
            });
            tx.execute(
                "INSERT OR REPLACE INTO journey_completions
                 (id, campaign_id, distinct_id, completed_at, exit_reason, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    journey.id.to_string(),
                    journey.campaign_id.as_str(),
                    journey.distinct_id.as_str(),
                    completed_at.format(&Rfc3339)?,
                    exit_reason,
                    payload,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Loads all live journeys for `distinct_id` (spec §4.6: "the live set
    /// is rebuilt from persistent storage filtered by the new distinct-id").
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query or row decoding fails.
    pub fn load_live_for_distinct_id(&self, distinct_id: &DistinctId) -> Result<Vec<Journey>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut stmt = conn.prepare("SELECT payload FROM live_journeys WHERE distinct_id = ?1")?;
        let rows = stmt.query_map(params![distinct_id.as_str()], |row| row.get::<_, String>(0))?;
        rows.collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|payload| serde_json::from_str(&payload).map_err(StoreError::from))
            .collect()
    }

    /// Loads every live journey, for process-start replay (spec §4.6: "On
    /// process start, the service loads live journeys, reschedules their
    /// timers").
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query or row decoding fails.
    pub fn load_all_live(&self) -> Result<Vec<Journey>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut stmt = conn.prepare("SELECT payload FROM live_journeys")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|payload| serde_json::from_str(&payload).map_err(StoreError::from))
            .collect()
    }

    /// Returns whether `distinct_id` has a live journey for `campaign_id`
    /// (spec §4.6 reentry gating: "already-live instance").
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    pub fn has_live_instance(&self, distinct_id: &DistinctId, campaign_id: &CampaignId) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM live_journeys WHERE distinct_id = ?1 AND campaign_id = ?2 LIMIT 1",
                params![distinct_id.as_str(), campaign_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(exists.is_some())
    }

    /// Returns the most recent completion record for `(distinct_id,
    /// campaign_id)`, used for `OneTime`/`OncePerWindow` reentry gating.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    pub fn latest_completion(
        &self,
        distinct_id: &DistinctId,
        campaign_id: &CampaignId,
    ) -> Result<Option<OffsetDateTime>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let raw: Option<String> = conn
            .query_row(
                "SELECT completed_at FROM journey_completions
                 WHERE distinct_id = ?1 AND campaign_id = ?2
                 ORDER BY completed_at DESC LIMIT 1",
                params![distinct_id.as_str(), campaign_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|raw| OffsetDateTime::parse(&raw, &Rfc3339).map_err(StoreError::from)).transpose()
    }

    /// Looks up a single live journey by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query or row decoding fails.
    pub fn get_live(&self, id: &JourneyId) -> Result<Option<Journey>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let raw: Option<String> = conn
            .query_row("SELECT payload FROM live_journeys WHERE id = ?1", params![id.to_string()], |row| row.get(0))
            .optional()?;
        raw.map(|raw| serde_json::from_str(&raw).map_err(StoreError::from)).transpose()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use std::collections::BTreeMap;

    use growth_core::JourneyId;

    use super::*;

    fn store() -> JourneyStore {
        let conn = Connection::open_in_memory().unwrap();
        crate::schema::init(&conn).unwrap();
        JourneyStore::new(conn)
    }

    fn sample_journey(now: OffsetDateTime) -> Journey {
        Journey {
            id: JourneyId::new(),
            campaign_id: CampaignId::new("c1"),
            distinct_id: DistinctId::new("u1"),
            status: JourneyStatus::Active,
            current_node_id: None,
            context: BTreeMap::new(),
            wait_state: None,
            pending_after_delay: Vec::new(),
            started_at: now,
            updated_at: now,
            completed_at: None,
            exit_reason: None,
            converted_at: None,
            goal_snapshot: None,
            exit_policy_snapshot: None,
            expires_at: None,
        }
    }

    #[test]
    fn save_and_load_live_round_trips() {
        let store = store();
        let now = OffsetDateTime::now_utc();
        let journey = sample_journey(now);
        store.save(&journey).unwrap();

        let loaded = store.load_live_for_distinct_id(&DistinctId::new("u1")).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, journey.id);
    }

    #[test]
    fn completing_a_journey_moves_it_out_of_the_live_set() {
        let store = store();
        let now = OffsetDateTime::now_utc();
        let mut journey = sample_journey(now);
        store.save(&journey).unwrap();

        journey.status = JourneyStatus::Completed;
        journey.completed_at = Some(now);
        journey.exit_reason = Some(growth_core::ExitReason::Completed);
        store.save(&journey).unwrap();

        assert!(store.get_live(&journey.id).unwrap().is_none());
        assert!(!store.has_live_instance(&journey.distinct_id, &journey.campaign_id).unwrap());
        let completion = store.latest_completion(&journey.distinct_id, &journey.campaign_id).unwrap();
        assert!(completion.is_some());
    }
}
