// crates/growth-core/src/journey.rs
// ============================================================================
// Module: Journey
// Description: Per-user state of a single campaign enrollment.
// Purpose: Canonical shape persisted by the journey store and mutated by
// the journey executor/service (`growth-journey`); this crate owns only
// the data and its invariants.
// Dependencies: crate::identifiers, crate::node
// ============================================================================

//! ## Overview
//! A [`Journey`] is live while `status` is `pending`, `active`, or
//! `paused` (spec §3: `isLive = status ∈ {pending,active,paused}`). Once
//! `completed` or `cancelled` it is immutable and lives only in the
//! completion log, never back in live storage (spec §3 invariant: "A
//! completed journey ... never transitions back").

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::events::PropertyBag;
use crate::identifiers::CampaignId;
use crate::identifiers::DistinctId;
use crate::identifiers::JourneyId;
use crate::identifiers::NodeId;
use crate::node::ExitReason;

// ============================================================================
// SECTION: Journey
// ============================================================================

/// Per-user state of a single campaign enrollment (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journey {
    /// Time-ordered identifier minted at enrollment.
    pub id: JourneyId,
    /// The campaign this journey was enrolled from.
    pub campaign_id: CampaignId,
    /// The distinct id this journey belongs to.
    pub distinct_id: DistinctId,
    /// Current lifecycle status.
    pub status: JourneyStatus,
    /// The node currently being executed or awaited, if any.
    pub current_node_id: Option<NodeId>,
    /// Journey-scoped key/value context accumulated across node execution.
    pub context: PropertyBag,
    /// Active `WaitUntil` state, present only while paused on one.
    pub wait_state: Option<WaitState>,
    /// Scheduled resumption times (`TimeDelay`/`TimeWindow` timers); see
    /// the paused-state invariant (spec §3).
    pub pending_after_delay: Vec<OffsetDateTime>,
    /// Enrollment time.
    pub started_at: OffsetDateTime,
    /// Last externally-observable state change.
    pub updated_at: OffsetDateTime,
    /// Completion time, set once on `complete`.
    pub completed_at: Option<OffsetDateTime>,
    /// The reason recorded when this journey completed.
    pub exit_reason: Option<ExitReason>,
    /// When the campaign's goal was met, if it ever was.
    pub converted_at: Option<OffsetDateTime>,
    /// The goal definition in effect when this journey enrolled, frozen so
    /// a later campaign republish doesn't change an in-flight journey's rules.
    pub goal_snapshot: Option<crate::campaign::Goal>,
    /// The exit policy in effect when this journey enrolled.
    pub exit_policy_snapshot: Option<crate::campaign::ExitPolicy>,
    /// Absolute expiry time, if this campaign bounds journey lifetime.
    pub expires_at: Option<OffsetDateTime>,
}

impl Journey {
    /// Returns true while the journey is live (spec §3: `isLive = status ∈
    /// {pending,active,paused}`).
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self.status, JourneyStatus::Pending | JourneyStatus::Active | JourneyStatus::Paused)
    }

    /// Returns true when the paused-state invariant holds: a `paused`
    /// journey has a pending delay or an active wait state (spec §3).
    #[must_use]
    pub fn paused_state_is_valid(&self) -> bool {
        if self.status != JourneyStatus::Paused {
            return true;
        }
        !self.pending_after_delay.is_empty() || self.wait_state.is_some()
    }
}

/// A journey's lifecycle status (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneyStatus {
    /// Enrolled but not yet entered its first node.
    Pending,
    /// Executing synchronously.
    Active,
    /// Suspended on a timer or a `WaitUntil`.
    Paused,
    /// Terminated normally; immutable, present only in the completion log.
    Completed,
    /// Terminated by cancellation; immutable, present only in the completion log.
    Cancelled,
}

// ============================================================================
// SECTION: Wait state
// ============================================================================

/// Suspension state for a `WaitUntil` node (spec §4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitState {
    /// When this wait state began; deadlines are relative to this instant.
    pub started_at: OffsetDateTime,
    /// Per-path absolute deadlines; `None` for a path with no `max_time`.
    pub deadlines: BTreeMap<String, Option<OffsetDateTime>>,
}

impl WaitState {
    /// Returns the earliest deadline that has matured at `now`, if any
    /// (spec §4.5: "take the *earliest* matured path").
    #[must_use]
    pub fn earliest_matured(&self, now: OffsetDateTime) -> Option<&str> {
        self.deadlines
            .iter()
            .filter_map(|(path_id, deadline)| deadline.map(|at| (path_id, at)))
            .filter(|(_, at)| *at <= now)
            .min_by_key(|(_, at)| *at)
            .map(|(path_id, _)| path_id.as_str())
    }

    /// Returns the earliest future deadline across all paths, if any
    /// (used to schedule the next resumption when no path has matured).
    #[must_use]
    pub fn earliest_future(&self, now: OffsetDateTime) -> Option<OffsetDateTime> {
        self.deadlines
            .values()
            .filter_map(|deadline| *deadline)
            .filter(|at| *at > now)
            .min()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use super::*;

    fn journey_at(now: OffsetDateTime) -> Journey {
        Journey {
            id: JourneyId::new(),
            campaign_id: CampaignId::new("c1"),
            distinct_id: DistinctId::new("u1"),
            status: JourneyStatus::Pending,
            current_node_id: None,
            context: PropertyBag::new(),
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
    fn is_live_matches_spec_status_set() {
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let mut journey = journey_at(now);
        for status in [JourneyStatus::Pending, JourneyStatus::Active, JourneyStatus::Paused] {
            journey.status = status;
            assert!(journey.is_live());
        }
        for status in [JourneyStatus::Completed, JourneyStatus::Cancelled] {
            journey.status = status;
            assert!(!journey.is_live());
        }
    }

    #[test]
    fn paused_without_delay_or_wait_state_is_invalid() {
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let mut journey = journey_at(now);
        journey.status = JourneyStatus::Paused;
        assert!(!journey.paused_state_is_valid());
        journey.pending_after_delay.push(now);
        assert!(journey.paused_state_is_valid());
    }

    #[test]
    fn wait_state_picks_earliest_matured_path() {
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let mut deadlines = BTreeMap::new();
        deadlines.insert("a".to_string(), Some(now - time::Duration::seconds(10)));
        deadlines.insert("b".to_string(), Some(now - time::Duration::seconds(30)));
        deadlines.insert("c".to_string(), None);
        let state = WaitState { started_at: now - time::Duration::seconds(60), deadlines };
        assert_eq!(state.earliest_matured(now), Some("b"));
    }
}
