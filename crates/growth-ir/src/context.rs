// crates/growth-ir/src/context.rs
// ============================================================================
// Module: Evaluation Context and Adapters
// Description: The seam between the evaluator and a domain crate's actual
// user/event/segment/feature/event-history data.
// Purpose: Let the evaluator stay generic: domain crates implement these
// traits for their own types rather than the evaluator depending on them.
// Dependencies: async-trait, crate::error, crate::node, crate::value, time
// ============================================================================

//! ## Overview
//! [`EvalContext`] bundles everything a node needs to evaluate: the clock
//! reading, the current user and (optional) triggering event views, and
//! the three adapters consulted by `Segment`, `Feature`, and `Events.*`
//! nodes. All adapter calls are `async` because they may cross a process
//! boundary (spec §4.1: "consulting async adapters").

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::error::IrError;
use crate::node::EventHistoryQuery;
use crate::value::IrValue;

// ============================================================================
// SECTION: Property views
// ============================================================================

/// Read-only view over the current user's profile properties.
pub trait UserView: Send + Sync {
    /// Returns the value for `key`, or `None` if the property is absent.
    fn get(&self, key: &str) -> Option<IrValue>;
}

/// Read-only view over the event currently triggering evaluation, when one
/// exists (branch/wait-until evaluation outside an event-triggered path
/// has no current event).
pub trait EventView: Send + Sync {
    /// The event's name.
    fn name(&self) -> &str;
    /// Returns the value for property `key`, or `None` if absent.
    fn get(&self, key: &str) -> Option<IrValue>;
}

// ============================================================================
// SECTION: Adapters
// ============================================================================

/// Consulted by `Segment` nodes.
#[async_trait]
pub trait SegmentAdapter: Send + Sync {
    /// Returns whether the current user is a member of `segment_id`,
    /// optionally restricted to membership established within the last
    /// `within` seconds.
    async fn is_member(&self, segment_id: &str, within: Option<i64>) -> Result<bool, IrError>;
}

/// Consulted by `Feature` nodes.
#[async_trait]
pub trait FeatureAdapter: Send + Sync {
    /// Returns the current value of `feature_id` for the user, or `None`
    /// if the feature is not granted.
    async fn value(&self, feature_id: &str) -> Result<Option<IrValue>, IrError>;
}

/// Consulted by `Events.*` nodes.
#[async_trait]
pub trait EventHistoryAdapter: Send + Sync {
    /// Resolves an event-history query against the current user's event
    /// history, returning a typed answer matching the query's kind
    /// (boolean for `Exists`/`Stopped`/`Restarted`/`InOrder`/
    /// `ActivePeriods`, number for `Count`/`Aggregate`, timestamp for
    /// `FirstTime`/`LastTime`, duration for `LastAge`).
    async fn query(&self, query: &EventHistoryQuery, now: OffsetDateTime) -> Result<IrValue, IrError>;
}

// ============================================================================
// SECTION: EvalContext
// ============================================================================

/// Everything a node needs to evaluate (spec §4.1: "a context `{now, user,
/// events, segments, features, event?}`").
pub struct EvalContext<'a> {
    /// The evaluation instant; every `Time.*` node and adapter call is
    /// relative to this, never to a fresh wall-clock read, so a single
    /// evaluation is internally consistent.
    pub now: OffsetDateTime,
    /// The current user's profile view.
    pub user: &'a dyn UserView,
    /// The current triggering event, if this evaluation was prompted by
    /// one (absent for periodic re-evaluation of a `WaitUntil` path).
    pub event: Option<&'a dyn EventView>,
    /// The id of the journey being evaluated, for `Journey.Id` nodes.
    pub journey_id: Option<&'a str>,
    /// Segment membership adapter.
    pub segments: &'a dyn SegmentAdapter,
    /// Feature/entitlement adapter.
    pub features: &'a dyn FeatureAdapter,
    /// Event-history query adapter.
    pub history: &'a dyn EventHistoryAdapter,
}
