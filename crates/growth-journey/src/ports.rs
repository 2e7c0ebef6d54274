// crates/growth-journey/src/ports.rs
// ============================================================================
// Module: Executor Ports
// Description: The side-effecting seams a node execution can reach out
// through (flow presentation, event emission, customer updates, the
// delegate port, experiment assignment) — each a trait so the executor
// stays independent of the crates that actually implement delivery.
// ============================================================================

use growth_core::Campaign;
use growth_core::CampaignId;
use growth_core::Event;
use growth_core::EventId;
use growth_core::JourneyId;
use growth_core::PropertyBag;

/// Fire-and-forget flow presentation (spec §4.5: "Fire the external flow
/// presentation").
pub trait FlowPresenter: Send + Sync {
    /// Requests that `flow_id` be presented for `distinct_id`.
    fn present(&self, flow_id: &str, distinct_id: &str);
}

/// Emits an event with journey context appended (spec §4.5: `SendEvent`).
pub trait EventSink: Send + Sync {
    /// Submits `event` for enrichment and delivery, as if tracked directly.
    fn send(&self, event: Event);
}

/// Applies user property updates through identity (spec §4.5:
/// `UpdateCustomer`).
pub trait CustomerUpdater: Send + Sync {
    /// Sets `attributes` on the current user.
    fn update(&self, distinct_id: &str, attributes: PropertyBag);
}

/// Delivers a message to the process-wide delegate port (spec §4.5:
/// `CallDelegate`).
pub trait DelegatePort: Send + Sync {
    /// Delivers `(message, payload)`.
    fn deliver(&self, message: &str, payload: Option<PropertyBag>);
}

/// Resolves a server-assigned experiment variant, when the profile cache
/// carries one (spec §4.5: "prefer server assignment from profile cache").
pub trait ExperimentAssignments: Send + Sync {
    /// Returns the assigned variant id for `experiment_id`, if known.
    fn assigned_variant(&self, experiment_id: &str) -> Option<String>;
}

/// Binds an originating event to a journey/flow pair so the trigger broker
/// can route a later outcome back to the subscriber (spec §4.5: "Bind the
/// originating eventId to `(journeyId, flowId)`").
pub trait OutcomeBinder: Send + Sync {
    /// Performs the binding.
    fn bind(&self, event_id: EventId, journey_id: JourneyId, flow_id: Option<String>);
}

/// Supplies the campaign definitions the journey service enrolls against
/// and resumes live journeys from (spec §4.6: enrollment trigger matching
/// and per-journey workflow lookup on resume).
pub trait CampaignSource: Send + Sync {
    /// Returns every campaign currently visible to the journey service.
    fn campaigns(&self) -> Vec<Campaign>;
    /// Looks up a single campaign by id, for resuming a live journey whose
    /// workflow graph is needed but whose trigger doesn't matter anymore.
    fn campaign(&self, id: &CampaignId) -> Option<Campaign>;
}
