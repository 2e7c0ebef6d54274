// crates/growth-broker/src/types.rs
// ============================================================================
// Module: Broker Update Types
// Description: The terminal updates a subscription can resolve with.
// Purpose: Shared vocabulary between the journey service (which emits
// decision/journey outcomes) and flow/entitlement callers (spec §4.4).
// Dependencies: growth-core
// ============================================================================

use growth_core::FlowId;
use growth_core::JourneyId;

/// A terminal update delivered to a broker subscription (spec §4.4:
/// "resolves ... at the first matching terminal update").
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// An outcome from presenting a flow.
    Flow(FlowOutcome),
    /// An immediate decision outcome (no flow presented, or enrollment result).
    Decision(DecisionOutcome),
    /// An entitlement check outcome.
    Entitlement(EntitlementOutcome),
}

/// Terminal outcomes of presenting a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
    /// The user completed a purchase in the presented flow.
    Purchased,
    /// The user dismissed the presented flow without converting.
    Dismissed,
    /// The flow failed to present or run.
    Error,
    /// A trial was started from the presented flow.
    TrialStarted,
    /// A prior purchase was restored from the presented flow.
    Restored,
}

/// Terminal outcomes of an immediate decision (no flow, or enrollment result).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOutcome {
    /// No campaign or rule matched this event.
    NoMatch,
    /// The event was allowed through immediately with no journey involvement.
    AllowedImmediate,
    /// A new journey was enrolled for this event.
    JourneyStarted,
    /// The event was denied.
    Denied,
}

/// Terminal outcomes of an entitlement check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntitlementOutcome {
    /// The entitlement is granted.
    Allowed,
    /// The entitlement is not granted.
    Denied,
}

/// Correlates an ingested event's downstream journey work for outcome
/// routing (spec §4.4: "`bind(eventId, journeyId, flowId)`").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// The journey this event's outcome belongs to.
    pub journey_id: JourneyId,
    /// The flow, if any, presented on behalf of this event.
    pub flow_id: Option<FlowId>,
}

/// The final result of a broker subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerOutcome {
    /// Resolved with the first matching terminal update.
    Resolved(Update),
    /// No terminal update arrived before the subscription window elapsed.
    NoInteraction,
}
