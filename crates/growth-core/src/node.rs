// crates/growth-core/src/node.rs
// ============================================================================
// Module: Workflow Node
// Description: The tagged-variant workflow node types a campaign's graph is
// built from.
// Purpose: Canonical shape consumed by the journey executor (`growth-journey`);
// this crate owns only the data, not execution.
// Dependencies: crate::identifiers, growth-ir
// ============================================================================

//! ## Overview
//! Every [`WorkflowNode`] carries its own `next[]` list (spec §3: "Every
//! node carries an ordered `next[]` list used by branching semantics").
//! [`WorkflowNode::next`] exposes that list uniformly so the executor
//! doesn't need a match arm per variant just to find successors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use growth_ir::IrEnvelope;
use serde::Deserialize;
use serde::Serialize;

use crate::events::PropertyBag;
use crate::identifiers::ExperimentId;
use crate::identifiers::FlowId;
use crate::identifiers::NodeId;

// ============================================================================
// SECTION: WorkflowNode
// ============================================================================

/// A single node in a campaign's workflow graph (spec §3: "Workflow Node
/// (tagged variant)").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowNode {
    /// Presents a flow archive, optionally via an experiment assignment.
    ShowFlow {
        /// Directly assigned flow, when this node carries no experiment.
        flow_id: Option<FlowId>,
        /// Experiment-driven variant assignment, when present.
        experiment: Option<ShowFlowExperiment>,
        /// Successor nodes (typically a single entry).
        next: Vec<NodeId>,
    },
    /// Suspends the journey for a fixed duration.
    TimeDelay {
        /// Delay length; `<= 0` is treated as no delay (spec §4.5).
        duration_seconds: i64,
        /// Successor nodes.
        next: Vec<NodeId>,
    },
    /// Terminates the journey.
    Exit {
        /// The reason recorded on the journey's completion record.
        reason: ExitReason,
    },
    /// Two-way branch on an IR condition.
    Branch {
        /// The condition to evaluate.
        condition: IrEnvelope,
        /// `[truePath, falsePath]`.
        next: Vec<NodeId>,
    },
    /// N-way branch over a list of conditions, with an optional default.
    MultiBranch {
        /// Conditions evaluated in order.
        conditions: Vec<IrEnvelope>,
        /// `[...paths, default]`; `next.len() == conditions.len()` when
        /// there is no default path.
        next: Vec<NodeId>,
    },
    /// Sets properties on the current user through identity.
    UpdateCustomer {
        /// Properties to set.
        attributes: PropertyBag,
        /// Successor nodes.
        next: Vec<NodeId>,
    },
    /// Emits a synthetic event carrying journey context.
    SendEvent {
        /// Event name.
        name: String,
        /// Additional properties merged onto the emitted event.
        properties: Option<PropertyBag>,
        /// Successor nodes.
        next: Vec<NodeId>,
    },
    /// Gates progress to a time-of-day and day-of-week window.
    TimeWindow {
        /// Window start, as minutes since midnight.
        start_minutes: u16,
        /// Window end, as minutes since midnight (exclusive).
        end_minutes: u16,
        /// Allowed weekdays, `1=Sun..7=Sat` (spec §4.5); `None` means every day.
        days_of_week: Option<BTreeSet<u8>>,
        /// Evaluate in UTC instead of device-local time.
        use_utc: bool,
        /// Successor nodes.
        next: Vec<NodeId>,
    },
    /// Waits for the first of several reactive or timeout conditions.
    WaitUntil {
        /// Candidate paths, evaluated left-to-right on reactive events.
        paths: Vec<WaitPath>,
    },
    /// Uniformly splits traffic across named branches.
    RandomBranch {
        /// Branch weights, summing to at most 100.
        branches: Vec<RandomBranchArm>,
        /// Successor nodes, one per branch.
        next: Vec<NodeId>,
    },
    /// Delivers a message to a process-wide delegate port.
    CallDelegate {
        /// Delegate message name.
        message: String,
        /// Optional payload.
        payload: Option<PropertyBag>,
        /// Successor nodes.
        next: Vec<NodeId>,
    },
}

impl WorkflowNode {
    /// Returns this node's `next[]` list (spec §3). `WaitUntil` has no
    /// top-level `next`; each of its paths carries its own.
    #[must_use]
    pub fn next(&self) -> &[NodeId] {
        match self {
            Self::ShowFlow { next, .. }
            | Self::TimeDelay { next, .. }
            | Self::Branch { next, .. }
            | Self::MultiBranch { next, .. }
            | Self::UpdateCustomer { next, .. }
            | Self::SendEvent { next, .. }
            | Self::TimeWindow { next, .. }
            | Self::RandomBranch { next, .. }
            | Self::CallDelegate { next, .. } => next,
            Self::Exit { .. } | Self::WaitUntil { .. } => &[],
        }
    }
}

/// Experiment-driven flow assignment on a `ShowFlow` node (spec §4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowFlowExperiment {
    /// The experiment identifier, used for deterministic bucketing.
    pub id: ExperimentId,
    /// Candidate variants, in configured order.
    pub variants: Vec<ExperimentVariant>,
}

/// A single experiment variant (spec §4.5: "variants\[\]: (id, percentage,
/// flowId)").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentVariant {
    /// Variant identifier.
    pub id: String,
    /// This variant's share of traffic, as a percentage point in `[0,100]`.
    pub percentage: u8,
    /// The flow this variant presents.
    pub flow_id: FlowId,
}

/// The reason a journey terminated (spec §3: `Exit{reason: ...}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// The journey ran its graph to an `Exit` node.
    Completed,
    /// The campaign's goal was met and its exit policy allows completion.
    GoalMet,
    /// The journey's TTL elapsed.
    Expired,
    /// An internal executor error forced completion.
    Error,
    /// The journey was cancelled (identify/reset, or explicit cancellation).
    Cancelled,
    /// A segment-triggered campaign's condition stopped matching.
    TriggerUnmatched,
}

/// One candidate path of a `WaitUntil` node (spec §3/§4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitPath {
    /// Path identifier, stable across re-evaluations of the same wait state.
    pub id: String,
    /// Reactive condition evaluated against the arriving event.
    pub condition: IrEnvelope,
    /// Timeout, in seconds from when the wait state began; absent means
    /// this path never matures on its own.
    pub max_time: Option<i64>,
    /// Successor node on match.
    pub next: NodeId,
}

/// One weighted arm of a `RandomBranch` node (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomBranchArm {
    /// This arm's share of traffic, as a percentage point.
    pub percentage: u8,
    /// Optional human-readable name for telemetry.
    pub name: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use super::*;

    #[test]
    fn next_is_empty_for_exit_and_wait_until() {
        let exit = WorkflowNode::Exit { reason: ExitReason::Completed };
        assert!(exit.next().is_empty());
        let wait = WorkflowNode::WaitUntil { paths: vec![] };
        assert!(wait.next().is_empty());
    }

    #[test]
    fn next_is_exposed_uniformly_for_branching_nodes() {
        let node = WorkflowNode::TimeDelay {
            duration_seconds: 30,
            next: vec![NodeId::new("n2")],
        };
        assert_eq!(node.next(), &[NodeId::new("n2")]);
    }
}
