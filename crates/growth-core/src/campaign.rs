// crates/growth-core/src/campaign.rs
// ============================================================================
// Module: Campaign Definition
// Description: A published campaign: its trigger, workflow graph, reentry
// policy, goal, and exit policy.
// Purpose: Canonical shape consumed by the journey service when deciding
// whether to enroll a user and how to treat a live journey's reentry/exit.
// Dependencies: crate::identifiers, crate::node, growth-ir
// ============================================================================

//! ## Overview
//! A [`Campaign`] is immutable once published; republishing produces a new
//! [`crate::identifiers::VersionId`] rather than mutating fields in place,
//! matching the profile cache's fetch-and-replace model (spec §4.3).

// ============================================================================
// SECTION: Imports
// ============================================================================

use growth_ir::IrEnvelope;
use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::CampaignId;
use crate::identifiers::NodeId;
use crate::identifiers::VersionId;
use crate::node::WorkflowNode;

// ============================================================================
// SECTION: Campaign
// ============================================================================

/// A published campaign definition (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    /// Stable campaign identifier across republishes.
    pub id: CampaignId,
    /// Identifier of this specific published version.
    pub version_id: VersionId,
    /// What starts this campaign's journeys.
    pub trigger: Trigger,
    /// The workflow node entered on enrollment.
    pub entry_node_id: NodeId,
    /// The campaign's workflow graph.
    pub workflow: Workflow,
    /// The flow archive this campaign presents, when not chosen per-node.
    pub flow_id: Option<String>,
    /// Governs whether/when a user may re-enroll.
    pub reentry: ReentryPolicy,
    /// Optional conversion goal.
    pub goal: Option<Goal>,
    /// Governs when a live journey completes outside of reaching an `Exit` node.
    pub exit_policy: Option<ExitPolicy>,
    /// Reference point `goalMet`/TTL windows are measured from, when not
    /// the journey's `startedAt`.
    pub conversion_anchor: Option<ConversionAnchor>,
}

/// A campaign's workflow graph: every node it can visit, keyed by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// Nodes by id.
    pub nodes: std::collections::BTreeMap<NodeId, WorkflowNode>,
}

impl Workflow {
    /// Looks up a node by id.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&WorkflowNode> {
        self.nodes.get(id)
    }
}

// ============================================================================
// SECTION: Trigger
// ============================================================================

/// What starts a campaign's journeys (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Enrolls on a named event, optionally gated by a condition evaluated
    /// against that event.
    Event {
        /// The event name that can start enrollment.
        name: String,
        /// Optional condition narrowing which occurrences of `name` enroll.
        condition: Option<IrEnvelope>,
    },
    /// Enrolls whenever segment membership transitions to true.
    Segment {
        /// The membership condition.
        condition: IrEnvelope,
    },
}

// ============================================================================
// SECTION: Reentry
// ============================================================================

/// Governs re-enrollment of a user who has a completion record for this
/// campaign (spec §3, §4.6 "Reentry gating").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReentryPolicy {
    /// A user may enroll at most once, ever.
    OneTime,
    /// A user may always re-enroll once the prior instance is no longer live.
    EveryTime,
    /// A user may re-enroll once per rolling window of `amount` `unit`s.
    OncePerWindow {
        /// Window magnitude.
        amount: i64,
        /// Window unit.
        unit: ReentryWindowUnit,
    },
}

/// Unit for an `OncePerWindow` reentry window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReentryWindowUnit {
    /// Seconds.
    Seconds,
    /// Hours.
    Hours,
    /// Days.
    Days,
    /// Weeks.
    Weeks,
}

impl ReentryWindowUnit {
    /// Returns the unit's length in whole seconds.
    #[must_use]
    pub const fn seconds(self) -> i64 {
        match self {
            Self::Seconds => 1,
            Self::Hours => 3_600,
            Self::Days => 86_400,
            Self::Weeks => 604_800,
        }
    }
}

impl ReentryPolicy {
    /// Returns the window, in seconds, for `OncePerWindow`; `None` for the
    /// other variants.
    #[must_use]
    pub const fn window_seconds(&self) -> Option<i64> {
        match self {
            Self::OncePerWindow { amount, unit } => Some(amount * unit.seconds()),
            Self::OneTime | Self::EveryTime => None,
        }
    }
}

// ============================================================================
// SECTION: Goal and exit policy
// ============================================================================

/// A conversion goal: an event or condition that, once satisfied, marks a
/// live journey as converted (spec §4.6: "Evaluates goal ... on met, sets
/// `convertedAt`").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Event name the goal listens for.
    pub event_name: String,
    /// Optional condition narrowing which occurrences of `event_name` count.
    pub condition: Option<IrEnvelope>,
}

/// Governs when a live journey completes outside of reaching an `Exit`
/// node (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitPolicy {
    /// Never force-complete; only an `Exit` node ends the journey.
    Never,
    /// Complete once the goal is met.
    OnGoal,
    /// Complete once a segment-triggered campaign's condition stops matching.
    OnStopMatching,
    /// Complete on either `OnGoal` or `OnStopMatching`.
    OnGoalOrStop,
}

/// Reference point goal/TTL windows are measured from (spec §3:
/// `conversionAnchor?`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionAnchor {
    /// Measured from the journey's `startedAt`.
    EnrollmentTime,
    /// Measured from the last node transition (`updatedAt`).
    LastActivity,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use super::*;

    #[test]
    fn once_per_window_computes_seconds() {
        let policy = ReentryPolicy::OncePerWindow { amount: 2, unit: ReentryWindowUnit::Weeks };
        assert_eq!(policy.window_seconds(), Some(2 * 604_800));
        assert_eq!(ReentryPolicy::OneTime.window_seconds(), None);
    }

    #[test]
    fn workflow_looks_up_nodes_by_id() {
        let mut nodes = std::collections::BTreeMap::new();
        nodes.insert(NodeId::new("exit"), crate::node::WorkflowNode::Exit {
            reason: crate::node::ExitReason::Completed,
        });
        let workflow = Workflow { nodes };
        assert!(workflow.node(&NodeId::new("exit")).is_some());
        assert!(workflow.node(&NodeId::new("missing")).is_none());
    }
}
