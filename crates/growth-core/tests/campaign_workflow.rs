// crates/growth-core/tests/campaign_workflow.rs
// ============================================================================
// Integration coverage for Campaign/Workflow/Journey composing correctly.
// ============================================================================

#![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

use std::collections::BTreeMap;

use growth_core::CampaignId;
use growth_core::ExitReason;
use growth_core::JourneyStatus;
use growth_core::NodeId;
use growth_core::ReentryPolicy;
use growth_core::ReentryWindowUnit;
use growth_core::Trigger;
use growth_core::VersionId;
use growth_core::Workflow;
use growth_core::WorkflowNode;
use growth_core::campaign::Campaign;
use growth_ir::IrEnvelope;
use growth_ir::IrNode;
use growth_ir::IrValue;

fn sample_campaign() -> Campaign {
    let mut nodes = BTreeMap::new();
    nodes.insert(
        NodeId::new("branch"),
        WorkflowNode::Branch {
            condition: IrEnvelope::new(IrNode::Literal(IrValue::Bool(true))),
            next: vec![NodeId::new("exit_true"), NodeId::new("exit_false")],
        },
    );
    nodes.insert(NodeId::new("exit_true"), WorkflowNode::Exit { reason: ExitReason::Completed });
    nodes.insert(NodeId::new("exit_false"), WorkflowNode::Exit { reason: ExitReason::Error });

    Campaign {
        id: CampaignId::new("welcome"),
        version_id: VersionId::new("v1"),
        trigger: Trigger::Event { name: "app_open".to_string(), condition: None },
        entry_node_id: NodeId::new("branch"),
        workflow: Workflow { nodes },
        flow_id: None,
        reentry: ReentryPolicy::OncePerWindow { amount: 1, unit: ReentryWindowUnit::Days },
        goal: None,
        exit_policy: None,
        conversion_anchor: None,
    }
}

#[test]
fn entry_node_resolves_to_a_branch_with_two_paths() {
    let campaign = sample_campaign();
    let entry = campaign.workflow.node(&campaign.entry_node_id).unwrap();
    match entry {
        WorkflowNode::Branch { next, .. } => assert_eq!(next.len(), 2),
        other => panic!("expected a branch node, got {other:?}"),
    }
}

#[test]
fn once_per_window_reentry_window_is_one_day() {
    let campaign = sample_campaign();
    assert_eq!(campaign.reentry.window_seconds(), Some(86_400));
}

#[test]
fn workflow_serializes_to_json_and_back() {
    let campaign = sample_campaign();
    let json = serde_json::to_string(&campaign).unwrap();
    let restored: Campaign = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, campaign);
}

#[test]
fn journey_status_is_not_live_once_completed() {
    assert!(matches!(JourneyStatus::Pending, JourneyStatus::Pending));
    assert_ne!(JourneyStatus::Completed, JourneyStatus::Active);
}
