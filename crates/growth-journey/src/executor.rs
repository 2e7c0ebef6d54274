// crates/growth-journey/src/executor.rs
// ============================================================================
// Module: Node Executor
// Description: Pure per-node execution (spec §4.5): given a node, the
// reason execution resumed, and a context bundling the evaluator adapters
// and the side-effecting ports, decides what happens next. Holds no state
// of its own; the journey service owns persistence and scheduling.
// Dependencies: growth-core, growth-ir, crate::adapt, crate::bucketing,
// crate::ports, crate::time_window
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use growth_core::DistinctId;
use growth_core::Event;
use growth_core::EventId;
use growth_core::ExitReason;
use growth_core::JourneyId;
use growth_core::NodeId;
use growth_core::ShowFlowExperiment;
use growth_core::WaitState;
use growth_core::WorkflowNode;
use growth_ir::context::EventView;
use growth_ir::context::EvalContext;
use growth_ir::context::FeatureAdapter;
use growth_ir::context::EventHistoryAdapter;
use growth_ir::context::SegmentAdapter;
use growth_ir::context::UserView;
use growth_ir::evaluate_predicate;
use time::Duration;
use time::OffsetDateTime;
use time::UtcOffset;

use crate::adapt::CoreEventView;
use crate::bucketing::fnv1a_bucket;
use crate::error::JourneyError;
use crate::ports::CustomerUpdater;
use crate::ports::DelegatePort;
use crate::ports::EventSink;
use crate::ports::ExperimentAssignments;
use crate::ports::FlowPresenter;
use crate::ports::OutcomeBinder;
use crate::time_window;
use crate::time_window::WindowDecision;

// ============================================================================
// SECTION: Resume reason
// ============================================================================

/// Why the executor is being asked to run this node right now.
pub enum ResumeReason<'a> {
    /// The journey just enrolled and is entering its first node.
    Enroll,
    /// A live event arrived while the journey was paused on this node.
    Event(&'a Event),
    /// A previously scheduled timer (`TimeDelay`, `TimeWindow`, or a
    /// `WaitUntil` path's `max_time`) matured.
    Timer,
    /// The user's segment membership changed and this node re-evaluates.
    SegmentChange,
}

// ============================================================================
// SECTION: Execution result
// ============================================================================

/// What the journey service should do after running one node.
pub enum NodeExecutionResult {
    /// Continue synchronously to the named node.
    Advance(NodeId),
    /// Suspend on a `WaitUntil`, with the given per-path deadlines.
    Wait(BTreeMap<String, Option<OffsetDateTime>>),
    /// The triggering event/segment-change matched no `WaitUntil` path;
    /// stay paused with the existing deadlines unchanged.
    NoMatch,
    /// Suspend until the given instant (`TimeDelay`/`TimeWindow`).
    Delay(OffsetDateTime),
    /// Terminate the journey with the given reason.
    Complete(ExitReason),
}

// ============================================================================
// SECTION: Executor context
// ============================================================================

/// Everything `execute_node` needs beyond the node itself: the evaluator's
/// adapters, the clock, and the side-effecting ports a node may reach
/// through.
pub struct ExecutorContext<'a> {
    /// The evaluation instant.
    pub now: OffsetDateTime,
    /// Offset used for `TimeWindow` nodes that don't request UTC.
    pub local_offset: UtcOffset,
    /// The journey being executed.
    pub journey_id: JourneyId,
    /// `journey_id`, pre-rendered, for the IR evaluator's `Journey.Id` node.
    pub journey_id_text: &'a str,
    /// The journey's owning distinct id.
    pub distinct_id: &'a str,
    /// The event, if any, that originally enrolled this journey. Carried
    /// forward so a `ShowFlow` node can bind it for outcome routing.
    pub origin_event_id: Option<EventId>,
    /// The journey's current `WaitUntil` suspension state, if it has one.
    pub wait_state: Option<&'a WaitState>,
    /// The current user's profile view.
    pub user: &'a dyn UserView,
    /// Segment membership adapter.
    pub segments: &'a dyn SegmentAdapter,
    /// Feature/entitlement adapter.
    pub features: &'a dyn FeatureAdapter,
    /// Event-history query adapter.
    pub history: &'a dyn EventHistoryAdapter,
    /// Resolves a server-assigned experiment variant, if any.
    pub experiments: &'a dyn ExperimentAssignments,
    /// Fires flow presentation.
    pub flows: &'a dyn FlowPresenter,
    /// Emits events produced by `SendEvent`.
    pub events: &'a dyn EventSink,
    /// Applies `UpdateCustomer` property sets.
    pub customer: &'a dyn CustomerUpdater,
    /// Delivers `CallDelegate` messages.
    pub delegate: &'a dyn DelegatePort,
    /// Binds a `ShowFlow`'s originating event for outcome routing.
    pub outcomes: &'a dyn OutcomeBinder,
}

fn build_eval_ctx<'a>(ctx: &'a ExecutorContext<'a>, event: Option<&'a dyn EventView>) -> EvalContext<'a> {
    EvalContext {
        now: ctx.now,
        user: ctx.user,
        event,
        journey_id: Some(ctx.journey_id_text),
        segments: ctx.segments,
        features: ctx.features,
        history: ctx.history,
    }
}

fn first_next(next: &[NodeId]) -> Result<NodeId, JourneyError> {
    next.first().cloned().ok_or_else(|| JourneyError::InvalidNodeType("node has no successor".to_string()))
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Runs one node to completion (spec §4.5). Never blocks on a timer itself:
/// `TimeDelay`/`TimeWindow`/`WaitUntil` return a [`NodeExecutionResult`]
/// describing when the service should resume, rather than sleeping here.
///
/// # Errors
///
/// Returns a [`JourneyError`] if the node's configuration is internally
/// inconsistent (a missing `next[]` entry, a `WaitUntil` timer with no
/// matching path) or if evaluating an `IrEnvelope` condition fails.
pub async fn execute_node(
    node: &WorkflowNode,
    resume: &ResumeReason<'_>,
    ctx: &ExecutorContext<'_>,
) -> Result<NodeExecutionResult, JourneyError> {
    match node {
        WorkflowNode::ShowFlow { flow_id, experiment, next } => {
            execute_show_flow(flow_id.as_ref(), experiment.as_ref(), next, ctx)
        }
        WorkflowNode::TimeDelay { duration_seconds, next } => {
            if *duration_seconds <= 0 {
                Ok(NodeExecutionResult::Advance(first_next(next)?))
            } else {
                Ok(NodeExecutionResult::Delay(ctx.now + Duration::seconds(*duration_seconds)))
            }
        }
        WorkflowNode::Exit { reason } => Ok(NodeExecutionResult::Complete(*reason)),
        WorkflowNode::Branch { condition, next } => {
            let event_view = resume_event_view(resume);
            let event_ref = event_view.as_ref().map(|view| view as &dyn EventView);
            let eval_ctx = build_eval_ctx(ctx, event_ref);
            let outcome = evaluate_predicate(condition, &eval_ctx).await;
            let node_id = next
                .get(usize::from(!outcome))
                .cloned()
                .ok_or_else(|| JourneyError::InvalidNodeType("branch missing next entry".to_string()))?;
            Ok(NodeExecutionResult::Advance(node_id))
        }
        WorkflowNode::MultiBranch { conditions, next } => execute_multi_branch(conditions, next, resume, ctx).await,
        WorkflowNode::UpdateCustomer { attributes, next } => {
            ctx.customer.update(ctx.distinct_id, attributes.clone());
            Ok(NodeExecutionResult::Advance(first_next(next)?))
        }
        WorkflowNode::SendEvent { name, properties, next } => {
            let mut event = Event::new(name.clone(), DistinctId::new(ctx.distinct_id), ctx.now);
            if let Some(props) = properties {
                event = event.with_properties(props.clone());
            }
            ctx.events.send(event);
            Ok(NodeExecutionResult::Advance(first_next(next)?))
        }
        WorkflowNode::TimeWindow { start_minutes, end_minutes, days_of_week, use_utc, next } => {
            let decision =
                time_window::evaluate(ctx.now, *use_utc, ctx.local_offset, *start_minutes, *end_minutes, days_of_week.as_ref());
            match decision {
                WindowDecision::InWindow => Ok(NodeExecutionResult::Advance(first_next(next)?)),
                WindowDecision::NotAllowedDay(resume_at) | WindowDecision::OutsideWindow(resume_at) => {
                    Ok(NodeExecutionResult::Delay(resume_at))
                }
            }
        }
        WorkflowNode::WaitUntil { paths } => match resume {
            ResumeReason::Enroll | ResumeReason::SegmentChange => {
                let deadlines =
                    paths.iter().map(|path| (path.id.clone(), path.max_time.map(|secs| ctx.now + Duration::seconds(secs)))).collect();
                Ok(NodeExecutionResult::Wait(deadlines))
            }
            ResumeReason::Timer => {
                let state = ctx
                    .wait_state
                    .ok_or_else(|| JourneyError::InvalidNodeType("wait_until timer fired with no wait state".to_string()))?;
                let matured = state
                    .earliest_matured(ctx.now)
                    .ok_or_else(|| JourneyError::InvalidNodeType("wait_until timer fired but nothing matured".to_string()))?;
                let path = paths.iter().find(|path| path.id == matured).ok_or_else(|| JourneyError::NodeNotFound(NodeId::new(matured)))?;
                Ok(NodeExecutionResult::Advance(path.next.clone()))
            }
            ResumeReason::Event(event) => {
                // Always a left-to-right, full scan: the first path whose
                // condition matches the arriving event wins.
                let view = CoreEventView(*event);
                let eval_ctx = build_eval_ctx(ctx, Some(&view));
                for path in paths {
                    if evaluate_predicate(&path.condition, &eval_ctx).await {
                        return Ok(NodeExecutionResult::Advance(path.next.clone()));
                    }
                }
                Ok(NodeExecutionResult::NoMatch)
            }
        },
        WorkflowNode::RandomBranch { branches, next } => {
            let draw = u16::from(fastrand::u8(0..100));
            let mut cumulative: u16 = 0;
            let mut chosen = None;
            for (idx, branch) in branches.iter().enumerate() {
                cumulative += u16::from(branch.percentage);
                if draw < cumulative {
                    chosen = Some(idx);
                    break;
                }
            }
            let idx = chosen.unwrap_or(branches.len().saturating_sub(1));
            let node_id =
                next.get(idx).cloned().ok_or_else(|| JourneyError::InvalidNodeType("random_branch missing next entry".to_string()))?;
            Ok(NodeExecutionResult::Advance(node_id))
        }
        WorkflowNode::CallDelegate { message, payload, next } => {
            ctx.delegate.deliver(message, payload.clone());
            Ok(NodeExecutionResult::Advance(first_next(next)?))
        }
    }
}

fn resume_event_view<'a>(resume: &'a ResumeReason<'a>) -> Option<CoreEventView<'a>> {
    match resume {
        ResumeReason::Event(event) => Some(CoreEventView(*event)),
        ResumeReason::Enroll | ResumeReason::Timer | ResumeReason::SegmentChange => None,
    }
}

fn execute_show_flow(
    flow_id: Option<&growth_core::FlowId>,
    experiment: Option<&ShowFlowExperiment>,
    next: &[NodeId],
    ctx: &ExecutorContext<'_>,
) -> Result<NodeExecutionResult, JourneyError> {
    let chosen = resolve_flow(flow_id, experiment, ctx.distinct_id, ctx.experiments);
    if let Some(flow_id) = chosen {
        ctx.flows.present(flow_id.as_str(), ctx.distinct_id);
        if let Some(origin) = ctx.origin_event_id {
            ctx.outcomes.bind(origin, ctx.journey_id, Some(flow_id.as_str().to_string()));
        }
    } else {
        tracing::warn!("show_flow node resolved no flow to present");
    }
    Ok(NodeExecutionResult::Advance(first_next(next)?))
}

/// Resolves which flow a `ShowFlow` node presents (spec §4.5): a
/// server-assigned variant from the profile cache wins over deterministic
/// FNV-1a bucketing; a node with no experiment falls back to its direct
/// `flow_id`.
fn resolve_flow(
    direct: Option<&growth_core::FlowId>,
    experiment: Option<&ShowFlowExperiment>,
    distinct_id: &str,
    experiments: &dyn ExperimentAssignments,
) -> Option<growth_core::FlowId> {
    if let Some(exp) = experiment {
        let assigned = experiments.assigned_variant(exp.id.as_str()).or_else(|| bucket_variant(distinct_id, exp));
        if let Some(variant_id) = assigned {
            if let Some(variant) = exp.variants.iter().find(|variant| variant.id == variant_id) {
                return Some(variant.flow_id.clone());
            }
        }
    }
    direct.cloned()
}

fn bucket_variant(distinct_id: &str, exp: &ShowFlowExperiment) -> Option<String> {
    let bucket = u16::from(fnv1a_bucket(distinct_id, exp.id.as_str()));
    let mut cumulative: u16 = 0;
    for variant in &exp.variants {
        cumulative += u16::from(variant.percentage);
        if bucket < cumulative {
            return Some(variant.id.clone());
        }
    }
    None
}

async fn execute_multi_branch(
    conditions: &[growth_ir::IrEnvelope],
    next: &[NodeId],
    resume: &ResumeReason<'_>,
    ctx: &ExecutorContext<'_>,
) -> Result<NodeExecutionResult, JourneyError> {
    let event_view = resume_event_view(resume);
    let event_ref = event_view.as_ref().map(|view| view as &dyn EventView);
    let eval_ctx = build_eval_ctx(ctx, event_ref);
    let mut matched = None;
    for (idx, condition) in conditions.iter().enumerate() {
        if evaluate_predicate(condition, &eval_ctx).await {
            matched = Some(idx);
            break;
        }
    }
    let node_id = match matched {
        Some(idx) => next.get(idx).cloned(),
        None if next.len() > conditions.len() => {
            tracing::warn!("multi_branch: no condition matched, falling back to the default path");
            next.last().cloned()
        }
        None => None,
    };
    let node_id = node_id.ok_or_else(|| JourneyError::InvalidNodeType("multi_branch has no matching or default path".to_string()))?;
    Ok(NodeExecutionResult::Advance(node_id))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use std::sync::Mutex;

    use growth_core::ExperimentVariant;
    use growth_core::FlowId;
    use growth_core::PropertyBag;
    use growth_core::RandomBranchArm;
    use growth_ir::IrError;
    use growth_ir::IrEnvelope;
    use growth_ir::IrNode;
    use growth_ir::IrValue;
    use growth_ir::node::EventHistoryQuery;

    use super::*;

    struct Recorder {
        presented: Mutex<Vec<(String, String)>>,
        sent: Mutex<Vec<Event>>,
        updated: Mutex<Vec<(String, PropertyBag)>>,
        delegated: Mutex<Vec<(String, Option<PropertyBag>)>>,
        bound: Mutex<Vec<(EventId, JourneyId, Option<String>)>>,
        assigned_variant: Option<String>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                presented: Mutex::new(Vec::new()),
                sent: Mutex::new(Vec::new()),
                updated: Mutex::new(Vec::new()),
                delegated: Mutex::new(Vec::new()),
                bound: Mutex::new(Vec::new()),
                assigned_variant: None,
            }
        }
    }

    impl FlowPresenter for Recorder {
        fn present(&self, flow_id: &str, distinct_id: &str) {
            self.presented.lock().unwrap().push((flow_id.to_string(), distinct_id.to_string()));
        }
    }

    impl EventSink for Recorder {
        fn send(&self, event: Event) {
            self.sent.lock().unwrap().push(event);
        }
    }

    impl CustomerUpdater for Recorder {
        fn update(&self, distinct_id: &str, attributes: PropertyBag) {
            self.updated.lock().unwrap().push((distinct_id.to_string(), attributes));
        }
    }

    impl DelegatePort for Recorder {
        fn deliver(&self, message: &str, payload: Option<PropertyBag>) {
            self.delegated.lock().unwrap().push((message.to_string(), payload));
        }
    }

    impl ExperimentAssignments for Recorder {
        fn assigned_variant(&self, _experiment_id: &str) -> Option<String> {
            self.assigned_variant.clone()
        }
    }

    impl OutcomeBinder for Recorder {
        fn bind(&self, event_id: EventId, journey_id: JourneyId, flow_id: Option<String>) {
            self.bound.lock().unwrap().push((event_id, journey_id, flow_id));
        }
    }

    struct NoopUser;
    impl UserView for NoopUser {
        fn get(&self, _key: &str) -> Option<IrValue> {
            None
        }
    }

    struct NoopSegments;
    #[async_trait::async_trait]
    impl SegmentAdapter for NoopSegments {
        async fn is_member(&self, _segment_id: &str, _within: Option<i64>) -> Result<bool, IrError> {
            Ok(false)
        }
    }

    struct NoopFeatures;
    #[async_trait::async_trait]
    impl FeatureAdapter for NoopFeatures {
        async fn value(&self, _feature_id: &str) -> Result<Option<IrValue>, IrError> {
            Ok(None)
        }
    }

    struct NoopHistory;
    #[async_trait::async_trait]
    impl EventHistoryAdapter for NoopHistory {
        async fn query(&self, _query: &EventHistoryQuery, _now: OffsetDateTime) -> Result<IrValue, IrError> {
            Ok(IrValue::Null)
        }
    }

    fn now() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
    }

    fn ctx<'a>(recorder: &'a Recorder, user: &'a NoopUser, segments: &'a NoopSegments, features: &'a NoopFeatures, history: &'a NoopHistory) -> ExecutorContext<'a> {
        ExecutorContext {
            now: now(),
            local_offset: UtcOffset::UTC,
            journey_id: JourneyId::new(),
            journey_id_text: "journey-1",
            distinct_id: "user-1",
            origin_event_id: Some(EventId::new()),
            wait_state: None,
            user,
            segments,
            features,
            history,
            experiments: recorder,
            flows: recorder,
            events: recorder,
            customer: recorder,
            delegate: recorder,
            outcomes: recorder,
        }
    }

    fn literal(value: bool) -> IrEnvelope {
        IrEnvelope::new(IrNode::Literal(IrValue::Bool(value)))
    }

    #[tokio::test]
    async fn show_flow_presents_its_direct_flow_and_binds_the_origin_event() {
        let recorder = Recorder::new();
        let (user, segments, features, history) = (NoopUser, NoopSegments, NoopFeatures, NoopHistory);
        let c = ctx(&recorder, &user, &segments, &features, &history);
        let node =
            WorkflowNode::ShowFlow { flow_id: Some(FlowId::new("flow-a")), experiment: None, next: vec![NodeId::new("n2")] };
        let result = execute_node(&node, &ResumeReason::Enroll, &c).await.unwrap();
        assert!(matches!(result, NodeExecutionResult::Advance(id) if id == NodeId::new("n2")));
        assert_eq!(recorder.presented.lock().unwrap().as_slice(), &[("flow-a".to_string(), "user-1".to_string())]);
        assert_eq!(recorder.bound.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn show_flow_falls_back_to_bucketing_when_no_server_assignment_exists() {
        let recorder = Recorder::new();
        let (user, segments, features, history) = (NoopUser, NoopSegments, NoopFeatures, NoopHistory);
        let c = ctx(&recorder, &user, &segments, &features, &history);
        let experiment = ShowFlowExperiment {
            id: growth_core::ExperimentId::new("exp-1"),
            variants: vec![
                ExperimentVariant { id: "a".to_string(), percentage: 100, flow_id: FlowId::new("flow-a") },
            ],
        };
        let node = WorkflowNode::ShowFlow { flow_id: None, experiment: Some(experiment), next: vec![NodeId::new("n2")] };
        execute_node(&node, &ResumeReason::Enroll, &c).await.unwrap();
        assert_eq!(recorder.presented.lock().unwrap()[0].0, "flow-a");
    }

    #[tokio::test]
    async fn time_delay_of_zero_advances_immediately() {
        let recorder = Recorder::new();
        let (user, segments, features, history) = (NoopUser, NoopSegments, NoopFeatures, NoopHistory);
        let c = ctx(&recorder, &user, &segments, &features, &history);
        let node = WorkflowNode::TimeDelay { duration_seconds: 0, next: vec![NodeId::new("n2")] };
        let result = execute_node(&node, &ResumeReason::Enroll, &c).await.unwrap();
        assert!(matches!(result, NodeExecutionResult::Advance(id) if id == NodeId::new("n2")));
    }

    #[tokio::test]
    async fn time_delay_of_positive_duration_schedules_a_resume() {
        let recorder = Recorder::new();
        let (user, segments, features, history) = (NoopUser, NoopSegments, NoopFeatures, NoopHistory);
        let c = ctx(&recorder, &user, &segments, &features, &history);
        let node = WorkflowNode::TimeDelay { duration_seconds: 30, next: vec![NodeId::new("n2")] };
        let result = execute_node(&node, &ResumeReason::Enroll, &c).await.unwrap();
        match result {
            NodeExecutionResult::Delay(at) => assert_eq!(at, now() + Duration::seconds(30)),
            _ => panic!("expected Delay"),
        }
    }

    #[tokio::test]
    async fn branch_takes_the_true_path_on_a_true_condition() {
        let recorder = Recorder::new();
        let (user, segments, features, history) = (NoopUser, NoopSegments, NoopFeatures, NoopHistory);
        let c = ctx(&recorder, &user, &segments, &features, &history);
        let node = WorkflowNode::Branch { condition: literal(true), next: vec![NodeId::new("t"), NodeId::new("f")] };
        let result = execute_node(&node, &ResumeReason::Enroll, &c).await.unwrap();
        assert!(matches!(result, NodeExecutionResult::Advance(id) if id == NodeId::new("t")));
    }

    #[tokio::test]
    async fn multi_branch_falls_back_to_the_default_path_on_count_mismatch() {
        let recorder = Recorder::new();
        let (user, segments, features, history) = (NoopUser, NoopSegments, NoopFeatures, NoopHistory);
        let c = ctx(&recorder, &user, &segments, &features, &history);
        let node = WorkflowNode::MultiBranch {
            conditions: vec![literal(false), literal(false)],
            next: vec![NodeId::new("a"), NodeId::new("b"), NodeId::new("default")],
        };
        let result = execute_node(&node, &ResumeReason::Enroll, &c).await.unwrap();
        assert!(matches!(result, NodeExecutionResult::Advance(id) if id == NodeId::new("default")));
    }

    #[tokio::test]
    async fn update_customer_forwards_attributes_to_the_customer_updater() {
        let recorder = Recorder::new();
        let (user, segments, features, history) = (NoopUser, NoopSegments, NoopFeatures, NoopHistory);
        let c = ctx(&recorder, &user, &segments, &features, &history);
        let mut attributes = PropertyBag::new();
        attributes.insert("plan".to_string(), growth_core::DynValue::String("pro".to_string()));
        let node = WorkflowNode::UpdateCustomer { attributes, next: vec![NodeId::new("n2")] };
        execute_node(&node, &ResumeReason::Enroll, &c).await.unwrap();
        assert_eq!(recorder.updated.lock().unwrap()[0].0, "user-1");
    }

    #[tokio::test]
    async fn send_event_emits_through_the_event_sink() {
        let recorder = Recorder::new();
        let (user, segments, features, history) = (NoopUser, NoopSegments, NoopFeatures, NoopHistory);
        let c = ctx(&recorder, &user, &segments, &features, &history);
        let node = WorkflowNode::SendEvent { name: "journey_step".to_string(), properties: None, next: vec![NodeId::new("n2")] };
        execute_node(&node, &ResumeReason::Enroll, &c).await.unwrap();
        assert_eq!(recorder.sent.lock().unwrap()[0].name, "journey_step");
    }

    #[tokio::test]
    async fn time_window_outside_the_window_schedules_a_delay() {
        let recorder = Recorder::new();
        let (user, segments, features, history) = (NoopUser, NoopSegments, NoopFeatures, NoopHistory);
        let c = ctx(&recorder, &user, &segments, &features, &history);
        let node = WorkflowNode::TimeWindow {
            start_minutes: 9 * 60,
            end_minutes: 17 * 60,
            days_of_week: None,
            use_utc: true,
            next: vec![NodeId::new("n2")],
        };
        let result = execute_node(&node, &ResumeReason::Enroll, &c).await.unwrap();
        assert!(matches!(result, NodeExecutionResult::Delay(_)));
    }

    #[tokio::test]
    async fn wait_until_enrollment_computes_per_path_deadlines() {
        let recorder = Recorder::new();
        let (user, segments, features, history) = (NoopUser, NoopSegments, NoopFeatures, NoopHistory);
        let c = ctx(&recorder, &user, &segments, &features, &history);
        let node = WorkflowNode::WaitUntil {
            paths: vec![growth_core::WaitPath { id: "a".to_string(), condition: literal(true), max_time: Some(60), next: NodeId::new("n2") }],
        };
        let result = execute_node(&node, &ResumeReason::Enroll, &c).await.unwrap();
        match result {
            NodeExecutionResult::Wait(deadlines) => assert_eq!(deadlines.get("a").copied().flatten(), Some(now() + Duration::seconds(60))),
            _ => panic!("expected Wait"),
        }
    }

    #[tokio::test]
    async fn wait_until_event_takes_the_first_matching_path() {
        let recorder = Recorder::new();
        let (user, segments, features, history) = (NoopUser, NoopSegments, NoopFeatures, NoopHistory);
        let c = ctx(&recorder, &user, &segments, &features, &history);
        let node = WorkflowNode::WaitUntil {
            paths: vec![
                growth_core::WaitPath { id: "a".to_string(), condition: literal(false), max_time: None, next: NodeId::new("a-next") },
                growth_core::WaitPath { id: "b".to_string(), condition: literal(true), max_time: None, next: NodeId::new("b-next") },
            ],
        };
        let event = Event::new("purchase", DistinctId::new("user-1"), now());
        let result = execute_node(&node, &ResumeReason::Event(&event), &c).await.unwrap();
        assert!(matches!(result, NodeExecutionResult::Advance(id) if id == NodeId::new("b-next")));
    }

    #[tokio::test]
    async fn random_branch_picks_the_arm_containing_the_draw() {
        let recorder = Recorder::new();
        let (user, segments, features, history) = (NoopUser, NoopSegments, NoopFeatures, NoopHistory);
        let c = ctx(&recorder, &user, &segments, &features, &history);
        fastrand::seed(42);
        let node = WorkflowNode::RandomBranch {
            branches: vec![
                RandomBranchArm { percentage: 100, name: Some("only".to_string()) },
            ],
            next: vec![NodeId::new("n2")],
        };
        let result = execute_node(&node, &ResumeReason::Enroll, &c).await.unwrap();
        assert!(matches!(result, NodeExecutionResult::Advance(id) if id == NodeId::new("n2")));
    }

    #[tokio::test]
    async fn call_delegate_forwards_message_and_payload() {
        let recorder = Recorder::new();
        let (user, segments, features, history) = (NoopUser, NoopSegments, NoopFeatures, NoopHistory);
        let c = ctx(&recorder, &user, &segments, &features, &history);
        let node = WorkflowNode::CallDelegate { message: "ping".to_string(), payload: None, next: vec![NodeId::new("n2")] };
        execute_node(&node, &ResumeReason::Enroll, &c).await.unwrap();
        assert_eq!(recorder.delegated.lock().unwrap()[0].0, "ping");
    }

    #[tokio::test]
    async fn exit_completes_with_its_configured_reason() {
        let recorder = Recorder::new();
        let (user, segments, features, history) = (NoopUser, NoopSegments, NoopFeatures, NoopHistory);
        let c = ctx(&recorder, &user, &segments, &features, &history);
        let node = WorkflowNode::Exit { reason: ExitReason::GoalMet };
        let result = execute_node(&node, &ResumeReason::Enroll, &c).await.unwrap();
        assert!(matches!(result, NodeExecutionResult::Complete(ExitReason::GoalMet)));
    }
}
