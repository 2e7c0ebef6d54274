// crates/growth-journey/src/service.rs
// ============================================================================
// Module: Journey Service
// Description: The orchestrator driving every live journey for the current
// distinct id: event-driven enrollment, the runtime loop over
// `execute_node`, incoming-event/segment-change routing, cancellation on
// identify/reset, and start-up replay.
// Purpose: The single mailbox owner described in spec §4.6/§5 — one task
// drains a command channel so node execution stays strictly serial per
// journey without callers needing to coordinate locking themselves.
// Dependencies: crate::executor, crate::ports, growth-broker, growth-core,
// growth-ir, growth-store, tokio
// ============================================================================

//! ## Overview
//! [`JourneyService::spawn`] starts one `tokio` task that owns every live
//! journey for the current distinct id. Callers only ever send commands
//! through the returned handle; the task itself holds the only mutable
//! state, so no `Mutex` guards the live-journey index. Per-journey timers
//! are plain [`tokio::task::JoinHandle`]s that, on firing, enqueue a
//! [`Command::TimerFired`] back onto the same channel; replacing a timer
//! aborts the previous handle first.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use growth_broker::Binding;
use growth_broker::DecisionOutcome;
use growth_broker::TriggerBroker;
use growth_broker::Update;
use growth_core::Campaign;
use growth_core::DistinctId;
use growth_core::Event;
use growth_core::EventId;
use growth_core::ExitPolicy;
use growth_core::ExitReason;
use growth_core::FlowId;
use growth_core::Goal;
use growth_core::Journey;
use growth_core::JourneyId;
use growth_core::JourneyStatus;
use growth_core::PropertyBag;
use growth_core::ReentryPolicy;
use growth_core::Trigger;
use growth_core::WaitState;
use growth_core::WorkflowNode;
use growth_ir::context::EvalContext;
use growth_ir::context::EventView;
use growth_ir::context::EventHistoryAdapter;
use growth_ir::context::FeatureAdapter;
use growth_ir::context::SegmentAdapter;
use growth_ir::context::UserView;
use growth_ir::evaluate_predicate;
use growth_store::JourneyStore;
use time::Duration;
use time::OffsetDateTime;
use time::UtcOffset;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::warn;

use crate::adapt::CoreEventView;
use crate::executor::execute_node;
use crate::executor::ExecutorContext;
use crate::executor::NodeExecutionResult;
use crate::executor::ResumeReason;
use crate::ports::CampaignSource;
use crate::ports::CustomerUpdater;
use crate::ports::DelegatePort;
use crate::ports::EventSink;
use crate::ports::ExperimentAssignments;
use crate::ports::FlowPresenter;
use crate::ports::OutcomeBinder;

// ============================================================================
// SECTION: Dependencies
// ============================================================================

/// Everything [`JourneyService::spawn`] needs, bundled so the constructor
/// doesn't take a dozen positional arguments.
pub struct JourneyServiceDeps {
    /// Durable live-journey/completion-log storage.
    pub store: Arc<JourneyStore>,
    /// Correlates `ShowFlow`-bound events with their downstream outcome.
    pub broker: Arc<TriggerBroker>,
    /// Campaign definitions to enroll against and resume from.
    pub campaigns: Arc<dyn CampaignSource>,
    /// The current user's profile view.
    pub user: Arc<dyn UserView>,
    /// Segment membership adapter.
    pub segments: Arc<dyn SegmentAdapter>,
    /// Feature/entitlement adapter.
    pub features: Arc<dyn FeatureAdapter>,
    /// Event-history query adapter.
    pub history: Arc<dyn EventHistoryAdapter>,
    /// Fires flow presentation.
    pub flows: Arc<dyn FlowPresenter>,
    /// Emits events produced by `SendEvent`.
    pub events: Arc<dyn EventSink>,
    /// Applies `UpdateCustomer` property sets.
    pub customer: Arc<dyn CustomerUpdater>,
    /// Delivers `CallDelegate` messages.
    pub delegate: Arc<dyn DelegatePort>,
    /// Resolves server-assigned experiment variants.
    pub experiments: Arc<dyn ExperimentAssignments>,
    /// Offset applied by `TimeWindow` nodes that don't request UTC.
    pub local_offset: UtcOffset,
    /// The distinct id the service starts bound to.
    pub distinct_id: DistinctId,
}

// ============================================================================
// SECTION: Commands
// ============================================================================

enum Command {
    HandleEvent(Event),
    HandleSegmentChange,
    Identify(DistinctId),
    Reset(DistinctId),
    TimerFired(JourneyId),
    Shutdown(oneshot::Sender<()>),
}

// ============================================================================
// SECTION: JourneyService handle
// ============================================================================

/// A handle to the running mailbox task (spec §4.6, §5).
pub struct JourneyService {
    command_tx: mpsc::UnboundedSender<Command>,
}

impl JourneyService {
    /// Spawns the mailbox task and returns a handle to it. The task
    /// immediately replays every live journey from storage before accepting
    /// its first command (spec §4.6: "On process start, the service loads
    /// live journeys, reschedules their timers").
    #[must_use]
    pub fn spawn(deps: JourneyServiceDeps) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let actor_tx = command_tx.clone();
        tokio::spawn(async move {
            let mut actor = Actor::new(deps, actor_tx);
            actor.bootstrap().await;
            actor.run(command_rx).await;
        });
        Self { command_tx }
    }

    /// Routes a live event to every paused journey reacting to it and
    /// evaluates event-triggered enrollment (spec §4.6).
    pub fn handle_event(&self, event: Event) {
        self.send(Command::HandleEvent(event));
    }

    /// Re-evaluates segment-triggered enrollment and segment-reactive
    /// journeys after a segment membership change (spec §4.6).
    pub fn handle_segment_change(&self) {
        self.send(Command::HandleSegmentChange);
    }

    /// Cancels every live journey for the prior distinct id and rebuilds
    /// the live set for `new_distinct_id` (spec §4.3, §4.6).
    pub fn identify(&self, new_distinct_id: DistinctId) {
        self.send(Command::Identify(new_distinct_id));
    }

    /// Cancels every live journey and rebuilds the live set for the fresh
    /// anonymous id (spec §4.3, §4.6).
    pub fn reset(&self, new_anonymous_id: DistinctId) {
        self.send(Command::Reset(new_anonymous_id));
    }

    /// Stops the mailbox task, waiting for it to drain its current command.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Shutdown(tx));
        let _ = rx.await;
    }

    fn send(&self, command: Command) {
        if self.command_tx.send(command).is_err() {
            warn!("journey service mailbox is gone; command dropped");
        }
    }
}

// ============================================================================
// SECTION: Outcome binder adapter
// ============================================================================

/// Adapts the executor's string-keyed [`OutcomeBinder`] port onto the
/// broker's typed [`Binding`], converting at this one seam rather than
/// threading `growth-broker`'s `FlowId` type through the port itself.
struct BrokerOutcomeBinder {
    broker: Arc<TriggerBroker>,
}

impl OutcomeBinder for BrokerOutcomeBinder {
    fn bind(&self, event_id: EventId, journey_id: JourneyId, flow_id: Option<String>) {
        let binding = Binding { journey_id, flow_id: flow_id.map(FlowId::new) };
        if let Err(err) = self.broker.bind(event_id, binding) {
            debug!(%event_id, error = %err, "bind failed: subscription already resolved or unknown");
        }
    }
}

// ============================================================================
// SECTION: Node-local error fallback
// ============================================================================

/// What to do when `execute_node` itself fails (spec §4.5: node-local
/// error fallbacks, distinct from a predicate evaluation failure, which
/// `evaluate_predicate` already downgrades to `false`).
enum NodeErrorFallback {
    Advance(growth_core::NodeId),
    Complete(ExitReason),
}

fn node_error_fallback(node: &WorkflowNode) -> NodeErrorFallback {
    match node {
        WorkflowNode::Branch { next, .. } => next
            .get(1)
            .or_else(|| next.first())
            .cloned()
            .map_or(NodeErrorFallback::Complete(ExitReason::Error), NodeErrorFallback::Advance),
        WorkflowNode::MultiBranch { next, .. } => {
            next.last().cloned().map_or(NodeErrorFallback::Complete(ExitReason::Error), NodeErrorFallback::Advance)
        }
        WorkflowNode::TimeDelay { .. } | WorkflowNode::WaitUntil { .. } => NodeErrorFallback::Complete(ExitReason::Error),
        other => other.next().first().cloned().map_or(NodeErrorFallback::Complete(ExitReason::Error), NodeErrorFallback::Advance),
    }
}

// ============================================================================
// SECTION: Actor
// ============================================================================

struct Actor {
    store: Arc<JourneyStore>,
    broker: Arc<TriggerBroker>,
    campaigns: Arc<dyn CampaignSource>,
    user: Arc<dyn UserView>,
    segments: Arc<dyn SegmentAdapter>,
    features: Arc<dyn FeatureAdapter>,
    history: Arc<dyn EventHistoryAdapter>,
    flows: Arc<dyn FlowPresenter>,
    events: Arc<dyn EventSink>,
    customer: Arc<dyn CustomerUpdater>,
    delegate: Arc<dyn DelegatePort>,
    experiments: Arc<dyn ExperimentAssignments>,
    outcomes: Arc<BrokerOutcomeBinder>,
    local_offset: UtcOffset,
    distinct_id: DistinctId,
    timers: HashMap<JourneyId, JoinHandle<()>>,
    command_tx: mpsc::UnboundedSender<Command>,
}

impl Actor {
    fn new(deps: JourneyServiceDeps, command_tx: mpsc::UnboundedSender<Command>) -> Self {
        let outcomes = Arc::new(BrokerOutcomeBinder { broker: Arc::clone(&deps.broker) });
        Self {
            store: deps.store,
            broker: deps.broker,
            campaigns: deps.campaigns,
            user: deps.user,
            segments: deps.segments,
            features: deps.features,
            history: deps.history,
            flows: deps.flows,
            events: deps.events,
            customer: deps.customer,
            delegate: deps.delegate,
            experiments: deps.experiments,
            outcomes,
            local_offset: deps.local_offset,
            distinct_id: deps.distinct_id,
            timers: HashMap::new(),
            command_tx,
        }
    }

    // ------------------------------------------------------------------
    // Mailbox loop
    // ------------------------------------------------------------------

    async fn run(mut self, mut command_rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = command_rx.recv().await {
            match command {
                Command::HandleEvent(event) => self.on_event(event).await,
                Command::HandleSegmentChange => self.on_segment_change().await,
                Command::Identify(new_id) | Command::Reset(new_id) => self.on_identify(new_id).await,
                Command::TimerFired(journey_id) => self.on_timer(journey_id).await,
                Command::Shutdown(ack) => {
                    for (_, handle) in self.timers.drain() {
                        handle.abort();
                    }
                    let _ = ack.send(());
                    break;
                }
            }
        }
    }

    async fn bootstrap(&mut self) {
        let live = match self.store.load_all_live() {
            Ok(journeys) => journeys,
            Err(err) => {
                warn!(error = %err, "failed to load live journeys at startup");
                return;
            }
        };
        for journey in live {
            self.reschedule(journey).await;
        }
    }

    // ------------------------------------------------------------------
    // Event routing
    // ------------------------------------------------------------------

    async fn on_event(&mut self, event: Event) {
        let live = self.load_live();
        for journey in live {
            self.route_event(journey, &event).await;
        }
        self.evaluate_event_triggers(&event).await;
    }

    async fn route_event(&mut self, mut journey: Journey, event: &Event) {
        if journey.converted_at.is_none() {
            if let Some(goal) = journey.goal_snapshot.clone() {
                if self.goal_matches(&goal, event).await {
                    journey.converted_at = Some(OffsetDateTime::now_utc());
                    if self.should_force_complete(&journey) {
                        self.complete_journey(journey, ExitReason::GoalMet).await;
                        return;
                    }
                    self.persist(&journey);
                }
            }
        }

        let Some(node_id) = journey.current_node_id.clone() else { return };
        let Some(campaign) = self.campaigns.campaign(&journey.campaign_id) else { return };
        let Some(node) = campaign.workflow.node(&node_id).cloned() else { return };
        if matches!(node, WorkflowNode::WaitUntil { .. }) {
            self.drive(journey, campaign, ResumeReason::Event(event), None).await;
        }
    }

    async fn evaluate_event_triggers(&mut self, event: &Event) {
        for campaign in self.campaigns.campaigns() {
            let Trigger::Event { name, condition } = &campaign.trigger else { continue };
            if event.name != *name {
                continue;
            }
            if let Some(condition) = condition {
                let view = CoreEventView(event);
                let ctx = self.plain_eval_ctx(OffsetDateTime::now_utc(), Some(&view as &dyn EventView));
                if !evaluate_predicate(condition, &ctx).await {
                    continue;
                }
            }
            self.try_enroll(campaign, Some(event)).await;
        }
    }

    async fn on_segment_change(&mut self) {
        let live = self.load_live();
        for journey in live {
            self.route_segment_change(journey).await;
        }
        self.evaluate_segment_triggers().await;
    }

    async fn route_segment_change(&mut self, journey: Journey) {
        let Some(campaign) = self.campaigns.campaign(&journey.campaign_id) else { return };

        if let Trigger::Segment { condition } = &campaign.trigger {
            if matches!(journey.exit_policy_snapshot, Some(ExitPolicy::OnStopMatching | ExitPolicy::OnGoalOrStop)) {
                let ctx = self.plain_eval_ctx(OffsetDateTime::now_utc(), None);
                if !evaluate_predicate(condition, &ctx).await {
                    self.complete_journey(journey, ExitReason::TriggerUnmatched).await;
                    return;
                }
            }
        }

        let Some(node_id) = journey.current_node_id.clone() else { return };
        let Some(node) = campaign.workflow.node(&node_id).cloned() else { return };
        if matches!(node, WorkflowNode::WaitUntil { .. }) {
            self.drive(journey, campaign, ResumeReason::SegmentChange, None).await;
        }
    }

    async fn evaluate_segment_triggers(&mut self) {
        for campaign in self.campaigns.campaigns() {
            let Trigger::Segment { condition } = &campaign.trigger else { continue };
            let ctx = self.plain_eval_ctx(OffsetDateTime::now_utc(), None);
            if evaluate_predicate(condition, &ctx).await {
                self.try_enroll(campaign, None).await;
            }
        }
    }

    async fn goal_matches(&self, goal: &Goal, event: &Event) -> bool {
        if event.name != goal.event_name {
            return false;
        }
        let Some(condition) = goal.condition.as_ref() else { return true };
        let view = CoreEventView(event);
        let ctx = self.plain_eval_ctx(OffsetDateTime::now_utc(), Some(&view as &dyn EventView));
        evaluate_predicate(condition, &ctx).await
    }

    fn should_force_complete(&self, journey: &Journey) -> bool {
        matches!(journey.exit_policy_snapshot, Some(ExitPolicy::OnGoal | ExitPolicy::OnGoalOrStop))
    }

    fn plain_eval_ctx<'a>(&'a self, now: OffsetDateTime, event: Option<&'a dyn EventView>) -> EvalContext<'a> {
        EvalContext {
            now,
            user: self.user.as_ref(),
            event,
            journey_id: None,
            segments: self.segments.as_ref(),
            features: self.features.as_ref(),
            history: self.history.as_ref(),
        }
    }

    // ------------------------------------------------------------------
    // Enrollment
    // ------------------------------------------------------------------

    async fn try_enroll(&mut self, campaign: Campaign, origin_event: Option<&Event>) {
        match self.reentry_allowed(&campaign) {
            Ok(true) => {}
            Ok(false) => {
                debug!(campaign_id = %campaign.id, "reentry policy suppresses enrollment");
                return;
            }
            Err(err) => {
                warn!(campaign_id = %campaign.id, error = %err, "failed to evaluate reentry policy");
                return;
            }
        }

        let now = OffsetDateTime::now_utc();
        let journey = Journey {
            id: JourneyId::new(),
            campaign_id: campaign.id.clone(),
            distinct_id: self.distinct_id.clone(),
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
            goal_snapshot: campaign.goal.clone(),
            exit_policy_snapshot: campaign.exit_policy,
            expires_at: None,
        };
        self.persist(&journey);

        let origin_event_id = origin_event.map(|event| event.id);
        if let Some(event_id) = origin_event_id {
            self.broker.emit(event_id, Update::Decision(DecisionOutcome::JourneyStarted));
        }

        self.drive(journey, campaign, ResumeReason::Enroll, origin_event_id).await;
    }

    fn reentry_allowed(&self, campaign: &Campaign) -> Result<bool, growth_store::StoreError> {
        if self.store.has_live_instance(&self.distinct_id, &campaign.id)? {
            return Ok(false);
        }
        match campaign.reentry {
            ReentryPolicy::OneTime => Ok(self.store.latest_completion(&self.distinct_id, &campaign.id)?.is_none()),
            ReentryPolicy::EveryTime => Ok(true),
            ReentryPolicy::OncePerWindow { .. } => {
                let Some(completed_at) = self.store.latest_completion(&self.distinct_id, &campaign.id)? else {
                    return Ok(true);
                };
                let window = campaign.reentry.window_seconds().unwrap_or(0);
                Ok(OffsetDateTime::now_utc() - completed_at >= Duration::seconds(window))
            }
        }
    }

    // ------------------------------------------------------------------
    // Timers and replay
    // ------------------------------------------------------------------

    async fn on_timer(&mut self, journey_id: JourneyId) {
        self.timers.remove(&journey_id);
        let journey = match self.store.get_live(&journey_id) {
            Ok(Some(journey)) => journey,
            Ok(None) => return,
            Err(err) => {
                warn!(%journey_id, error = %err, "failed to load journey for a fired timer");
                return;
            }
        };
        self.resume(journey, ResumeReason::Timer).await;
    }

    async fn reschedule(&mut self, journey: Journey) {
        let now = OffsetDateTime::now_utc();
        if let Some(&earliest) = journey.pending_after_delay.first() {
            if earliest <= now {
                self.resume(journey, ResumeReason::Timer).await;
            } else {
                self.schedule_timer(journey.id, earliest);
            }
            return;
        }
        if let Some(wait_state) = journey.wait_state.clone() {
            if wait_state.earliest_matured(now).is_some() {
                self.resume(journey, ResumeReason::Timer).await;
            } else if let Some(at) = wait_state.earliest_future(now) {
                self.schedule_timer(journey.id, at);
            }
            return;
        }
        // A live journey with neither a pending delay nor a wait state is
        // mid-synchronous-execution from the service's point of view;
        // nudge it forward defensively rather than leave it stuck forever.
        self.resume(journey, ResumeReason::Timer).await;
    }

    async fn resume(&mut self, journey: Journey, resume: ResumeReason<'_>) {
        let Some(campaign) = self.campaigns.campaign(&journey.campaign_id) else {
            warn!(journey_id = %journey.id, campaign_id = %journey.campaign_id, "campaign no longer available; completing with error");
            self.complete_journey(journey, ExitReason::Error).await;
            return;
        };
        self.drive(journey, campaign, resume, None).await;
    }

    fn schedule_timer(&mut self, journey_id: JourneyId, at: OffsetDateTime) {
        self.clear_timer(journey_id);
        let tx = self.command_tx.clone();
        let delay = (at - OffsetDateTime::now_utc()).max(Duration::ZERO).unsigned_abs();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Command::TimerFired(journey_id));
        });
        self.timers.insert(journey_id, handle);
    }

    fn clear_timer(&mut self, journey_id: JourneyId) {
        if let Some(handle) = self.timers.remove(&journey_id) {
            handle.abort();
        }
    }

    // ------------------------------------------------------------------
    // Identity transitions
    // ------------------------------------------------------------------

    async fn on_identify(&mut self, new_distinct_id: DistinctId) {
        for journey in self.load_live() {
            self.clear_timer(journey.id);
            self.complete_journey(journey, ExitReason::Cancelled).await;
        }

        self.distinct_id = new_distinct_id;

        let rebuilt = self.load_live();
        for journey in rebuilt {
            self.reschedule(journey).await;
        }
    }

    fn load_live(&self) -> Vec<Journey> {
        match self.store.load_live_for_distinct_id(&self.distinct_id) {
            Ok(journeys) => journeys,
            Err(err) => {
                warn!(error = %err, "failed to load live journeys");
                Vec::new()
            }
        }
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    async fn drive(&mut self, mut journey: Journey, campaign: Campaign, resume: ResumeReason<'_>, origin_event_id: Option<EventId>) {
        self.clear_timer(journey.id);
        loop {
            let node_id = journey.current_node_id.clone().unwrap_or_else(|| campaign.entry_node_id.clone());
            let Some(node) = campaign.workflow.node(&node_id).cloned() else {
                warn!(journey_id = %journey.id, %node_id, "journey references a node missing from its workflow");
                self.complete_journey(journey, ExitReason::Error).await;
                return;
            };

            let journey_id_text = journey.id.to_string();
            let exec_ctx = ExecutorContext {
                now: OffsetDateTime::now_utc(),
                local_offset: self.local_offset,
                journey_id: journey.id,
                journey_id_text: journey_id_text.as_str(),
                distinct_id: self.distinct_id.as_str(),
                origin_event_id,
                wait_state: journey.wait_state.as_ref(),
                user: self.user.as_ref(),
                segments: self.segments.as_ref(),
                features: self.features.as_ref(),
                history: self.history.as_ref(),
                experiments: self.experiments.as_ref(),
                flows: self.flows.as_ref(),
                events: self.events.as_ref(),
                customer: self.customer.as_ref(),
                delegate: self.delegate.as_ref(),
                outcomes: self.outcomes.as_ref(),
            };

            match execute_node(&node, &resume, &exec_ctx).await {
                Ok(NodeExecutionResult::Advance(next_id)) => {
                    journey.current_node_id = Some(next_id);
                    journey.status = JourneyStatus::Active;
                    journey.wait_state = None;
                    journey.pending_after_delay.clear();
                    journey.updated_at = OffsetDateTime::now_utc();
                }
                Ok(NodeExecutionResult::Wait(deadlines)) => {
                    let wait_state = WaitState { started_at: OffsetDateTime::now_utc(), deadlines };
                    let next_timer = wait_state.earliest_future(OffsetDateTime::now_utc());
                    journey.status = JourneyStatus::Paused;
                    journey.wait_state = Some(wait_state);
                    journey.pending_after_delay.clear();
                    journey.updated_at = OffsetDateTime::now_utc();
                    self.persist(&journey);
                    match next_timer {
                        Some(at) => self.schedule_timer(journey.id, at),
                        None => self.clear_timer(journey.id),
                    }
                    return;
                }
                Ok(NodeExecutionResult::NoMatch) => {
                    journey.updated_at = OffsetDateTime::now_utc();
                    self.persist(&journey);
                    return;
                }
                Ok(NodeExecutionResult::Delay(at)) => {
                    journey.status = JourneyStatus::Paused;
                    journey.pending_after_delay = vec![at];
                    journey.wait_state = None;
                    journey.updated_at = OffsetDateTime::now_utc();
                    self.persist(&journey);
                    self.schedule_timer(journey.id, at);
                    return;
                }
                Ok(NodeExecutionResult::Complete(reason)) => {
                    self.complete_journey(journey, reason).await;
                    return;
                }
                Err(err) => {
                    warn!(journey_id = %journey.id, %node_id, error = %err, "node execution failed; applying node-local fallback");
                    match node_error_fallback(&node) {
                        NodeErrorFallback::Advance(next_id) => {
                            journey.current_node_id = Some(next_id);
                            journey.status = JourneyStatus::Active;
                            journey.updated_at = OffsetDateTime::now_utc();
                        }
                        NodeErrorFallback::Complete(reason) => {
                            self.complete_journey(journey, reason).await;
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn complete_journey(&mut self, mut journey: Journey, reason: ExitReason) {
        self.clear_timer(journey.id);
        let now = OffsetDateTime::now_utc();
        journey.status = if matches!(reason, ExitReason::Cancelled) { JourneyStatus::Cancelled } else { JourneyStatus::Completed };
        journey.completed_at = Some(now);
        journey.exit_reason = Some(reason);
        journey.updated_at = now;
        journey.current_node_id = None;
        journey.wait_state = None;
        journey.pending_after_delay.clear();
        self.persist(&journey);
    }

    fn persist(&self, journey: &Journey) {
        if let Err(err) = self.store.save(journey) {
            warn!(journey_id = %journey.id, error = %err, "failed to persist journey");
        }
    }
}
