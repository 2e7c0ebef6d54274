// crates/growth-broker/src/broker.rs
// ============================================================================
// Module: Trigger Broker
// Description: Correlates each ingested event with the set of downstream
// outcomes it produced and delivers them to the caller exactly once.
// Purpose: Implements spec §4.4's subscribe/bind/emit contract as a
// task+channel model rather than a callback registry (per the module's
// REDESIGN FLAG: coroutine control flow becomes task + channel).
// Dependencies: crate::error, crate::types, growth-core, tokio
// ============================================================================

//! ## Overview
//! `subscribe` registers a one-shot [`tokio::sync::oneshot`] channel keyed
//! by event id and returns a future that races the receiver against a
//! `window` timer. `emit` resolves the channel if it is still pending and
//! is a no-op otherwise (spec §4.4: "After resolution, further emissions
//! for that eventId are dropped"), which is what gives the subscription
//! its exactly-once resolution guarantee (spec §3 invariant).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use growth_core::EventId;
use tokio::sync::oneshot;
use tracing::debug;
use tracing::warn;

use crate::error::BrokerError;
use crate::types::Binding;
use crate::types::BrokerOutcome;
use crate::types::Update;

struct Subscription {
    sender: Option<oneshot::Sender<Update>>,
    binding: Option<Binding>,
}

// ============================================================================
// SECTION: TriggerBroker
// ============================================================================

/// One-shot subscriber registry correlating an ingested event with its
/// downstream outcomes (spec §4.4).
#[derive(Default)]
pub struct TriggerBroker {
    subscriptions: Mutex<HashMap<EventId, Subscription>>,
}

impl TriggerBroker {
    /// Creates an empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a one-shot subscription for `event_id` and waits up to
    /// `window` for a terminal update (spec §4.4:
    /// "`subscribe(eventId, window, callback)`"; here, waiting on the
    /// returned future replaces the callback).
    pub async fn subscribe(&self, event_id: EventId, window: Duration) -> BrokerOutcome {
        let (tx, rx) = oneshot::channel();
        {
            let mut subs = self.subscriptions.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            subs.insert(event_id, Subscription { sender: Some(tx), binding: None });
        }

        let outcome = tokio::select! {
            biased;
            received = rx => received.map_or(BrokerOutcome::NoInteraction, BrokerOutcome::Resolved),
            () = tokio::time::sleep(window) => BrokerOutcome::NoInteraction,
        };

        self.subscriptions.lock().unwrap_or_else(std::sync::PoisonError::into_inner).remove(&event_id);
        outcome
    }

    /// Correlates `event_id` with the journey/flow work it produced, so a
    /// later `emit` can be matched back to this subscription even if the
    /// emitter only knows the event id (spec §4.4: "`bind(eventId,
    /// journeyId, flowId)`").
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::UnknownSubscription`] if no subscription is
    /// registered for `event_id` (it may have already resolved/timed out).
    pub fn bind(&self, event_id: EventId, binding: Binding) -> Result<(), BrokerError> {
        let mut subs = self.subscriptions.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        match subs.get_mut(&event_id) {
            Some(entry) => {
                entry.binding = Some(binding);
                Ok(())
            }
            None => Err(BrokerError::UnknownSubscription(event_id.to_string())),
        }
    }

    /// Delivers `update` for `event_id`. If the subscription has already
    /// resolved (or never existed), this is a no-op (spec §4.4: "After
    /// resolution, further emissions for that eventId are dropped").
    pub fn emit(&self, event_id: EventId, update: Update) {
        let sender = {
            let mut subs = self.subscriptions.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            subs.get_mut(&event_id).and_then(|entry| entry.sender.take())
        };
        match sender {
            Some(sender) => {
                if sender.send(update).is_err() {
                    debug!(event_id = %event_id, "subscriber already gone when emitting");
                }
            }
            None => warn!(event_id = %event_id, "emit dropped: no pending subscription"),
        }
    }

    /// Returns the binding registered for `event_id`, if any.
    #[must_use]
    pub fn binding_for(&self, event_id: EventId) -> Option<Binding> {
        let subs = self.subscriptions.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        subs.get(&event_id).and_then(|entry| entry.binding.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use super::*;
    use crate::types::DecisionOutcome;

    #[tokio::test]
    async fn resolves_with_first_emitted_update() {
        let broker = TriggerBroker::new();
        let event_id = EventId::new();

        let wait = broker.subscribe(event_id, Duration::from_secs(5));
        let emit = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            broker.emit(event_id, Update::Decision(DecisionOutcome::AllowedImmediate));
        };

        let (outcome, ()) = tokio::join!(wait, emit);
        assert_eq!(outcome, BrokerOutcome::Resolved(Update::Decision(DecisionOutcome::AllowedImmediate)));
    }

    #[tokio::test]
    async fn times_out_with_no_interaction() {
        let broker = TriggerBroker::new();
        let event_id = EventId::new();
        let outcome = broker.subscribe(event_id, Duration::from_millis(20)).await;
        assert_eq!(outcome, BrokerOutcome::NoInteraction);
    }

    #[tokio::test]
    async fn second_emit_after_resolution_is_dropped() {
        let broker = TriggerBroker::new();
        let event_id = EventId::new();

        let wait = broker.subscribe(event_id, Duration::from_secs(5));
        let emit = async {
            broker.emit(event_id, Update::Decision(DecisionOutcome::AllowedImmediate));
            broker.emit(event_id, Update::Decision(DecisionOutcome::Denied));
        };
        let (outcome, ()) = tokio::join!(wait, emit);
        assert_eq!(outcome, BrokerOutcome::Resolved(Update::Decision(DecisionOutcome::AllowedImmediate)));
    }

    #[tokio::test]
    async fn bind_then_lookup_round_trips() {
        let broker = TriggerBroker::new();
        let event_id = EventId::new();
        let _wait = tokio::spawn(async move {});
        broker
            .subscriptions
            .lock()
            .unwrap()
            .insert(event_id, Subscription { sender: None, binding: None });
        let binding = Binding { journey_id: growth_core::JourneyId::new(), flow_id: None };
        broker.bind(event_id, binding.clone()).unwrap();
        assert_eq!(broker.binding_for(event_id), Some(binding));
    }
}
