// crates/growth-sdk/src/sdk.rs
// ============================================================================
// Module: GrowthSdk Facade
// Description: The single public entry point wiring identity, storage, the
// network queue, the profile cache, the trigger broker, and the journey
// service into one handle (spec §6).
// Purpose: Everything a host app calls goes through here; every other
// module in this crate exists to be assembled by `setup`.
// Dependencies: every crate in this workspace, reqwest, rusqlite, tokio
// ============================================================================

//! ## Overview
//! `setup` opens three independent SQLite connections against the same
//! database file, one per store type, matching `growth-store`'s
//! single-writer-per-connection convention. Everything built here is
//! `Arc`-shared between the facade and the spawned journey service so both
//! sides read the same identity, profile cache, and broker.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use growth_broker::BrokerOutcome;
use growth_broker::DecisionOutcome;
use growth_broker::EntitlementOutcome;
use growth_broker::FlowOutcome;
use growth_broker::TriggerBroker;
use growth_broker::Update;
use growth_config::EventLinkingPolicy;
use growth_config::SdkConfig;
use growth_core::DistinctId;
use growth_core::Event;
use growth_core::IDENTIFY_EVENT_NAME;
use growth_core::Identity;
use growth_core::PropertyBag;
use growth_ir::context::UserView;
use growth_journey::JourneyService;
use growth_journey::ports::CustomerUpdater;
use growth_journey::service::JourneyServiceDeps;
use growth_providers::BackendClient;
use growth_providers::ProfileBackedFeatures;
use growth_providers::ProfileBackedSegments;
use growth_providers::ProfileCache;
use growth_providers::wire::PurchaseRequest;
use growth_queue::NetworkQueue;
use growth_store::EventStore;
use growth_store::IdentityStore;
use growth_store::JourneyStore;
use growth_store::StoreBackedHistory;
use growth_store::StoreError;
use growth_store::init_schema;
use reqwest::Client;
use rusqlite::Connection;
use time::OffsetDateTime;
use time::UtcOffset;
use tokio::task::JoinHandle;

use crate::config::queue_config_from;
use crate::error::SdkError;
use crate::error::StoreKitError;
use crate::identity::IdentityHandle;
use crate::ports::ProfileBackedCampaigns;
use crate::ports::ProfileBackedExperiments;
use crate::ports::SdkEventSink;
use crate::ports::TracingDelegate;
use crate::ports::TracingFlowPresenter;
use crate::session::SessionHandle;
use crate::session::SessionInfo;

// ============================================================================
// SECTION: TrackOutcome
// ============================================================================

/// What happened within the immediate-outcome window after a tracked event
/// (spec §4.4, §6). Mirrors `growth_broker::Update` plus the timeout case.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackOutcome {
    /// No terminal update arrived before the window elapsed.
    NoInteraction,
    /// A flow reached a terminal state.
    Flow(FlowOutcome),
    /// A decision was reached without a flow being shown.
    Decision(DecisionOutcome),
    /// An entitlement check resolved.
    Entitlement(EntitlementOutcome),
}

impl From<BrokerOutcome> for TrackOutcome {
    fn from(outcome: BrokerOutcome) -> Self {
        match outcome {
            BrokerOutcome::NoInteraction => Self::NoInteraction,
            BrokerOutcome::Resolved(Update::Flow(flow)) => Self::Flow(flow),
            BrokerOutcome::Resolved(Update::Decision(decision)) => Self::Decision(decision),
            BrokerOutcome::Resolved(Update::Entitlement(entitlement)) => Self::Entitlement(entitlement),
        }
    }
}

// ============================================================================
// SECTION: GrowthSdk
// ============================================================================

/// The assembled SDK: one identity, one local database, one network queue,
/// one profile cache, one journey service (spec §6).
pub struct GrowthSdk {
    config: SdkConfig,
    client: Arc<BackendClient>,
    identity: Arc<IdentityHandle>,
    identity_store: Arc<IdentityStore>,
    event_store: Arc<EventStore>,
    queue: Arc<NetworkQueue>,
    profile_cache: Arc<ProfileCache>,
    broker: Arc<TriggerBroker>,
    journey: JourneyService,
    session: SessionHandle,
    _queue_timer: JoinHandle<()>,
}

impl GrowthSdk {
    /// Boots the SDK: opens local storage at `storage_path`, restores or
    /// mints an identity, and starts the network queue's flush timer and
    /// the journey service's mailbox task.
    ///
    /// Profile data is fetched once here so segment/feature/campaign reads
    /// have something to answer from immediately after setup (spec §4.3:
    /// "setup" is one of the four refresh triggers).
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Storage`] if the local database cannot be
    /// opened or migrated, or [`SdkError::Network`] if the initial profile
    /// fetch fails.
    pub async fn setup(config: SdkConfig, storage_path: impl AsRef<Path>) -> Result<Arc<Self>, SdkError> {
        let path = storage_path.as_ref();

        let identity_conn = Connection::open(path).map_err(StoreError::from)?;
        init_schema(&identity_conn)?;
        let identity_store = Arc::new(IdentityStore::new(identity_conn));

        let event_conn = Connection::open(path).map_err(StoreError::from)?;
        init_schema(&event_conn)?;
        let event_store = Arc::new(EventStore::new(event_conn));

        let journey_conn = Connection::open(path).map_err(StoreError::from)?;
        init_schema(&journey_conn)?;
        let journey_store = Arc::new(JourneyStore::new(journey_conn));

        let identity = identity_store.load()?.unwrap_or_else(Identity::new);
        let identity = IdentityHandle::new(identity);

        let http = Client::new();
        let client = Arc::new(BackendClient::new(http, config.api_endpoint.clone(), config.api_key.clone()));
        let queue = Arc::new(NetworkQueue::new(Arc::clone(&client), queue_config_from(&config)));
        let queue_timer = queue.spawn_timer();

        let profile_cache = Arc::new(ProfileCache::new(Arc::clone(&client), StdDuration::from_secs(config.feature_cache_ttl_seconds)));
        let distinct_id = identity.snapshot().effective_distinct_id();
        profile_cache.refresh(distinct_id.as_str(), config.locale_identifier.as_deref()).await?;

        let broker = Arc::new(TriggerBroker::new());
        let history = StoreBackedHistory::new(Arc::clone(&event_store), Arc::clone(&identity));
        let events = SdkEventSink::new(Arc::clone(&event_store), Arc::clone(&queue));

        let deps = JourneyServiceDeps {
            store: Arc::clone(&journey_store),
            broker: Arc::clone(&broker),
            campaigns: Arc::new(ProfileBackedCampaigns::new(Arc::clone(&profile_cache))),
            user: Arc::clone(&identity) as Arc<dyn UserView>,
            segments: Arc::new(ProfileBackedSegments::new(Arc::clone(&profile_cache))),
            features: Arc::new(ProfileBackedFeatures::new(Arc::clone(&profile_cache))),
            history: Arc::new(history),
            flows: Arc::new(TracingFlowPresenter),
            events,
            customer: Arc::clone(&identity) as Arc<dyn CustomerUpdater>,
            delegate: Arc::new(TracingDelegate),
            experiments: Arc::new(ProfileBackedExperiments::new(Arc::clone(&profile_cache))),
            local_offset: UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
            distinct_id,
        };
        let journey = JourneyService::spawn(deps);

        Ok(Arc::new(Self {
            config,
            client,
            identity,
            identity_store,
            event_store,
            queue,
            profile_cache,
            broker,
            journey,
            session: SessionHandle::new(),
            _queue_timer: queue_timer,
        }))
    }

    // ------------------------------------------------------------------
    // Tracking
    // ------------------------------------------------------------------

    /// Tracks `name`, optionally updating the current user's properties in
    /// the same call, and waits up to `immediateOutcomeWindowSeconds` for
    /// a terminal outcome (spec §4.4, §6).
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Storage`] if the event cannot be persisted
    /// locally.
    pub async fn track(
        &self,
        name: impl Into<String>,
        properties: Option<PropertyBag>,
        user_props: Option<PropertyBag>,
        user_props_set_once: Option<PropertyBag>,
    ) -> Result<TrackOutcome, SdkError> {
        if let Some(props) = user_props {
            self.identity.set_properties(props, false);
        }
        if let Some(props) = user_props_set_once {
            self.identity.set_properties(props, true);
        }

        let distinct_id = self.identity.snapshot().effective_distinct_id();
        let mut event = Event::new(name, distinct_id, OffsetDateTime::now_utc());
        if let Some(props) = properties {
            event = event.with_properties(props);
        }
        if let Some(session_id) = self.session.current_id() {
            event = event.with_session(session_id);
        }

        self.persist_and_enqueue(event.clone()).await?;

        let event_id = event.id;
        let window = StdDuration::from_secs(self.config.immediate_outcome_window_seconds.max(0) as u64);
        let subscribe = self.broker.subscribe(event_id, window);
        let (outcome, ()) = tokio::join!(subscribe, async { self.journey.handle_event(event) });
        Ok(outcome.into())
    }

    async fn persist_and_enqueue(&self, event: Event) -> Result<(), SdkError> {
        self.event_store.append(&event)?;
        self.queue.enqueue(event).await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    /// Identifies the current user as `distinct_id`, migrating or keeping
    /// separate its prior anonymous history per `eventLinkingPolicy`
    /// (spec §4.3), and refreshes the profile cache.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Storage`] if the identity or migrated events
    /// cannot be persisted, or [`SdkError::Network`] if the profile
    /// refresh fails.
    pub async fn identify(
        &self,
        distinct_id: impl Into<String>,
        user_props: Option<PropertyBag>,
        user_props_set_once: Option<PropertyBag>,
    ) -> Result<(), SdkError> {
        let previous = self.identity.snapshot().effective_distinct_id();
        let new_distinct_id = DistinctId::new(distinct_id.into());

        let transitioned = self.identity.identify(new_distinct_id.clone(), user_props.unwrap_or_default());
        if let Some(set_once) = user_props_set_once {
            self.identity.set_properties(set_once, true);
        }
        self.identity_store.save(&self.identity.snapshot())?;

        if transitioned && self.config.event_linking_policy == EventLinkingPolicy::MigrateOnIdentify {
            self.event_store.reassign(&previous, &new_distinct_id)?;
        }

        self.queue.pause();
        let identify_event = Event::new(IDENTIFY_EVENT_NAME, new_distinct_id.clone(), OffsetDateTime::now_utc());
        self.persist_and_enqueue(identify_event).await?;
        self.queue.flush().await;
        self.queue.resume();

        self.journey.identify(new_distinct_id.clone());
        self.profile_cache.refresh(new_distinct_id.as_str(), self.config.locale_identifier.as_deref()).await?;
        Ok(())
    }

    /// Clears the current distinct id (spec §4.3). When `keep_anonymous`
    /// is false, a fresh anonymous id is also minted.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Storage`] or [`SdkError::Network`] as above.
    pub async fn reset(&self, keep_anonymous: bool) -> Result<(), SdkError> {
        self.identity.reset(keep_anonymous);
        self.identity_store.save(&self.identity.snapshot())?;
        let new_id = self.identity.snapshot().effective_distinct_id();
        self.journey.reset(new_id.clone());
        self.session.reset();
        self.profile_cache.refresh(new_id.as_str(), self.config.locale_identifier.as_deref()).await?;
        Ok(())
    }

    /// The current effective distinct id (identified, else anonymous).
    #[must_use]
    pub fn get_distinct_id(&self) -> String {
        self.identity.snapshot().effective_distinct_id().as_str().to_string()
    }

    /// The anonymous id minted for this installation, independent of
    /// whether the user has since been identified.
    #[must_use]
    pub fn get_anonymous_id(&self) -> String {
        self.identity.snapshot().anonymous_id.as_str().to_string()
    }

    /// Whether `identify` has been called and not since reset.
    #[must_use]
    pub fn is_identified(&self) -> bool {
        self.identity.snapshot().is_identified()
    }

    // ------------------------------------------------------------------
    // Queue control
    // ------------------------------------------------------------------

    /// Forces an immediate flush, bypassing the size/timer thresholds.
    pub async fn flush_events(&self) -> bool {
        self.queue.flush().await
    }

    /// Suspends timer-driven flushes.
    pub fn pause_event_queue(&self) {
        self.queue.pause();
    }

    /// Resumes timer-driven flushes.
    pub fn resume_event_queue(&self) {
        self.queue.resume();
    }

    /// Number of events currently buffered awaiting delivery.
    pub async fn get_queued_event_count(&self) -> usize {
        self.queue.len().await
    }

    // ------------------------------------------------------------------
    // Profile
    // ------------------------------------------------------------------

    /// Forces a fresh profile fetch, replacing the cached snapshot
    /// (spec §4.3).
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Network`] if the fetch fails.
    pub async fn refresh_profile(&self) -> Result<(), SdkError> {
        let distinct_id = self.identity.snapshot().effective_distinct_id();
        self.profile_cache.refresh(distinct_id.as_str(), self.config.locale_identifier.as_deref()).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Starts a session under `session_id`, minting one if not given.
    /// Returns the id now in effect.
    pub fn start_session(&self, session_id: Option<String>) -> String {
        self.session.start(session_id)
    }

    /// The current session, if one is active.
    #[must_use]
    pub fn get_session(&self) -> SessionInfo {
        self.session.get()
    }

    /// Merges properties into the current session. A no-op if no session
    /// is active.
    pub fn set_session_properties(&self, properties: PropertyBag) {
        self.session.set(properties);
    }

    /// Ends the current session.
    pub fn end_session(&self) {
        self.session.end();
    }

    /// Ends the current session and starts a new one, returning its id.
    pub fn reset_session(&self) -> String {
        self.session.reset()
    }

    // ------------------------------------------------------------------
    // StoreKit
    // ------------------------------------------------------------------

    /// Reports a completed App Store purchase signal for verification and
    /// fulfillment (spec §1: "surfaced to the core as a
    /// `purchase_completed` signal"). Refreshes the profile cache on
    /// success so newly granted entitlements are visible immediately.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::StoreKit`] if the backend rejects or fails to
    /// verify the transaction, or [`SdkError::Network`] on transport
    /// failure.
    pub async fn report_purchase_completed(&self, transaction_jwt: impl Into<String>) -> Result<(), SdkError> {
        let distinct_id = self.identity.snapshot().effective_distinct_id();
        let request = PurchaseRequest {
            kind: "appstore".to_string(),
            transaction_jwt: transaction_jwt.into(),
            distinct_id: distinct_id.as_str().to_string(),
        };
        let response = self.client.complete_purchase(&request).await?;
        if !response.success {
            return Err(StoreKitError::Verification(response.error.unwrap_or_default()).into());
        }
        self.profile_cache.refresh_fast_path(distinct_id.as_str(), self.config.locale_identifier.as_deref()).await;
        Ok(())
    }

    /// Stops the journey service's mailbox task, waiting for it to drain
    /// its current command. Buffered events and the local database are
    /// left intact.
    pub async fn shutdown(&self) {
        self.journey.shutdown().await;
    }
}
