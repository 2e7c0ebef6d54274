// crates/growth-sdk/src/ports.rs
// ============================================================================
// Module: Journey Service Port Implementations
// Description: Concrete backings for every port `growth_journey::ports`
// defines, wired to this crate's storage/queue/profile-cache.
// Purpose: One file per seam the journey service is decoupled from (spec
// §4.6): durable event delivery, campaign/experiment lookup, and the two
// ports with no in-core behavior (flow presentation, delegate messages).
// Dependencies: growth-core, growth-journey, growth-providers, growth-queue,
// growth-store, tokio, tracing
// ============================================================================

//! ## Overview
//! Flow presentation and arbitrary delegate messages are explicitly out of
//! core scope (spec §1: "rendering UI ... out of scope"); the two tracing
//! stubs here exist so `JourneyServiceDeps` always has something to call,
//! matching the pattern of a composable default a host app is expected to
//! override.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use growth_core::Campaign;
use growth_core::CampaignId;
use growth_core::Event;
use growth_core::PropertyBag;
use growth_journey::ports::CampaignSource;
use growth_journey::ports::DelegatePort;
use growth_journey::ports::EventSink;
use growth_journey::ports::ExperimentAssignments;
use growth_journey::ports::FlowPresenter;
use growth_providers::ProfileCache;
use growth_queue::NetworkQueue;
use growth_store::EventStore;

// ============================================================================
// SECTION: SdkEventSink
// ============================================================================

/// Durably persists every event the journey service emits (via `SendEvent`
/// nodes) the same way `GrowthSdk::track` does: append locally, then hand
/// off to the network queue without blocking the caller.
pub struct SdkEventSink {
    store: Arc<EventStore>,
    queue: Arc<NetworkQueue>,
}

impl SdkEventSink {
    /// Builds a sink over the shared event store and network queue.
    #[must_use]
    pub fn new(store: Arc<EventStore>, queue: Arc<NetworkQueue>) -> Arc<Self> {
        Arc::new(Self { store, queue })
    }

    /// Appends `event` locally and schedules it for delivery.
    pub fn ingest(&self, event: Event) {
        if let Err(err) = self.store.append(&event) {
            tracing::warn!(error = %err, event_name = %event.name, "failed to persist event locally");
        }
        let queue = Arc::clone(&self.queue);
        tokio::spawn(async move {
            queue.enqueue(event).await;
        });
    }
}

impl EventSink for SdkEventSink {
    fn send(&self, event: Event) {
        self.ingest(event);
    }
}

// ============================================================================
// SECTION: Profile-backed campaign/experiment lookups
// ============================================================================

/// Answers `CampaignSource` from the cached profile snapshot, the same
/// fetch-and-replace cache `ProfileBackedSegments`/`ProfileBackedFeatures`
/// read (spec §4.3).
pub struct ProfileBackedCampaigns {
    cache: Arc<ProfileCache>,
}

impl ProfileBackedCampaigns {
    /// Wraps a shared [`ProfileCache`].
    #[must_use]
    pub fn new(cache: Arc<ProfileCache>) -> Self {
        Self { cache }
    }
}

impl CampaignSource for ProfileBackedCampaigns {
    fn campaigns(&self) -> Vec<Campaign> {
        self.cache.snapshot().campaigns
    }

    fn campaign(&self, id: &CampaignId) -> Option<Campaign> {
        self.cache.snapshot().campaigns.into_iter().find(|campaign| &campaign.id == id)
    }
}

/// Answers `ExperimentAssignments` from the cached profile snapshot.
pub struct ProfileBackedExperiments {
    cache: Arc<ProfileCache>,
}

impl ProfileBackedExperiments {
    /// Wraps a shared [`ProfileCache`].
    #[must_use]
    pub fn new(cache: Arc<ProfileCache>) -> Self {
        Self { cache }
    }
}

impl ExperimentAssignments for ProfileBackedExperiments {
    fn assigned_variant(&self, experiment_id: &str) -> Option<String> {
        self.cache.snapshot().experiments.get(experiment_id).cloned()
    }
}

// ============================================================================
// SECTION: Tracing stubs for out-of-scope ports
// ============================================================================

/// Logs a flow presentation request instead of rendering anything (spec
/// §1: rendering is an external collaborator). A host app supplies its own
/// `FlowPresenter` in place of this default.
#[derive(Debug, Default)]
pub struct TracingFlowPresenter;

impl FlowPresenter for TracingFlowPresenter {
    fn present(&self, flow_id: &str, distinct_id: &str) {
        tracing::info!(flow_id, distinct_id, "flow presentation requested (no renderer configured)");
    }
}

/// Logs a delegate message instead of delivering one anywhere. A host app
/// supplies its own `DelegatePort` in place of this default.
#[derive(Debug, Default)]
pub struct TracingDelegate;

impl DelegatePort for TracingDelegate {
    fn deliver(&self, message: &str, payload: Option<PropertyBag>) {
        tracing::info!(message, ?payload, "delegate message (no delegate configured)");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use std::time::Duration as StdDuration;

    use growth_providers::BackendClient;
    use reqwest::Client;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;
    use wiremock::matchers::method;
    use wiremock::matchers::path;

    use super::*;

    async fn cache_with_one_campaign() -> Arc<ProfileCache> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "campaigns": [],
                "segments": [],
                "features": [],
                "experiments": [{"experiment_id": "exp_1", "variant_id": "b"}],
                "journeys": [],
            })))
            .mount(&server)
            .await;
        let client = Arc::new(BackendClient::new(Client::new(), server.uri(), "key"));
        let cache = Arc::new(ProfileCache::new(client, StdDuration::from_secs(60)));
        cache.refresh("u1", None).await.unwrap();
        cache
    }

    #[tokio::test]
    async fn experiment_assignment_reads_from_snapshot() {
        let cache = cache_with_one_campaign().await;
        let adapter = ProfileBackedExperiments::new(cache);
        assert_eq!(adapter.assigned_variant("exp_1"), Some("b".to_string()));
        assert_eq!(adapter.assigned_variant("missing"), None);
    }

    #[tokio::test]
    async fn campaign_lookup_is_empty_with_no_fixture_campaigns() {
        let cache = cache_with_one_campaign().await;
        let adapter = ProfileBackedCampaigns::new(cache);
        assert!(adapter.campaigns().is_empty());
        assert!(adapter.campaign(&CampaignId::new("anything")).is_none());
    }
}
