// crates/growth-providers/tests/backend_round_trip.rs
// ============================================================================
// Integration test: a single event round-trips through the backend client,
// and a subsequent profile fetch feeds the segment/feature adapters.
// ============================================================================

#![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

use std::sync::Arc;
use std::time::Duration;

use growth_core::DistinctId;
use growth_core::Event;
use growth_ir::context::FeatureAdapter;
use growth_ir::context::SegmentAdapter;
use growth_providers::BackendClient;
use growth_providers::ProfileBackedSegments;
use growth_providers::ProfileCache;
use reqwest::Client;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;

#[tokio::test]
async fn event_send_and_profile_driven_segment_check() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/i/batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "ok", "processed": 1, "failed": 0, "total": 1, "errors": null
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "campaigns": [], "experiments": [], "journeys": [],
            "segments": [{"id": "trial_expiring"}],
            "features": [],
        })))
        .mount(&server)
        .await;

    let client = Arc::new(BackendClient::new(Client::new(), server.uri(), "test-key"));

    let event = Event::new("purchase", DistinctId::new("u1"), time::OffsetDateTime::now_utc());
    let batch = client.send_batch(std::slice::from_ref(&event), false).await.unwrap();
    assert_eq!(batch.processed, 1);
    assert_eq!(batch.failed, 0);

    let cache = Arc::new(ProfileCache::new(client, Duration::from_secs(60)));
    cache.refresh("u1", None).await.unwrap();

    let segments = ProfileBackedSegments::new(cache);
    assert!(segments.is_member("trial_expiring", None).await.unwrap());
}
