// demos/walkthrough/src/main.rs
// ============================================================================
// Binary: growth-walkthrough
// Description: Exercises the public `growth-sdk` facade end to end against
// a local mock backend: setup, an anonymous track, identify, a session,
// and a manual flush.
// ============================================================================

use growth_config::SdkConfig;
use growth_core::DynValue;
use growth_core::PropertyBag;
use growth_sdk::GrowthSdk;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    let server = mock_backend().await;

    let config = SdkConfig::builder("demo-api-key", server.uri())
        .flush_at(5)
        .immediate_outcome_window_seconds(2)
        .build()?;

    let storage_dir = tempfile::tempdir()?;
    let storage_path = storage_dir.path().join("growth.sqlite");

    let sdk = GrowthSdk::setup(config, &storage_path).await?;
    tracing::info!(anonymous_id = %sdk.get_anonymous_id(), "sdk ready");

    let session_id = sdk.start_session(None);
    tracing::info!(%session_id, "session started");

    let outcome = sdk.track("app_opened", None, None, None).await?;
    tracing::info!(?outcome, "tracked app_opened");

    let mut signup_props = PropertyBag::new();
    signup_props.insert("plan".to_string(), DynValue::String("free".to_string()));
    sdk.identify("demo-user-1", Some(signup_props), None).await?;
    tracing::info!(distinct_id = %sdk.get_distinct_id(), "identified");

    let outcome = sdk.track("feature_used", None, None, None).await?;
    tracing::info!(?outcome, "tracked feature_used");

    let flushed = sdk.flush_events().await;
    tracing::info!(flushed, queued = sdk.get_queued_event_count().await, "flushed queue");

    sdk.end_session();
    sdk.shutdown().await;
    Ok(())
}

async fn mock_backend() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "campaigns": [],
            "segments": [],
            "features": [],
            "experiments": [],
            "journeys": [],
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/i/batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "ok",
            "processed": 1,
            "failed": 0,
            "total": 1,
            "errors": null,
        })))
        .mount(&server)
        .await;

    server
}
