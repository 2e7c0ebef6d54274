// crates/growth-providers/src/client.rs
// ============================================================================
// Module: Backend Client
// Description: Thin async wrapper over the five outbound HTTP endpoints
// (spec §6).
// Purpose: One place that knows the base URL, auth header, and response
// status taxonomy; callers (network queue, profile cache, purchase flow)
// never build requests by hand.
// Dependencies: crate::error, crate::wire, growth-core, reqwest
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;
use growth_core::Event;
use reqwest::Client;
use reqwest::StatusCode;
use reqwest::header::CONTENT_ENCODING;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ProviderError;
use crate::wire::BatchRequest;
use crate::wire::BatchResponse;
use crate::wire::EntitlementRequest;
use crate::wire::EntitlementResponse;
use crate::wire::EventRequest;
use crate::wire::EventResponse;
use crate::wire::ProfileRequest;
use crate::wire::ProfileResponse;
use crate::wire::PurchaseRequest;
use crate::wire::PurchaseResponse;

// ============================================================================
// SECTION: BackendClient
// ============================================================================

/// Async client for the backend's ingestion, profile, entitlement, and
/// purchase endpoints (spec §6).
pub struct BackendClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl BackendClient {
    /// Builds a client pointed at `base_url`, authenticating with `api_key`
    /// as a bearer token (spec §6: "bearer via API key").
    #[must_use]
    pub fn new(http: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into(), api_key: api_key.into() }
    }

    /// Sends a single event (`POST /api/i/event`).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on transport failure, a non-2xx status, or
    /// undecodable response body.
    pub async fn send_event(&self, request: &EventRequest) -> Result<EventResponse, ProviderError> {
        self.post_json("/api/i/event", request).await
    }

    /// Sends a batch of events, gzip-compressed (`POST /api/i/batch`, spec
    /// §6: "gzipped body").
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on transport failure, a non-2xx status, or
    /// undecodable response body.
    pub async fn send_batch(&self, events: &[Event], historical_migration: bool) -> Result<BatchResponse, ProviderError> {
        let request = BatchRequest {
            api_key: self.api_key.clone(),
            events: events.iter().map(event_to_request).collect(),
            historical_migration: historical_migration.then_some(true),
        };
        self.post_json_gzip("/api/i/batch", &request).await
    }

    /// Fetches the profile snapshot for `distinct_id` (`POST /profile`).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on transport failure, a non-2xx status, or
    /// undecodable response body.
    pub async fn fetch_profile(&self, distinct_id: &str, locale: Option<&str>) -> Result<ProfileResponse, ProviderError> {
        let request = ProfileRequest { distinct_id: distinct_id.to_string(), locale: locale.map(str::to_string) };
        self.post_json("/profile", &request).await
    }

    /// Checks an entitlement (`POST /entitled`).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on transport failure, a non-2xx status, or
    /// undecodable response body.
    pub async fn check_entitlement(&self, request: &EntitlementRequest) -> Result<EntitlementResponse, ProviderError> {
        self.post_json("/entitled", request).await
    }

    /// Verifies and fulfills an App Store purchase (`POST /purchase`).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on transport failure, a non-2xx status, or
    /// undecodable response body.
    pub async fn complete_purchase(&self, request: &PurchaseRequest) -> Result<PurchaseResponse, ProviderError> {
        self.post_json("/purchase", request).await
    }

    async fn post_json<Req: Serialize + ?Sized, Resp: DeserializeOwned>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp, ProviderError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        Self::decode_response(response).await
    }

    /// Same as `post_json`, but gzip-compresses the serialized body and
    /// marks it with `Content-Encoding: gzip` (spec §6: "gzipped body").
    async fn post_json_gzip<Req: Serialize + ?Sized, Resp: DeserializeOwned>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp, ProviderError> {
        let json = serde_json::to_vec(body)?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        let compressed = encoder.finish()?;

        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_ENCODING, "gzip")
            .body(compressed)
            .send()
            .await?;

        Self::decode_response(response).await
    }

    async fn decode_response<Resp: DeserializeOwned>(response: reqwest::Response) -> Result<Resp, ProviderError> {
        let status = response.status();
        if status == StatusCode::OK || status.is_success() {
            let bytes = response.bytes().await?;
            serde_json::from_slice(&bytes).map_err(ProviderError::from)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ProviderError::Http { status: status.as_u16(), body })
        }
    }
}

fn event_to_request(event: &Event) -> EventRequest {
    EventRequest {
        event: event.name.clone(),
        distinct_id: event.distinct_id.as_str().to_string(),
        timestamp: growth_core::time::format_rfc3339(event.timestamp).unwrap_or_default(),
        properties: event.properties.clone(),
        idempotency_key: event.id.to_string(),
        value: event.value.as_ref().map(ToString::to_string),
        entity_id: event.entity_id.as_ref().map(|id| id.as_str().to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use growth_core::DistinctId;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;
    use wiremock::matchers::method;
    use wiremock::matchers::path;

    use super::*;

    #[tokio::test]
    async fn profile_fetch_decodes_a_successful_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "campaigns": [], "segments": [], "features": [], "experiments": [], "journeys": []
            })))
            .mount(&server)
            .await;

        let client = BackendClient::new(Client::new(), server.uri(), "key");
        let profile = client.fetch_profile("u1", None).await.unwrap();
        assert!(profile.campaigns.is_empty());
    }

    #[tokio::test]
    async fn non_success_status_becomes_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/entitled"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = BackendClient::new(Client::new(), server.uri(), "key");
        let request = EntitlementRequest {
            customer_id: "u1".to_string(),
            feature_id: "pro".to_string(),
            required_balance: None,
            entity_id: None,
        };
        let result = client.check_entitlement(&request).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().is_retryable());
    }

    #[tokio::test]
    async fn batch_request_body_is_gzip_compressed() {
        use std::io::Read;

        use wiremock::Request;

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/i/batch"))
            .respond_with(move |request: &Request| {
                let encoding = request.headers.get("content-encoding").and_then(|v| v.to_str().ok());
                assert_eq!(encoding, Some("gzip"));
                let mut decoder = flate2::read::GzDecoder::new(&request.body[..]);
                let mut decoded = String::new();
                decoder.read_to_string(&mut decoded).unwrap();
                assert!(decoded.contains("\"app_opened\""));
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "status": "ok", "processed": 1, "failed": 0, "total": 1, "errors": null,
                }))
            })
            .mount(&server)
            .await;

        let client = BackendClient::new(Client::new(), server.uri(), "key");
        let event = Event::new("app_opened", DistinctId::new("u1"), time::OffsetDateTime::now_utc());
        let response = client.send_batch(&[event], false).await.unwrap();
        assert_eq!(response.processed, 1);
    }

    #[test]
    fn event_to_request_carries_idempotency_key() {
        let event = Event::new("purchase", DistinctId::new("u1"), time::OffsetDateTime::now_utc());
        let request = event_to_request(&event);
        assert_eq!(request.idempotency_key, event.id.to_string());
    }
}
