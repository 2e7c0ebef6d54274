// crates/growth-providers/src/wire.rs
// ============================================================================
// Module: Wire DTOs
// Description: Request/response shapes for the five outbound endpoints
// (spec §6 "Outbound HTTP").
// Purpose: Keep wire shapes separate from the domain model; conversions
// live in `client.rs`.
// Dependencies: growth-core, serde
// ============================================================================

use std::collections::BTreeMap;

use growth_core::DynValue;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: POST /api/i/event
// ============================================================================

/// Request body for `POST /api/i/event`.
#[derive(Debug, Clone, Serialize)]
pub struct EventRequest {
    /// Event name.
    pub event: String,
    /// Owning distinct id.
    pub distinct_id: String,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    /// Event properties.
    pub properties: BTreeMap<String, DynValue>,
    /// Deduplication key for at-least-once delivery.
    pub idempotency_key: String,
    /// Optional numeric value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Optional entity identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
}

/// Response body for `POST /api/i/event`.
#[derive(Debug, Clone, Deserialize)]
pub struct EventResponse {
    /// Server-reported processing status.
    pub status: String,
    /// Server-computed response payload (e.g. gate decision), if any.
    pub payload: Option<serde_json::Value>,
    /// Updated customer snapshot, if the server returns one inline.
    pub customer: Option<serde_json::Value>,
    /// Echoed event id.
    pub event: Option<String>,
    /// Human-readable message, typically only on failure.
    pub message: Option<String>,
    /// Usage/quota snapshot, if relevant to this event.
    pub usage: Option<serde_json::Value>,
    /// Journey reference, when this event caused enrollment.
    pub journey: Option<JourneyRef>,
}

/// A reference to a journey created as a side effect of an ingested event
/// (spec §8 scenario 2: `JourneyRef{journeyId, campaignId, flowId}`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct JourneyRef {
    /// The journey's id.
    pub journey_id: String,
    /// The campaign it was enrolled from.
    pub campaign_id: String,
    /// The flow bound to this enrollment, if any.
    pub flow_id: Option<String>,
}

// ============================================================================
// SECTION: POST /api/i/batch
// ============================================================================

/// Request body for `POST /api/i/batch`.
#[derive(Debug, Clone, Serialize)]
pub struct BatchRequest {
    /// The API key (also sent as a bearer token; included for servers that
    /// expect it body-side as well).
    pub api_key: String,
    /// The batched events.
    pub events: Vec<EventRequest>,
    /// Marks this batch as a backfill rather than live traffic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub historical_migration: Option<bool>,
}

/// Response body for `POST /api/i/batch`.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchResponse {
    /// Server-reported overall status.
    pub status: String,
    /// Number of events successfully processed.
    pub processed: u64,
    /// Number of events that failed processing.
    pub failed: u64,
    /// Total events in the batch.
    pub total: u64,
    /// Per-event error details, when `failed > 0`.
    pub errors: Option<Vec<serde_json::Value>>,
}

// ============================================================================
// SECTION: POST /profile
// ============================================================================

/// Request body for `POST /profile`.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileRequest {
    /// The user to fetch a profile snapshot for.
    pub distinct_id: String,
    /// Optional locale hint for localized flow/campaign content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

/// Response body for `POST /profile`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileResponse {
    /// Published campaigns visible to this user.
    pub campaigns: Vec<serde_json::Value>,
    /// Segment memberships.
    pub segments: Vec<serde_json::Value>,
    /// Feature/entitlement grants.
    pub features: Vec<serde_json::Value>,
    /// Experiment assignments.
    pub experiments: Vec<serde_json::Value>,
    /// Server-known live journeys for this user.
    pub journeys: Vec<serde_json::Value>,
}

// ============================================================================
// SECTION: POST /entitled
// ============================================================================

/// Request body for `POST /entitled`.
#[derive(Debug, Clone, Serialize)]
pub struct EntitlementRequest {
    /// The customer (distinct id) being checked.
    pub customer_id: String,
    /// The feature being checked.
    pub feature_id: String,
    /// Minimum metered balance required, for metered features.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_balance: Option<f64>,
    /// Optional entity scope for entity-scoped entitlements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
}

/// Response body for `POST /entitled`.
#[derive(Debug, Clone, Deserialize)]
pub struct EntitlementResponse {
    /// Whether the feature is granted.
    pub allowed: bool,
    /// The current metered balance, for metered features.
    pub balance: Option<f64>,
}

// ============================================================================
// SECTION: POST /purchase
// ============================================================================

/// Request body for `POST /purchase`.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseRequest {
    /// Always `"appstore"` in the current integration.
    #[serde(rename = "type")]
    pub kind: String,
    /// The signed App Store transaction.
    pub transaction_jwt: String,
    /// The purchasing user's distinct id.
    pub distinct_id: String,
}

/// Response body for `POST /purchase`.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseResponse {
    /// Whether verification and fulfillment succeeded.
    pub success: bool,
    /// The resolved customer id, when known.
    pub customer_id: Option<String>,
    /// Updated feature grants resulting from this purchase.
    pub features: Option<Vec<serde_json::Value>>,
    /// Error detail, when `success` is false.
    pub error: Option<String>,
}
