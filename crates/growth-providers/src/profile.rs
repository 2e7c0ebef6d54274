// crates/growth-providers/src/profile.rs
// ============================================================================
// Module: Profile Cache
// Description: TTL-based fetch-and-replace cache over `POST /profile`
// (spec §4.3).
// Purpose: Segment/feature adapters consult a cheap in-memory snapshot
// instead of making a network round trip per evaluation; the snapshot is
// refreshed wholesale, never merged piecemeal.
// Dependencies: crate::client, crate::error, crate::wire, growth-core, growth-ir, tokio
// ============================================================================

//! ## Overview
//! The cache holds at most one [`ProfileSnapshot`] at a time. A refresh
//! replaces it atomically; until the first successful fetch completes,
//! reads see an empty snapshot (everything evaluates to "not a member" /
//! "not granted", per the evaluator's fail-closed stance). Refreshes are
//! triggered externally: on setup, after `identify`, after `reset`, and
//! after a purchase completes (spec §4.3).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::RwLock;
use std::time::Duration as StdDuration;

use bigdecimal::BigDecimal;
use growth_ir::IrValue;
use time::OffsetDateTime;
use tokio::time::timeout;

use crate::client::BackendClient;
use crate::error::ProviderError;

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// A segment the user currently belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentMembership {
    /// The segment's id.
    pub id: String,
    /// When membership began, if the server reports it.
    pub since: Option<OffsetDateTime>,
}

/// A feature grant, optionally carrying a metered value.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureGrant {
    /// The granted value, when the feature carries one (e.g. a metered
    /// balance or a remote-config payload).
    pub value: Option<IrValue>,
}

/// A point-in-time snapshot of everything `Segment`/`Feature` nodes
/// consult, plus the campaign/experiment context the journey layer and SDK
/// facade read from the same fetch-and-replace cache.
#[derive(Debug, Clone, Default)]
pub struct ProfileSnapshot {
    /// When this snapshot was fetched.
    pub fetched_at: Option<OffsetDateTime>,
    /// Current segment memberships.
    pub segments: HashMap<String, SegmentMembership>,
    /// Current feature grants.
    pub features: HashMap<String, FeatureGrant>,
    /// Campaigns currently visible to this user.
    pub campaigns: Vec<growth_core::Campaign>,
    /// Server-assigned experiment variants, keyed by experiment id.
    pub experiments: HashMap<String, String>,
}

impl ProfileSnapshot {
    fn from_wire(response: &crate::wire::ProfileResponse) -> Self {
        let segments = response
            .segments
            .iter()
            .filter_map(parse_segment)
            .map(|segment| (segment.id.clone(), segment))
            .collect();
        let features = response
            .features
            .iter()
            .filter_map(parse_feature)
            .collect();
        let campaigns = response
            .campaigns
            .iter()
            .filter_map(|raw| serde_json::from_value(raw.clone()).ok())
            .collect();
        let experiments = response
            .experiments
            .iter()
            .filter_map(parse_experiment)
            .collect();
        Self { fetched_at: Some(OffsetDateTime::now_utc()), segments, features, campaigns, experiments }
    }
}

fn parse_segment(raw: &serde_json::Value) -> Option<SegmentMembership> {
    let id = raw.get("id").and_then(serde_json::Value::as_str)?.to_string();
    let since = raw
        .get("since")
        .and_then(serde_json::Value::as_str)
        .and_then(|text| time::OffsetDateTime::parse(text, &time::format_description::well_known::Rfc3339).ok());
    Some(SegmentMembership { id, since })
}

fn parse_feature(raw: &serde_json::Value) -> Option<(String, FeatureGrant)> {
    let id = raw.get("id").and_then(serde_json::Value::as_str)?.to_string();
    let value = raw.get("value").and_then(json_to_ir_value);
    Some((id, FeatureGrant { value }))
}

fn parse_experiment(raw: &serde_json::Value) -> Option<(String, String)> {
    let experiment_id = raw.get("experiment_id").and_then(serde_json::Value::as_str)?.to_string();
    let variant_id = raw.get("variant_id").and_then(serde_json::Value::as_str)?.to_string();
    Some((experiment_id, variant_id))
}

fn json_to_ir_value(value: &serde_json::Value) -> Option<IrValue> {
    match value {
        serde_json::Value::Null => Some(IrValue::Null),
        serde_json::Value::Bool(flag) => Some(IrValue::Bool(*flag)),
        serde_json::Value::Number(number) => BigDecimal::from_str(&number.to_string()).ok().map(IrValue::Number),
        serde_json::Value::String(text) => Some(IrValue::String(text.clone())),
        serde_json::Value::Array(items) => {
            Some(IrValue::List(items.iter().filter_map(json_to_ir_value).collect()))
        }
        serde_json::Value::Object(_) => None,
    }
}

// ============================================================================
// SECTION: ProfileCache
// ============================================================================

/// How long a fetch is allowed to take before a fast-path consult gives up
/// and falls back to the stale snapshot (spec §4.3: "fetch has a
/// short-timeout variant for fast-path consults").
const FAST_PATH_TIMEOUT: StdDuration = StdDuration::from_millis(250);

/// TTL-based fetch-and-replace cache of the backend profile snapshot.
pub struct ProfileCache {
    client: Arc<BackendClient>,
    ttl: StdDuration,
    snapshot: RwLock<ProfileSnapshot>,
}

impl ProfileCache {
    /// Builds an empty cache backed by `client`, refreshed no more often
    /// than `ttl` allows for passive staleness checks (callers still decide
    /// when to force a refresh).
    #[must_use]
    pub fn new(client: Arc<BackendClient>, ttl: StdDuration) -> Self {
        Self { client, ttl, snapshot: RwLock::new(ProfileSnapshot::default()) }
    }

    /// Forces a fetch-and-replace of the snapshot for `distinct_id`.
    ///
    /// The stale snapshot remains readable to concurrent callers until this
    /// call completes (spec §4.3: "stale cache returned until replaced").
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the fetch fails; the existing snapshot
    /// is left untouched.
    pub async fn refresh(&self, distinct_id: &str, locale: Option<&str>) -> Result<(), ProviderError> {
        let response = self.client.fetch_profile(distinct_id, locale).await?;
        let fresh = ProfileSnapshot::from_wire(&response);
        let mut guard = self.snapshot.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = fresh;
        Ok(())
    }

    /// Attempts a fast, short-timeout refresh; on timeout or failure, falls
    /// back silently to whatever snapshot is already cached (spec §4.3).
    pub async fn refresh_fast_path(&self, distinct_id: &str, locale: Option<&str>) {
        let _ = timeout(FAST_PATH_TIMEOUT, self.refresh(distinct_id, locale)).await;
    }

    /// Returns whether the cached snapshot is older than `ttl`, or has
    /// never been fetched.
    #[must_use]
    pub fn is_stale(&self, now: OffsetDateTime) -> bool {
        let guard = self.snapshot.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        match guard.fetched_at {
            None => true,
            Some(fetched_at) => (now - fetched_at) > time::Duration::try_from(self.ttl).unwrap_or(time::Duration::ZERO),
        }
    }

    /// Returns a clone of the current snapshot, stale or not.
    #[must_use]
    pub fn snapshot(&self) -> ProfileSnapshot {
        self.snapshot.read().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use reqwest::Client;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;
    use wiremock::matchers::method;
    use wiremock::matchers::path;

    use super::*;

    #[tokio::test]
    async fn refresh_replaces_the_snapshot_atomically() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "campaigns": [], "experiments": [{"experiment_id": "exp_1", "variant_id": "b"}], "journeys": [],
                "segments": [{"id": "power_users"}],
                "features": [{"id": "pro_tier", "value": true}],
            })))
            .mount(&server)
            .await;

        let client = Arc::new(BackendClient::new(Client::new(), server.uri(), "key"));
        let cache = ProfileCache::new(client, StdDuration::from_secs(60));
        assert!(cache.is_stale(OffsetDateTime::now_utc()));

        cache.refresh("u1", None).await.unwrap();
        let snapshot = cache.snapshot();
        assert!(snapshot.segments.contains_key("power_users"));
        assert_eq!(snapshot.features.get("pro_tier").unwrap().value, Some(IrValue::Bool(true)));
        assert_eq!(snapshot.experiments.get("exp_1"), Some(&"b".to_string()));
        assert!(!cache.is_stale(OffsetDateTime::now_utc()));
    }

    #[tokio::test]
    async fn failed_refresh_leaves_existing_snapshot_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).and(path("/profile")).respond_with(ResponseTemplate::new(500)).mount(&server).await;

        let client = Arc::new(BackendClient::new(Client::new(), server.uri(), "key"));
        let cache = ProfileCache::new(client, StdDuration::from_secs(60));
        let result = cache.refresh("u1", None).await;
        assert!(result.is_err());
        assert!(cache.snapshot().segments.is_empty());
    }
}
