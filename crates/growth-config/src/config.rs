// crates/growth-config/src/config.rs
// ============================================================================
// Module: SDK Configuration
// Description: The full configuration surface from spec §6's table, plus
// validation and TOML loading.
// Purpose: One typed, validated shape that every subsystem (logger, queue,
// identity, profile cache, broker) is built from at `setup()` time.
// Dependencies: crate::error, serde, toml
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigError;

// ============================================================================
// SECTION: Sub-enums
// ============================================================================

/// Console/file logging verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Diagnostic detail, never enabled in production builds.
    Trace,
    /// Development-time detail.
    Debug,
    /// Normal operational messages.
    Info,
    /// Unexpected but recoverable conditions.
    Warn,
    /// Failures that were not recovered from.
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// Whether events recorded before `identify` stay under the anonymous id
/// or are folded into the identified user (spec §4.3).
///
/// This is the wire/config-file representation (camelCase, matching every
/// other key in this table); [`growth_core::EventLinkingPolicy`] is the
/// domain type the identity layer actually runs on, converted via [`From`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventLinkingPolicy {
    /// Past anonymous events stay attributed to the anonymous id.
    KeepSeparate,
    /// Past anonymous events are reassigned to the newly identified id.
    MigrateOnIdentify,
}

impl From<EventLinkingPolicy> for growth_core::EventLinkingPolicy {
    fn from(value: EventLinkingPolicy) -> Self {
        match value {
            EventLinkingPolicy::KeepSeparate => Self::KeepSeparate,
            EventLinkingPolicy::MigrateOnIdentify => Self::MigrateOnIdentify,
        }
    }
}

// ============================================================================
// SECTION: SdkConfig
// ============================================================================

/// The complete, validated SDK configuration (spec §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkConfig {
    /// Backend API key.
    pub api_key: String,
    /// Backend base URL.
    pub api_endpoint: String,
    /// Minimum level emitted by the logger.
    pub log_level: LogLevel,
    /// Whether the logger writes to stdout/stderr.
    pub enable_console_logging: bool,
    /// Whether the logger writes to a rotating file.
    pub enable_file_logging: bool,
    /// Whether the logger redacts property values flagged as sensitive.
    pub redact_sensitive_data: bool,
    /// Events buffered before an auto-flush triggers.
    pub flush_at: usize,
    /// Periodic flush cadence, in seconds.
    pub flush_interval_seconds: u64,
    /// Maximum events held in the network queue.
    pub max_queue_size: usize,
    /// Maximum events drained into a single flush request.
    pub max_batch_size: usize,
    /// Retry budget for a single flush's batch.
    pub max_retries: u32,
    /// Base delay, in milliseconds, for exponential backoff.
    pub base_retry_delay_ms: u64,
    /// How past anonymous events are handled across an `identify` call.
    pub event_linking_policy: EventLinkingPolicy,
    /// How long `track()`'s completion callback waits for an immediate
    /// outcome before resolving `noInteraction` (spec §4.4, §6).
    pub immediate_outcome_window_seconds: i64,
    /// TTL for the real-time feature-check cache.
    pub feature_cache_ttl_seconds: u64,
    /// Locale hint sent on profile fetches.
    pub locale_identifier: Option<String>,
    /// Bypasses the flow/profile cache, forcing a fresh fetch per check
    /// (spec §6: "Bypass flow cache").
    pub is_debug_mode: bool,
}

impl SdkConfig {
    /// Starts building a config with every non-required field at its
    /// spec-documented default.
    #[must_use]
    pub fn builder(api_key: impl Into<String>, api_endpoint: impl Into<String>) -> SdkConfigBuilder {
        SdkConfigBuilder::new(api_key, api_endpoint)
    }

    /// Parses a [`SdkConfig`] from a TOML document, then validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML, or
    /// [`ConfigError::InvalidConfiguration`] if the parsed value fails
    /// validation.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a [`SdkConfig`] from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or the
    /// errors documented on [`Self::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Validates invariants `setup()` must reject before constructing any
    /// subsystem (spec §7: `InvalidConfiguration`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConfiguration`] describing the first
    /// violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::InvalidConfiguration("apiKey must not be empty".to_string()));
        }
        if self.api_endpoint.trim().is_empty() {
            return Err(ConfigError::InvalidConfiguration("apiEndpoint must not be empty".to_string()));
        }
        if self.flush_at == 0 {
            return Err(ConfigError::InvalidConfiguration("flushAt must be at least 1".to_string()));
        }
        if self.max_batch_size == 0 {
            return Err(ConfigError::InvalidConfiguration("maxBatchSize must be at least 1".to_string()));
        }
        if self.max_queue_size < self.max_batch_size {
            return Err(ConfigError::InvalidConfiguration(
                "maxQueueSize must be at least maxBatchSize".to_string(),
            ));
        }
        if self.immediate_outcome_window_seconds <= 0 {
            return Err(ConfigError::InvalidConfiguration(
                "immediateOutcomeWindowSeconds must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns [`Self::flush_interval_seconds`] as a [`Duration`].
    #[must_use]
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_seconds)
    }

    /// Returns [`Self::base_retry_delay_ms`] as a [`Duration`].
    #[must_use]
    pub fn base_retry_delay(&self) -> Duration {
        Duration::from_millis(self.base_retry_delay_ms)
    }

    /// Returns [`Self::feature_cache_ttl_seconds`] as a [`Duration`].
    #[must_use]
    pub fn feature_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.feature_cache_ttl_seconds)
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builder for [`SdkConfig`], seeded with the spec's documented defaults.
#[derive(Debug, Clone)]
pub struct SdkConfigBuilder {
    config: SdkConfig,
}

impl SdkConfigBuilder {
    fn new(api_key: impl Into<String>, api_endpoint: impl Into<String>) -> Self {
        Self {
            config: SdkConfig {
                api_key: api_key.into(),
                api_endpoint: api_endpoint.into(),
                log_level: LogLevel::Info,
                enable_console_logging: true,
                enable_file_logging: false,
                redact_sensitive_data: true,
                flush_at: 20,
                flush_interval_seconds: 30,
                max_queue_size: 1_000,
                max_batch_size: 100,
                max_retries: 3,
                base_retry_delay_ms: 1_000,
                event_linking_policy: EventLinkingPolicy::MigrateOnIdentify,
                immediate_outcome_window_seconds: 10,
                feature_cache_ttl_seconds: 60,
                locale_identifier: None,
                is_debug_mode: false,
            },
        }
    }

    /// Overrides the logger's minimum level.
    #[must_use]
    pub fn log_level(mut self, value: LogLevel) -> Self {
        self.config.log_level = value;
        self
    }

    /// Overrides console logging.
    #[must_use]
    pub fn enable_console_logging(mut self, value: bool) -> Self {
        self.config.enable_console_logging = value;
        self
    }

    /// Overrides file logging.
    #[must_use]
    pub fn enable_file_logging(mut self, value: bool) -> Self {
        self.config.enable_file_logging = value;
        self
    }

    /// Overrides the network queue's flush threshold.
    #[must_use]
    pub fn flush_at(mut self, value: usize) -> Self {
        self.config.flush_at = value;
        self
    }

    /// Overrides the network queue's flush cadence.
    #[must_use]
    pub fn flush_interval_seconds(mut self, value: u64) -> Self {
        self.config.flush_interval_seconds = value;
        self
    }

    /// Overrides the network queue's size cap.
    #[must_use]
    pub fn max_queue_size(mut self, value: usize) -> Self {
        self.config.max_queue_size = value;
        self
    }

    /// Overrides the network queue's per-flush batch cap.
    #[must_use]
    pub fn max_batch_size(mut self, value: usize) -> Self {
        self.config.max_batch_size = value;
        self
    }

    /// Overrides the network queue's retry budget.
    #[must_use]
    pub fn max_retries(mut self, value: u32) -> Self {
        self.config.max_retries = value;
        self
    }

    /// Overrides the event-linking policy applied across `identify`.
    #[must_use]
    pub fn event_linking_policy(mut self, value: EventLinkingPolicy) -> Self {
        self.config.event_linking_policy = value;
        self
    }

    /// Overrides the broker's immediate-outcome timeout.
    #[must_use]
    pub fn immediate_outcome_window_seconds(mut self, value: i64) -> Self {
        self.config.immediate_outcome_window_seconds = value;
        self
    }

    /// Overrides the feature-check cache TTL.
    #[must_use]
    pub fn feature_cache_ttl_seconds(mut self, value: u64) -> Self {
        self.config.feature_cache_ttl_seconds = value;
        self
    }

    /// Overrides the locale sent on profile fetches.
    #[must_use]
    pub fn locale_identifier(mut self, value: impl Into<String>) -> Self {
        self.config.locale_identifier = Some(value.into());
        self
    }

    /// Enables debug mode, bypassing the flow cache.
    #[must_use]
    pub fn debug_mode(mut self, value: bool) -> Self {
        self.config.is_debug_mode = value;
        self
    }

    /// Validates and builds the [`SdkConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConfiguration`] if any invariant in
    /// [`SdkConfig::validate`] is violated.
    pub fn build(self) -> Result<SdkConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_spec_defaults() {
        let config = SdkConfig::builder("key", "https://api.example.com").build().unwrap();
        assert_eq!(config.flush_interval_seconds, 30);
        assert_eq!(config.event_linking_policy, EventLinkingPolicy::MigrateOnIdentify);
        assert!(config.redact_sensitive_data);
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let result = SdkConfig::builder("", "https://api.example.com").build();
        assert!(matches!(result, Err(ConfigError::InvalidConfiguration(_))));
    }

    #[test]
    fn queue_smaller_than_batch_is_rejected() {
        let result = SdkConfig::builder("key", "https://api.example.com").max_queue_size(5).max_batch_size(10).build();
        assert!(matches!(result, Err(ConfigError::InvalidConfiguration(_))));
    }

    #[test]
    fn toml_round_trips_through_validation() {
        let config = SdkConfig::builder("key", "https://api.example.com").build().unwrap();
        let serialized = toml::to_string(&config).unwrap();
        let parsed = SdkConfig::from_toml_str(&serialized).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn duration_accessors_convert_from_seconds() {
        let config = SdkConfig::builder("key", "https://api.example.com").flush_interval_seconds(45).build().unwrap();
        assert_eq!(config.flush_interval(), Duration::from_secs(45));
    }
}
