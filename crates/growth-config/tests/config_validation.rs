// crates/growth-config/tests/config_validation.rs
// ============================================================================
// Integration test: loading and validating a full configuration document.
// ============================================================================

#![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

use growth_config::ConfigError;
use growth_config::SdkConfig;

#[test]
fn minimal_toml_document_fills_in_defaults() {
    let raw = r#"
        apiKey = "sk_live_123"
        apiEndpoint = "https://api.example.com"
        logLevel = "info"
        enableConsoleLogging = true
        enableFileLogging = false
        redactSensitiveData = true
        flushAt = 20
        flushIntervalSeconds = 30
        maxQueueSize = 1000
        maxBatchSize = 100
        maxRetries = 3
        baseRetryDelayMs = 1000
        eventLinkingPolicy = "migrateOnIdentify"
        immediateOutcomeWindowSeconds = 10
        featureCacheTtlSeconds = 60
        isDebugMode = false
    "#;

    let config = SdkConfig::from_toml_str(raw).unwrap();
    assert_eq!(config.api_key, "sk_live_123");
    assert_eq!(config.max_retries, 3);
    assert!(config.locale_identifier.is_none());
}

#[test]
fn missing_required_field_fails_to_parse() {
    let raw = r#"
        apiEndpoint = "https://api.example.com"
    "#;
    let result = SdkConfig::from_toml_str(raw);
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}
