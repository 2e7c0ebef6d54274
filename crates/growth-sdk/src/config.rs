// crates/growth-sdk/src/config.rs
// ============================================================================
// Module: Runtime Config Derivation
// Description: Builds each subsystem's own config struct from the one
// `SdkConfig` a caller provides at `setup()`.
// Purpose: Keep `growth-queue`/`growth-providers` ignorant of `SdkConfig`
// (neither depends on `growth-config`); this is the one seam that reads it.
// Dependencies: growth-config, growth-queue
// ============================================================================

use std::time::Duration;

use growth_config::SdkConfig;
use growth_queue::QueueConfig;

/// Derives the network queue's config from the subset of `SdkConfig` that
/// governs flushing (spec §6's flush-related table rows).
///
/// `retry_delay_ceiling` isn't itself a configuration field; it is derived
/// as the backoff delay at `max_retries` attempts, capped at 30 seconds so
/// a generous retry budget can't stall a flush indefinitely.
#[must_use]
pub fn queue_config_from(config: &SdkConfig) -> QueueConfig {
    let base_retry_delay = Duration::from_millis(config.base_retry_delay_ms);
    let ceiling = base_retry_delay
        .saturating_mul(1u32.checked_shl(config.max_retries.min(31)).unwrap_or(u32::MAX))
        .min(Duration::from_secs(30));
    QueueConfig {
        flush_at: config.flush_at,
        flush_interval: Duration::from_secs(config.flush_interval_seconds),
        max_queue_size: config.max_queue_size,
        max_batch_size: config.max_batch_size,
        max_retries: config.max_retries,
        base_retry_delay,
        retry_delay_ceiling: ceiling,
    }
}
