// crates/growth-queue/src/config.rs
// ============================================================================
// Module: Queue Configuration
// Description: The size/timing/retry knobs from spec §6's configuration
// table, scoped to the network queue.
// ============================================================================

use std::time::Duration;

/// Configuration for a [`crate::NetworkQueue`] (spec §4.2, §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Events buffered before an auto-flush triggers.
    pub flush_at: usize,
    /// Periodic flush cadence.
    pub flush_interval: Duration,
    /// Maximum events held at once; overflow drops oldest-first.
    pub max_queue_size: usize,
    /// Maximum events drained into a single flush request.
    pub max_batch_size: usize,
    /// Retry budget for a single flush's batch.
    pub max_retries: u32,
    /// Base delay for exponential backoff (`base * 2^attempt`).
    pub base_retry_delay: Duration,
    /// Upper bound on any single backoff delay.
    pub retry_delay_ceiling: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            flush_at: 20,
            flush_interval: Duration::from_secs(30),
            max_queue_size: 1_000,
            max_batch_size: 100,
            max_retries: 3,
            base_retry_delay: Duration::from_secs(1),
            retry_delay_ceiling: Duration::from_secs(30),
        }
    }
}
