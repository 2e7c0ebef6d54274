// crates/growth-broker/src/error.rs
// ============================================================================
// Module: Broker Errors
// ============================================================================

use thiserror::Error;

/// Errors raised by the trigger broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// `emit` or `bind` referenced an event id with no active subscription.
    #[error("no subscription registered for event {0}")]
    UnknownSubscription(String),
}
