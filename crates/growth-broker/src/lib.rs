// crates/growth-broker/src/lib.rs
// ============================================================================
// Crate: growth-broker
// Description: One-shot subscriber registry correlating an ingested event
// with its downstream outcomes.
// ============================================================================

pub mod broker;
pub mod error;
pub mod types;

pub use broker::TriggerBroker;
pub use error::BrokerError;
pub use types::Binding;
pub use types::BrokerOutcome;
pub use types::DecisionOutcome;
pub use types::EntitlementOutcome;
pub use types::FlowOutcome;
pub use types::Update;
