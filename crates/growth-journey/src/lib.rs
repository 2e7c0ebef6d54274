// crates/growth-journey/src/lib.rs
// ============================================================================
// Crate: growth-journey
// Description: The journey executor and service: pure per-node execution
// plus the orchestrator that drives one live journey per enrollment
// through enrollment, runtime, and completion.
// ============================================================================

//! Owns no network transport and no storage schema of its own: persistence
//! goes through `growth-store`, outbound delivery through the ports in
//! [`ports`], implemented elsewhere (`growth-providers`, `growth-queue`,
//! `growth-broker`) and injected as trait objects so this crate stays
//! decoupled from how a flow is actually presented or an event actually
//! leaves the process.

pub mod adapt;
pub mod bucketing;
pub mod error;
pub mod executor;
pub mod ports;
pub mod service;
pub mod time_window;

pub use error::JourneyError;
pub use executor::execute_node;
pub use executor::ExecutorContext;
pub use executor::NodeExecutionResult;
pub use executor::ResumeReason;
pub use ports::CustomerUpdater;
pub use ports::DelegatePort;
pub use ports::EventSink;
pub use ports::ExperimentAssignments;
pub use ports::FlowPresenter;
pub use ports::OutcomeBinder;
pub use service::JourneyService;
