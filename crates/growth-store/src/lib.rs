// crates/growth-store/src/lib.rs
// ============================================================================
// Crate: growth-store
// Description: SQLite-backed durable storage for the event history and
// live/completed journeys.
// ============================================================================

//! Single-writer-per-connection storage (spec §5: "Event Store ... behave
//! as if serialized by an internal mailbox"). Each store type owns a
//! [`rusqlite::Connection`] behind a mutex rather than assuming the caller
//! serializes access.

pub mod error;
pub mod event_store;
pub mod history;
pub mod identity_store;
pub mod journey_store;
pub mod schema;

pub use error::StoreError;
pub use event_store::EventStore;
pub use history::CurrentUser;
pub use history::StoreBackedHistory;
pub use identity_store::IdentityStore;
pub use journey_store::JourneyStore;
pub use schema::init as init_schema;
