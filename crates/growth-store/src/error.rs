// crates/growth-store/src/error.rs
// ============================================================================
// Module: Store Errors
// ============================================================================

use thiserror::Error;

/// Errors raised by the event store and journey store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying SQLite connection returned an error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored row's JSON payload failed to deserialize.
    #[error("corrupt row payload: {0}")]
    CorruptPayload(#[from] serde_json::Error),
    /// A stored timestamp column failed to parse.
    #[error("corrupt timestamp: {0}")]
    CorruptTimestamp(#[from] time::error::Parse),
}
