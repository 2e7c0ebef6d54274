// crates/growth-core/src/error.rs
// ============================================================================
// Module: Growth Core Errors
// Description: Errors raised by the core data model's own validation.
// Purpose: Kept intentionally small: most error surface lives in the
// crates that do I/O (`growth-store`, `growth-providers`, `growth-queue`);
// this crate's types are mostly infallible to construct.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

/// Errors raised by growth-core's own data model operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A timestamp could not be formatted (see [`crate::time::TimeFormatError`]).
    #[error(transparent)]
    Time(#[from] crate::time::TimeFormatError),
    /// A workflow referenced a node id that does not exist in its graph.
    #[error("workflow has no node with id {0}")]
    UnknownNode(String),
}
