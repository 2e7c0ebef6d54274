// crates/growth-journey/src/error.rs
// ============================================================================
// Module: Journey Errors
// Description: The `Journey{invalidNodeType|nodeNotFound|executionFailed}`
// family from spec §7 — internal, never propagated to SDK callers.
// ============================================================================

use growth_core::NodeId;
use thiserror::Error;

/// Internal executor/service failures (spec §7: "internal; never
/// propagated externally, always downgraded to a node-local fallback plus
/// a `nodeErrored` telemetry event").
#[derive(Debug, Error)]
pub enum JourneyError {
    /// The journey's current node id has no entry in the campaign's workflow.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),
    /// A node carried a shape the executor does not recognize.
    #[error("invalid node type: {0}")]
    InvalidNodeType(String),
    /// Evaluating a node's IR condition failed.
    #[error("node execution failed: {0}")]
    ExecutionFailed(#[from] growth_ir::IrError),
    /// The journey store rejected a read or write.
    #[error("journey store error: {0}")]
    Store(#[from] growth_store::StoreError),
}
