// crates/growth-ir/src/error.rs
// ============================================================================
// Module: IR Error
// Description: Evaluation-time errors surfaced by node evaluation and
// adapter calls.
// Purpose: Give callers a typed error while keeping predicate evaluation
// itself fail-closed (spec §4.1/§9: evaluator errors never propagate past
// a predicate boundary, they downgrade to `false`).
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

/// Errors raised while evaluating an IR node.
#[derive(Debug, Error)]
pub enum IrError {
    /// An adapter (segment, feature, or event-history) call failed.
    #[error("adapter call failed: {0}")]
    Adapter(String),
    /// A node referenced a property or query that could not be resolved to
    /// a well-typed value (e.g. `Aggregate` over a non-numeric property).
    #[error("could not evaluate node: {0}")]
    InvalidNode(String),
    /// The envelope's `version` is not one this evaluator understands.
    #[error("unsupported IR version: {0}")]
    UnsupportedVersion(u32),
    /// A `regex` predicate atom failed to compile; per spec this is
    /// handled by callers as `false`, not as a hard error, but the
    /// evaluator still reports it so callers can log it.
    #[error("invalid regex pattern: {0}")]
    InvalidRegex(String),
}
