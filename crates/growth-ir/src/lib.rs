// crates/growth-ir/src/lib.rs
// ============================================================================
// Crate: growth-ir
// Description: Typed expression engine for campaign triggers, segment
// membership, branch conditions, and wait-until predicates.
// ============================================================================

//! A small, reentrant expression evaluator. The node tree ([`node::IrNode`])
//! is the wire format a backend publishes; evaluating it against an
//! [`context::EvalContext`] never touches ambient state directly: the clock
//! reading and every adapter answer are supplied by the caller, so a given
//! `(envelope, context)` pair always evaluates the same way.

pub mod context;
pub mod error;
pub mod eval;
pub mod node;
pub mod predicate;
pub mod value;

pub use context::EvalContext;
pub use context::EventHistoryAdapter;
pub use context::EventView;
pub use context::FeatureAdapter;
pub use context::SegmentAdapter;
pub use context::UserView;
pub use error::IrError;
pub use eval::evaluate;
pub use eval::evaluate_predicate;
pub use node::AggregateOp;
pub use node::CompareOp;
pub use node::EventHistoryKind;
pub use node::EventHistoryQuery;
pub use node::IntervalUnit;
pub use node::IrEnvelope;
pub use node::IrNode;
pub use node::PredNode;
pub use node::PredOp;
pub use node::CURRENT_VERSION;
pub use value::IrValue;
