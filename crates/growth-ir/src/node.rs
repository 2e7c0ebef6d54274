// crates/growth-ir/src/node.rs
// ============================================================================
// Module: IR Node Tree
// Description: The compiled expression tree published by the backend and
// the predicate sub-language nested inside event-history queries.
// Purpose: One typed AST shared by campaign triggers, branch conditions,
// and wait-until predicates (spec §4.1).
// Dependencies: crate::value, serde
// ============================================================================

//! ## Overview
//! An [`IrEnvelope`] wraps a versioned [`IrNode`] tree. Boolean composition,
//! comparisons, property reads, adapter-backed segment/feature checks, and
//! event-history queries are all nodes in the same tree so a `Compare` can
//! take the result of an `Events.Count` as an operand.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::value::IrValue;

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// The current envelope version this evaluator understands.
pub const CURRENT_VERSION: u32 = 1;

/// A versioned, compiled expression tree (spec §4.1: "Given an IR envelope
/// `{version, expr}`").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrEnvelope {
    /// Envelope format version.
    pub version: u32,
    /// The compiled expression.
    pub expr: IrNode,
}

impl IrEnvelope {
    /// Wraps an expression at [`CURRENT_VERSION`].
    #[must_use]
    pub const fn new(expr: IrNode) -> Self {
        Self { version: CURRENT_VERSION, expr }
    }
}

// ============================================================================
// SECTION: Comparison operator
// ============================================================================

/// Comparison operator shared by `Compare`, `User`, `Event`, and `Feature`
/// nodes (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    Neq,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `in`
    In,
    /// `not_in`
    NotIn,
}

// ============================================================================
// SECTION: Node tree
// ============================================================================

/// A node in the compiled expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum IrNode {
    /// A literal scalar or container value.
    Literal(IrValue),
    /// Logical conjunction; `true` on an empty list (vacuous truth).
    And(Vec<IrNode>),
    /// Logical disjunction; `false` on an empty list.
    Or(Vec<IrNode>),
    /// Logical negation.
    Not(Box<IrNode>),
    /// Generic comparison between two evaluated operands.
    Compare {
        /// Comparison operator.
        op: CompareOp,
        /// Left operand.
        left: Box<IrNode>,
        /// Right operand.
        right: Box<IrNode>,
    },
    /// Reads a property from the current user's profile, optionally
    /// comparing it to `value` (absent for a bare existence check).
    User {
        /// Comparison operator.
        op: CompareOp,
        /// Property key.
        key: String,
        /// Right-hand operand, when this node is a comparison.
        value: Option<Box<IrNode>>,
    },
    /// Reads a property from the current triggering event, optionally
    /// comparing it to `value`.
    Event {
        /// Comparison operator.
        op: CompareOp,
        /// Property key.
        key: String,
        /// Right-hand operand, when this node is a comparison.
        value: Option<Box<IrNode>>,
    },
    /// Consults the segment adapter for membership.
    Segment {
        /// `Eq` means "is a member", `Neq` means "is not a member".
        op: CompareOp,
        /// Segment identifier.
        id: String,
        /// Restricts membership evaluation to within this many seconds of
        /// `now`, when present.
        within: Option<i64>,
    },
    /// Consults the feature adapter for an entitlement's value.
    Feature {
        /// Comparison operator.
        op: CompareOp,
        /// Feature identifier.
        id: String,
        /// Right-hand operand, when this node is a comparison (absent for
        /// a bare "is granted" check).
        value: Option<Box<IrNode>>,
    },
    /// An event-history query.
    Events(EventHistoryQuery),
    /// The current evaluation instant.
    TimeNow,
    /// `now - duration` seconds.
    TimeAgo(i64),
    /// A rolling window boundary: `value` units of `interval` ago.
    TimeWindow {
        /// Magnitude.
        value: i64,
        /// Unit the magnitude is expressed in.
        interval: IntervalUnit,
    },
    /// The id of the journey currently being evaluated, if any.
    JourneyId,
}

/// A calendar/duration unit used by `Time.Window` and `ActivePeriods`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalUnit {
    /// Seconds.
    Second,
    /// Minutes.
    Minute,
    /// Hours.
    Hour,
    /// Days.
    Day,
    /// Weeks.
    Week,
}

impl IntervalUnit {
    /// Returns the unit's length in whole seconds.
    #[must_use]
    pub const fn seconds(self) -> i64 {
        match self {
            Self::Second => 1,
            Self::Minute => 60,
            Self::Hour => 3_600,
            Self::Day => 86_400,
            Self::Week => 604_800,
        }
    }
}

// ============================================================================
// SECTION: Event history queries
// ============================================================================

/// An `Events.*` query over the event-history adapter (spec §4.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventHistoryQuery {
    /// The target event name.
    pub event_name: String,
    /// Only consider events at or after this many seconds before `now`.
    pub since: Option<i64>,
    /// Only consider events at or before this many seconds before `now`.
    pub until: Option<i64>,
    /// Equivalent to `since = within`, `until = None`; kept distinct so
    /// adapters can optimize a "last N seconds" query.
    pub within: Option<i64>,
    /// Predicate narrowing which matching events count, evaluated against
    /// each candidate event's properties.
    #[serde(rename = "where")]
    pub where_: Option<PredNode>,
    /// The specific query being asked.
    pub kind: EventHistoryKind,
}

/// The kind of `Events.*` query (spec §4.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventHistoryKind {
    /// Whether any matching event exists.
    Exists,
    /// The count of matching events.
    Count,
    /// The timestamp of the earliest matching event.
    FirstTime,
    /// The timestamp of the latest matching event.
    LastTime,
    /// Seconds between `now` and the latest matching event.
    LastAge,
    /// Aggregates a numeric property across matching events.
    Aggregate {
        /// The aggregation function.
        op: AggregateOp,
        /// The property key to aggregate.
        key: String,
    },
    /// Whether events named in `names` occurred, in that order (not
    /// necessarily contiguously), within the query's window.
    InOrder {
        /// Event names, in required order.
        names: Vec<String>,
    },
    /// Whether the user was active in at least `min` of the last `total`
    /// periods of length `period`.
    ActivePeriods {
        /// Period length.
        period: IntervalUnit,
        /// Number of trailing periods to consider.
        total: i64,
        /// Minimum number of those periods with at least one matching event.
        min: i64,
    },
    /// Whether the user has been inactive (no matching event) for at
    /// least `inactive_for` seconds.
    Stopped {
        /// Required inactivity window, in seconds.
        inactive_for: i64,
    },
    /// Whether the user went inactive for `inactive_for` seconds and then
    /// resumed within `within` seconds of the inactivity ending.
    Restarted {
        /// Required inactivity window, in seconds.
        inactive_for: i64,
        /// Window after inactivity ends in which resumption must occur.
        within: i64,
    },
}

/// Numeric aggregation function for `Events.Aggregate` (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateOp {
    /// Sum of the property across matching events.
    Sum,
    /// Arithmetic mean of the property across matching events.
    Avg,
    /// Minimum observed value.
    Min,
    /// Maximum observed value.
    Max,
    /// Count of distinct observed values.
    Unique,
}

// ============================================================================
// SECTION: Predicate sub-language
// ============================================================================

/// A predicate over a single candidate event's properties, used by the
/// `where` clause of an `Events.*` query (spec §4.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pred", rename_all = "snake_case")]
pub enum PredNode {
    /// A single-key atom.
    Atom {
        /// Property key the atom reads.
        key: String,
        /// The atom's comparison.
        op: PredOp,
    },
    /// Conjunction of sub-predicates.
    And(Vec<PredNode>),
    /// Disjunction of sub-predicates.
    Or(Vec<PredNode>),
}

/// A predicate atom operator (spec §4.1: "atoms `{is_set, is_not_set, eq,
/// neq, gt, gte, lt, lte, icontains, contains, regex, in, not_in,
/// is_date_exact, is_date_after, is_date_before}`").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "arg", rename_all = "snake_case")]
pub enum PredOp {
    /// Property is present and not semantically empty.
    IsSet,
    /// Property is absent or semantically empty.
    IsNotSet,
    /// Equal, using the evaluator's coercion chain.
    Eq(IrValue),
    /// Not equal.
    Neq(IrValue),
    /// Greater than.
    Gt(IrValue),
    /// Greater than or equal.
    Gte(IrValue),
    /// Less than.
    Lt(IrValue),
    /// Less than or equal.
    Lte(IrValue),
    /// Case-insensitive substring match (also matches list elements).
    Icontains(IrValue),
    /// Case-sensitive substring match (also matches list elements).
    Contains(IrValue),
    /// Regular expression match against the string form of the property.
    Regex(String),
    /// Membership in a list, with per-element coercion.
    In(Vec<IrValue>),
    /// Non-membership in a list.
    NotIn(Vec<IrValue>),
    /// Same calendar day, floored in the evaluator's timezone.
    IsDateExact(IrValue),
    /// Strictly after the given date.
    IsDateAfter(IrValue),
    /// Strictly before the given date.
    IsDateBefore(IrValue),
}
