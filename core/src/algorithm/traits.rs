//! Core trait definitions shared by the flow engine and the range index
//!
//! This module establishes the error taxonomy, the numeric bound every
//! capacity type satisfies, and the residual-capacity capability that the
//! augmenting-path search is written against.
//!
//! # Key Design Principles
//! - Residual lookup is a capability, not a storage layout: dense matrices
//!   and adjacency lists with paired reverse arcs both implement it
//! - Argument validation happens before any mutation
//! - Errors carry the offending values, never a generic failure
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use std::fmt::{Debug, Display};
use std::ops::ControlFlow;

use num_traits::{Bounded, Signed, ToPrimitive};

/// Dense node index in `[0, N)`
pub type NodeIndex = usize;

/// Numeric type usable as an edge capacity and a signed flow value.
///
/// Signedness is required because flow is stored antisymmetrically:
/// `flow[v][u] == -flow[u][v]`.
pub trait Capacity:
    Copy + PartialOrd + Debug + Display + Signed + Bounded + ToPrimitive + Send + Sync + 'static
{
    /// Rejects NaN and infinities for float capacities. Integers always pass.
    #[inline]
    fn is_finite_value(self) -> bool {
        self.to_f64().map_or(false, f64::is_finite)
    }

    /// `self + other`, or `None` when the sum exceeds `max_value()`.
    ///
    /// Both operands are assumed non-negative.
    #[inline]
    fn checked_total(self, other: Self) -> Option<Self> {
        if self > Self::max_value() - other {
            None
        } else {
            Some(self + other)
        }
    }

    /// Residual `self - flow` of an arc with capacity `self`, saturating at
    /// `max_value()`. A reverse arc carrying the full flow of an unbounded
    /// edge can exceed the type range otherwise.
    #[inline]
    fn residual_of(self, flow: Self) -> Self {
        if flow < Self::zero() && self > Self::max_value() + flow {
            Self::max_value()
        } else {
            self - flow
        }
    }

    /// Flow on an arc of capacity `self` after pushing `amount` onto `flow`.
    ///
    /// Pushing the whole residual saturates the arc at exactly `self`, so
    /// float rounding never lifts a flow above its capacity.
    #[inline]
    fn flow_after_push(self, flow: Self, amount: Self) -> Self {
        let residual = self.residual_of(flow);
        if amount == residual && residual < Self::max_value() {
            self
        } else {
            (flow + amount).min_of(self)
        }
    }

    #[inline]
    fn min_of(self, other: Self) -> Self {
        if other < self {
            other
        } else {
            self
        }
    }
}

impl<T> Capacity for T where
    T: Copy + PartialOrd + Debug + Display + Signed + Bounded + ToPrimitive + Send + Sync + 'static
{
}

/// Malformed input detected at an operation's entry point
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArgumentError {
    #[error("graph has no nodes")]
    EmptyGraph,

    #[error("capacity matrix row {row} has {found} entries, expected {expected}")]
    RaggedMatrix { row: usize, expected: usize, found: usize },

    #[error("negative capacity {capacity} on edge {from} -> {to}")]
    NegativeCapacity { from: NodeIndex, to: NodeIndex, capacity: String },

    #[error("non-finite capacity {capacity} on edge {from} -> {to}; use an unbounded edge instead")]
    NonFiniteCapacity { from: NodeIndex, to: NodeIndex, capacity: String },

    #[error("{role} index {index} out of range for {node_count} nodes")]
    NodeOutOfRange { role: &'static str, index: NodeIndex, node_count: usize },

    #[error("source and sink are both node {node}")]
    SourceIsSink { node: NodeIndex },

    #[error("sum of finite capacities overflows the capacity type")]
    CapacityOverflow,

    #[error("sink {sink_node} is reachable from source {source_node} through unbounded edges only; the maximum flow is infinite")]
    UnboundedFlow { source_node: NodeIndex, sink_node: NodeIndex },

    #[error("inverted range: start {start} > end {end}")]
    InvertedRange { start: i64, end: i64 },

    #[error("record {key} has no numeric field `{field}`")]
    FieldNotNumeric { key: i64, field: String },

    #[error("Invalid parameter: {name} - {reason}")]
    InvalidParameter { name: String, reason: String },
}

/// Comprehensive error type for flow and index operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AlgorithmError {
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] ArgumentError),

    /// Attempt to push more than the residual capacity of an arc. Indicates a
    /// defect in path or bottleneck computation; the current run must abort.
    #[error("invariant violation: push of {requested} on {from} -> {to} exceeds residual capacity {residual}")]
    InvariantViolation {
        from: NodeIndex,
        to: NodeIndex,
        requested: String,
        residual: String,
    },

    /// The engine reached a state its transitions never produce
    #[error("invariant violation in {phase}: {reason}")]
    StateInvariant { phase: String, reason: &'static str },

    #[error("key {key} not found")]
    KeyNotFound { key: i64 },
}

impl AlgorithmError {
    pub(crate) fn invariant<C: Capacity>(from: NodeIndex, to: NodeIndex, requested: C, residual: C) -> Self {
        Self::InvariantViolation {
            from,
            to,
            requested: requested.to_string(),
            residual: residual.to_string(),
        }
    }
}

/// Validates a node index against the node count
pub(crate) fn check_node(role: &'static str, index: NodeIndex, node_count: usize) -> Result<(), AlgorithmError> {
    if index >= node_count {
        return Err(ArgumentError::NodeOutOfRange { role, index, node_count }.into());
    }
    Ok(())
}

/// Validates a source/sink pair for a network of `node_count` nodes
pub(crate) fn check_terminals(
    source: NodeIndex,
    sink: NodeIndex,
    node_count: usize,
) -> Result<(), AlgorithmError> {
    if node_count == 0 {
        return Err(ArgumentError::EmptyGraph.into());
    }
    check_node("source", source, node_count)?;
    check_node("sink", sink, node_count)?;
    if source == sink {
        return Err(ArgumentError::SourceIsSink { node: source }.into());
    }
    Ok(())
}

/// Residual-capacity view of a flow network.
///
/// # Invariants
/// - `flow(u, v) == -flow(v, u)` for every pair, at every step
/// - `residual_capacity(u, v) == capacity(u, v) - flow(u, v) >= 0`
pub trait ResidualNetwork<C: Capacity> {
    /// Number of nodes
    fn node_count(&self) -> usize;

    /// Original capacity of the ordered pair, zero when there is no edge
    fn capacity(&self, from: NodeIndex, to: NodeIndex) -> C;

    /// Current signed flow on the ordered pair
    fn flow(&self, from: NodeIndex, to: NodeIndex) -> C;

    /// Remaining capacity `capacity - flow`
    fn residual_capacity(&self, from: NodeIndex, to: NodeIndex) -> C {
        self.capacity(from, to).residual_of(self.flow(from, to))
    }

    /// Visits every `(to, residual)` with strictly positive residual capacity
    /// leaving `from`, in increasing `to` order. Stops when `visit` breaks.
    fn for_each_residual_arc<F>(&self, from: NodeIndex, visit: F) -> ControlFlow<()>
    where
        F: FnMut(NodeIndex, C) -> ControlFlow<()>;

    /// Adds `amount` to `flow(from, to)` and subtracts it from `flow(to, from)`.
    ///
    /// Fails with [`AlgorithmError::InvariantViolation`] when `amount` is
    /// negative or exceeds the residual capacity; the network is left untouched.
    fn push_flow(&mut self, from: NodeIndex, to: NodeIndex, amount: C) -> Result<(), AlgorithmError>;

    /// Every ordered pair carrying strictly positive flow, sorted by `(from, to)`
    fn positive_flows(&self) -> Vec<(NodeIndex, NodeIndex, C)>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finite_value_detection() {
        assert!(5_i64.is_finite_value());
        assert!(2.5_f64.is_finite_value());
        assert!(!f64::NAN.is_finite_value());
        assert!(!f64::INFINITY.is_finite_value());
    }

    #[test]
    fn test_checked_total_overflow() {
        assert_eq!(3_i32.checked_total(4), Some(7));
        assert_eq!(i32::MAX.checked_total(1), None);
        assert_eq!((i64::MAX - 1).checked_total(1), Some(i64::MAX));
    }

    #[test]
    fn test_residual_saturates_instead_of_overflowing() {
        assert_eq!(7_i32.residual_of(3), 4);
        assert_eq!(0_i32.residual_of(-5), 5);
        assert_eq!(1_100_000_003_i32.residual_of(-1_100_000_000), i32::MAX);
    }

    #[test]
    fn test_full_push_lands_exactly_on_capacity() {
        let flow = 0.1 + 0.2;
        let capacity = 7.2_f64;
        let residual = capacity.residual_of(flow);
        assert_eq!(capacity.flow_after_push(flow, residual), capacity);
        assert_eq!(capacity.flow_after_push(0.0, 2.5), 2.5);
        assert_eq!(10_i64.flow_after_push(4, 6), 10);
    }

    #[test]
    fn test_terminal_validation() {
        assert!(check_terminals(0, 3, 4).is_ok());
        assert_eq!(
            check_terminals(1, 1, 4),
            Err(AlgorithmError::InvalidArgument(ArgumentError::SourceIsSink { node: 1 }))
        );
        assert_eq!(
            check_terminals(0, 9, 4),
            Err(AlgorithmError::InvalidArgument(ArgumentError::NodeOutOfRange {
                role: "sink",
                index: 9,
                node_count: 4,
            }))
        );
        assert_eq!(
            check_terminals(0, 0, 0),
            Err(AlgorithmError::InvalidArgument(ArgumentError::EmptyGraph))
        );
    }

    #[test]
    fn test_error_messages_name_offending_values() {
        let err: AlgorithmError = ArgumentError::NegativeCapacity {
            from: 2,
            to: 5,
            capacity: "-3".to_string(),
        }
        .into();
        let message = err.to_string();
        assert!(message.contains("-3"));
        assert!(message.contains("2 -> 5"));
    }
}
