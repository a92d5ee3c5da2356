//! Graph, residual and index storage
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

pub mod graph;
pub mod residual;
pub mod range_index;

pub use self::graph::{CapacityGraph, CapacityGraphBuilder, EdgeCapacity, NodeNames};
pub use self::residual::{
    DenseResidualGraph, EdgeFlow, FlowArc, FlowAssignment, ResidualStore, SparseResidualGraph,
};
pub use self::range_index::{
    par_range_sums, FieldValue, HashRangeIndex, HashScanPolicy, OrderedRangeIndex, RangeIndex,
    Record, RecordKey,
};
