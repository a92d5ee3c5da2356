//! FLOWSCOPE core
//!
//! Edmonds-Karp maximum flow over an explicit residual graph, with a
//! stepwise engine exposing its search/augment phases, minimum cut
//! recovery and an independent flow certificate. Also ships a key-range
//! index with interchangeable ordered and hashed backings.
//!
//! ```
//! use flowscope_core::max_flow_from_matrix;
//!
//! let capacities = vec![vec![0, 3, 2], vec![0, 0, 2], vec![0, 0, 0]];
//! assert_eq!(max_flow_from_matrix(&capacities, 0, 2).unwrap(), 4);
//! ```
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

pub mod algorithm;
pub mod data_structures;
pub mod validation;

pub use algorithm::{
    compute_max_flow, max_flow, max_flow_from_matrix, AlgorithmError, ArgumentError,
    AugmentingPathFinder, Capacity, EnginePhase, FlowMetrics, FlowOutcome, MaxFlowConfig,
    MaxFlowEngine, MaxFlowResult, MinCut, NodeIndex, PathSearch, ResidualBacking, ResidualNetwork,
};
pub use data_structures::{
    par_range_sums, CapacityGraph, CapacityGraphBuilder, DenseResidualGraph, EdgeCapacity,
    FieldValue, FlowAssignment, HashRangeIndex, HashScanPolicy, OrderedRangeIndex, RangeIndex,
    Record, RecordKey, ResidualStore, SparseResidualGraph,
};
pub use validation::{CertificateReport, FlowCertificate};
