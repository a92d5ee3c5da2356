//! Network flow algorithms
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

pub mod max_flow;

pub use self::max_flow::{
    compute_max_flow, max_flow, max_flow_from_matrix, EnginePhase, FlowMetrics, FlowOutcome,
    MaxFlowConfig, MaxFlowEngine, MaxFlowResult, MinCut, ResidualBacking,
};
