//! Edmonds-Karp Maximum Flow Engine
//!
//! This module computes the exact maximum flow between a source and a sink
//! of a [`CapacityGraph`] by repeated breadth-first augmentation over a
//! residual network. The engine is an explicit state machine:
//!
//! ```text
//! INIT -> (SEARCH -> AUGMENT)* -> DONE
//! ```
//!
//! - `INIT`: flow state allocated as all-zero
//! - `SEARCH`: one BFS for an augmenting path; none found means `DONE`
//! - `AUGMENT`: push the path bottleneck along every arc of the path,
//!   add it to the running total, return to `SEARCH`
//! - `DONE`: the running total is the answer
//!
//! # Optimality
//! A flow admitting no augmenting path has value equal to the capacity of
//! the minimum cut separating source and sink. The cut is recovered from
//! the final residual network as the set of nodes still reachable from the
//! source.
//!
//! # Non-uniqueness
//! The flow value is deterministic; the per-edge decomposition generally
//! is not unique. Callers should inspect totals and invariants, not a
//! particular split.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::algorithm::path_finding::bfs::AugmentingPathFinder;
use crate::algorithm::traits::{check_terminals, AlgorithmError, ArgumentError, Capacity, NodeIndex, ResidualNetwork};
use crate::data_structures::graph::CapacityGraph;
use crate::data_structures::residual::{DenseResidualGraph, FlowAssignment, ResidualStore, SparseResidualGraph};

/// Residual storage used by a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidualBacking {
    /// `N x N` matrices
    #[default]
    Dense,
    /// Adjacency lists with paired reverse arcs
    Sparse,
}

impl ResidualBacking {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dense => "dense",
            Self::Sparse => "sparse",
        }
    }
}

impl FromStr for ResidualBacking {
    type Err = AlgorithmError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dense" => Ok(Self::Dense),
            "sparse" => Ok(Self::Sparse),
            other => Err(ArgumentError::InvalidParameter {
                name: "backing".to_string(),
                reason: format!("expected `dense` or `sparse`, got `{}`", other),
            }
            .into()),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaxFlowConfig {
    pub backing: ResidualBacking,
    /// Stop after this many augmentations. A run cut short reports
    /// [`FlowOutcome::LowerBound`] instead of an exact value.
    pub max_augmentations: Option<usize>,
}

impl MaxFlowConfig {
    pub fn with_backing(mut self, backing: ResidualBacking) -> Self {
        self.backing = backing;
        self
    }

    pub fn with_max_augmentations(mut self, limit: usize) -> Self {
        self.max_augmentations = Some(limit);
        self
    }

    /// Sets a parameter from its string form
    pub fn set_parameter(&mut self, name: &str, value: &str) -> Result<(), AlgorithmError> {
        match name {
            "backing" => {
                self.backing = value.parse()?;
                Ok(())
            }
            "max_augmentations" => {
                if value.trim().eq_ignore_ascii_case("none") {
                    self.max_augmentations = None;
                    return Ok(());
                }
                let limit = value.trim().parse::<usize>().map_err(|_| ArgumentError::InvalidParameter {
                    name: name.to_string(),
                    reason: "max_augmentations must be a non-negative integer or `none`".to_string(),
                })?;
                self.max_augmentations = Some(limit);
                Ok(())
            }
            _ => Err(ArgumentError::InvalidParameter {
                name: name.to_string(),
                reason: format!("Unknown parameter: {}", name),
            }
            .into()),
        }
    }

    pub fn get_parameter(&self, name: &str) -> Option<String> {
        match name {
            "backing" => Some(self.backing.as_str().to_string()),
            "max_augmentations" => Some(
                self.max_augmentations
                    .map_or_else(|| "none".to_string(), |limit| limit.to_string()),
            ),
            _ => None,
        }
    }
}

/// Engine state machine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnginePhase {
    Init,
    Search,
    Augment,
    Done,
}

impl fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::Search => "SEARCH",
            Self::Augment => "AUGMENT",
            Self::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// Whether the reported value is the maximum or only a lower bound on it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowOutcome {
    /// Terminated with no augmenting path left
    Exact,
    /// Stopped by the augmentation limit while a path still existed
    LowerBound,
}

/// Minimum cut recovered from the final residual network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinCut<C> {
    /// Nodes reachable from the source, ascending
    pub source_side: Vec<NodeIndex>,
    /// Edges leaving the source side, all saturated
    pub cut_edges: Vec<(NodeIndex, NodeIndex, C)>,
    /// Sum of `cut_edges` capacities; equals the maximum flow
    pub capacity: C,
}

/// Flow algorithm performance metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowMetrics<C> {
    /// Number of augmenting paths applied
    pub augmentations: usize,
    /// Number of BFS searches, including the final unsuccessful one
    pub searches: usize,
    /// Nodes dequeued across all searches
    pub nodes_explored: usize,
    /// Bottleneck of each augmentation, in order
    pub bottlenecks: Vec<C>,
}

/// Maximum flow result with detailed flow information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaxFlowResult<C> {
    /// Maximum flow value (a lower bound when `outcome` is `LowerBound`)
    pub max_flow: C,
    pub outcome: FlowOutcome,
    /// Final per-edge flow
    pub flow: FlowAssignment<C>,
    /// Present only for exact outcomes
    pub min_cut: Option<MinCut<C>>,
    pub metrics: FlowMetrics<C>,
    /// Every phase entered, starting with `Init`
    pub phase_history: Vec<EnginePhase>,
}

impl<C> MaxFlowResult<C> {
    #[inline]
    pub fn is_exact(&self) -> bool {
        self.outcome == FlowOutcome::Exact
    }
}

/// Stepwise Edmonds-Karp engine over one capacity graph
#[derive(Debug)]
pub struct MaxFlowEngine<'g, C: Capacity> {
    graph: &'g CapacityGraph<C>,
    source: NodeIndex,
    sink: NodeIndex,
    config: MaxFlowConfig,
    residual: ResidualStore<C>,
    finder: AugmentingPathFinder,
    phase: EnginePhase,
    phase_history: Vec<EnginePhase>,
    total: C,
    bottlenecks: Vec<C>,
    outcome: FlowOutcome,
    /// Path found by the last successful search, consumed by `Augment`
    pending: Option<Vec<NodeIndex>>,
}

impl<'g, C: Capacity> MaxFlowEngine<'g, C> {
    /// Validates the terminals and enters `INIT` with the default configuration
    pub fn new(graph: &'g CapacityGraph<C>, source: NodeIndex, sink: NodeIndex) -> Result<Self, AlgorithmError> {
        Self::with_config(graph, source, sink, MaxFlowConfig::default())
    }

    /// Validates the terminals and enters `INIT`.
    ///
    /// Fails before allocating any flow state when the terminals are out of
    /// range, coincide, or are joined by a path of unbounded edges.
    pub fn with_config(
        graph: &'g CapacityGraph<C>,
        source: NodeIndex,
        sink: NodeIndex,
        config: MaxFlowConfig,
    ) -> Result<Self, AlgorithmError> {
        check_terminals(source, sink, graph.node_count())?;
        if graph.has_unbounded_path(source, sink) {
            return Err(ArgumentError::UnboundedFlow {
                source_node: source,
                sink_node: sink,
            }
            .into());
        }

        let residual = match config.backing {
            ResidualBacking::Dense => ResidualStore::Dense(DenseResidualGraph::new(graph)),
            ResidualBacking::Sparse => ResidualStore::Sparse(SparseResidualGraph::new(graph)),
        };
        log::debug!(
            "max flow {} -> {} over {} nodes ({} backing)",
            source,
            sink,
            graph.node_count(),
            config.backing.as_str()
        );

        Ok(Self {
            graph,
            source,
            sink,
            config,
            residual,
            finder: AugmentingPathFinder::new(),
            phase: EnginePhase::Init,
            phase_history: vec![EnginePhase::Init],
            total: C::zero(),
            bottlenecks: Vec::new(),
            outcome: FlowOutcome::Exact,
            pending: None,
        })
    }

    #[inline]
    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    /// Flow accumulated so far
    #[inline]
    pub fn total_flow(&self) -> C {
        self.total
    }

    pub fn augmentations(&self) -> usize {
        self.bottlenecks.len()
    }

    pub fn phase_history(&self) -> &[EnginePhase] {
        &self.phase_history
    }

    /// Current flow state, for inspection between steps
    pub fn network(&self) -> &ResidualStore<C> {
        &self.residual
    }

    pub fn config(&self) -> &MaxFlowConfig {
        &self.config
    }

    /// Performs one state transition and returns the phase entered.
    ///
    /// An error aborts the computation; the engine must not be stepped again.
    pub fn step(&mut self) -> Result<EnginePhase, AlgorithmError> {
        let next = match self.phase {
            EnginePhase::Init => EnginePhase::Search,
            EnginePhase::Search => self.search()?,
            EnginePhase::Augment => self.augment()?,
            EnginePhase::Done => return Ok(EnginePhase::Done),
        };
        log::trace!("{} -> {}", self.phase, next);
        self.phase = next;
        self.phase_history.push(next);
        Ok(next)
    }

    /// Drives the engine to `DONE` and returns the result
    pub fn run(mut self) -> Result<MaxFlowResult<C>, AlgorithmError> {
        while self.phase != EnginePhase::Done {
            self.step()?;
        }
        Ok(self.into_result())
    }

    fn search(&mut self) -> Result<EnginePhase, AlgorithmError> {
        let search = self.finder.find(&self.residual, self.source, self.sink)?;
        let Some(path) = search.path() else {
            return Ok(EnginePhase::Done);
        };

        if let Some(limit) = self.config.max_augmentations {
            if self.bottlenecks.len() >= limit {
                log::warn!(
                    "augmentation limit {} reached with paths remaining; {} is a lower bound",
                    limit,
                    self.total
                );
                self.outcome = FlowOutcome::LowerBound;
                return Ok(EnginePhase::Done);
            }
        }

        self.pending = Some(path);
        Ok(EnginePhase::Augment)
    }

    fn augment(&mut self) -> Result<EnginePhase, AlgorithmError> {
        let Some(path) = self.pending.take() else {
            return Err(AlgorithmError::StateInvariant {
                phase: EnginePhase::Augment.to_string(),
                reason: "no augmenting path pending",
            });
        };

        let Some(bottleneck) = path
            .windows(2)
            .map(|pair| self.residual.residual_capacity(pair[0], pair[1]))
            .reduce(C::min_of)
        else {
            return Err(AlgorithmError::StateInvariant {
                phase: EnginePhase::Augment.to_string(),
                reason: "augmenting path has no arcs",
            });
        };

        for pair in path.windows(2) {
            self.residual.push_flow(pair[0], pair[1], bottleneck)?;
        }
        self.total = self.total + bottleneck;
        self.bottlenecks.push(bottleneck);

        log::debug!(
            "augmentation {}: {} hops, bottleneck {}, total {}",
            self.bottlenecks.len(),
            path.len() - 1,
            bottleneck,
            self.total
        );
        Ok(EnginePhase::Search)
    }

    fn into_result(mut self) -> MaxFlowResult<C> {
        let min_cut = match self.outcome {
            FlowOutcome::Exact => Some(self.min_cut()),
            FlowOutcome::LowerBound => None,
        };

        log::info!(
            "max flow {} -> {} = {} ({:?}, {} augmentations)",
            self.source,
            self.sink,
            self.total,
            self.outcome,
            self.bottlenecks.len()
        );

        MaxFlowResult {
            max_flow: self.total,
            outcome: self.outcome,
            flow: FlowAssignment::from_network(&self.residual),
            min_cut,
            metrics: FlowMetrics {
                augmentations: self.bottlenecks.len(),
                searches: self.finder.searches(),
                nodes_explored: self.finder.nodes_explored(),
                bottlenecks: self.bottlenecks,
            },
            phase_history: self.phase_history,
        }
    }

    fn min_cut(&mut self) -> MinCut<C> {
        let reachable = self.finder.reachable_from(&self.residual, self.source);
        let source_side = (0..reachable.len()).filter(|&node| reachable[node]).collect();
        let cut_edges: Vec<_> = self
            .graph
            .edges()
            .filter(|&(from, to, _)| reachable[from] && !reachable[to])
            .collect();
        let capacity = cut_edges
            .iter()
            .fold(C::zero(), |total, &(_, _, capacity)| total + capacity);

        MinCut {
            source_side,
            cut_edges,
            capacity,
        }
    }
}

/// Runs the engine to completion with `config`
pub fn compute_max_flow<C: Capacity>(
    graph: &CapacityGraph<C>,
    source: NodeIndex,
    sink: NodeIndex,
    config: MaxFlowConfig,
) -> Result<MaxFlowResult<C>, AlgorithmError> {
    MaxFlowEngine::with_config(graph, source, sink, config)?.run()
}

/// Maximum flow value from `source` to `sink`
pub fn max_flow<C: Capacity>(graph: &CapacityGraph<C>, source: NodeIndex, sink: NodeIndex) -> Result<C, AlgorithmError> {
    Ok(MaxFlowEngine::new(graph, source, sink)?.run()?.max_flow)
}

/// Maximum flow value for a dense capacity matrix
pub fn max_flow_from_matrix<C: Capacity>(
    matrix: &[Vec<C>],
    source: NodeIndex,
    sink: NodeIndex,
) -> Result<C, AlgorithmError> {
    let graph = CapacityGraph::from_matrix(matrix)?;
    max_flow(&graph, source, sink)
}
