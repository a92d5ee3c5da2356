//! Residual graph storage (flow state)
//!
//! Two interchangeable representations of the mutable flow state of one
//! maximum-flow run:
//!
//! - [`DenseResidualGraph`]: `N x N` capacity and flow matrices. Simple and
//!   cache friendly for modest node counts.
//! - [`SparseResidualGraph`]: adjacency lists of [`FlowArc`]s, each paired
//!   with its reverse arc, for large sparse graphs.
//!
//! Both keep `flow(u, v) == -flow(v, u)` by updating an arc and its reverse
//! together in [`ResidualNetwork::push_flow`]. That single operation is what
//! lets a later augmenting path cancel flow committed by an earlier one.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use std::collections::HashMap;
use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use crate::algorithm::traits::{check_node, AlgorithmError, Capacity, NodeIndex, ResidualNetwork};
use crate::data_structures::graph::CapacityGraph;

/// Dense matrix flow state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseResidualGraph<C> {
    node_count: usize,
    /// Row-major `N x N` capacities
    capacity: Vec<C>,
    /// Row-major `N x N` signed flows
    flow: Vec<C>,
}

impl<C: Capacity> DenseResidualGraph<C> {
    /// Allocates an all-zero flow state over `graph`
    pub fn new(graph: &CapacityGraph<C>) -> Self {
        let node_count = graph.node_count();
        let mut capacity = vec![C::zero(); node_count * node_count];
        for (from, to, value) in graph.edges() {
            capacity[from * node_count + to] = value;
        }
        Self {
            node_count,
            capacity,
            flow: vec![C::zero(); node_count * node_count],
        }
    }

    /// Current flow as an `N x N` matrix
    pub fn flow_matrix(&self) -> Vec<Vec<C>> {
        self.flow
            .chunks(self.node_count.max(1))
            .map(<[C]>::to_vec)
            .collect()
    }

    #[inline]
    fn slot(&self, from: NodeIndex, to: NodeIndex) -> Option<usize> {
        (from < self.node_count && to < self.node_count).then(|| from * self.node_count + to)
    }
}

impl<C: Capacity> ResidualNetwork<C> for DenseResidualGraph<C> {
    #[inline]
    fn node_count(&self) -> usize {
        self.node_count
    }

    fn capacity(&self, from: NodeIndex, to: NodeIndex) -> C {
        self.slot(from, to).map_or_else(C::zero, |slot| self.capacity[slot])
    }

    fn flow(&self, from: NodeIndex, to: NodeIndex) -> C {
        self.slot(from, to).map_or_else(C::zero, |slot| self.flow[slot])
    }

    fn for_each_residual_arc<F>(&self, from: NodeIndex, mut visit: F) -> ControlFlow<()>
    where
        F: FnMut(NodeIndex, C) -> ControlFlow<()>,
    {
        if from >= self.node_count {
            return ControlFlow::Continue(());
        }
        let row = from * self.node_count;
        for to in 0..self.node_count {
            let residual = self.capacity[row + to].residual_of(self.flow[row + to]);
            if residual > C::zero() {
                visit(to, residual)?;
            }
        }
        ControlFlow::Continue(())
    }

    fn push_flow(&mut self, from: NodeIndex, to: NodeIndex, amount: C) -> Result<(), AlgorithmError> {
        check_node("push tail", from, self.node_count)?;
        check_node("push head", to, self.node_count)?;

        let forward = from * self.node_count + to;
        let backward = to * self.node_count + from;
        let residual = self.capacity[forward].residual_of(self.flow[forward]);
        if amount < C::zero() || amount > residual {
            return Err(AlgorithmError::invariant(from, to, amount, residual));
        }

        let updated = self.capacity[forward].flow_after_push(self.flow[forward], amount);
        self.flow[forward] = updated;
        self.flow[backward] = -updated;
        Ok(())
    }

    fn positive_flows(&self) -> Vec<(NodeIndex, NodeIndex, C)> {
        self.flow
            .iter()
            .enumerate()
            .filter(|&(_, flow)| *flow > C::zero())
            .map(|(slot, &flow)| (slot / self.node_count, slot % self.node_count, flow))
            .collect()
    }
}

/// Arc of a sparse residual graph with its paired reverse arc
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowArc<C> {
    pub from: NodeIndex,
    pub to: NodeIndex,
    /// Original capacity; zero for a pure reverse arc
    pub capacity: C,
    /// Current signed flow
    pub flow: C,
    /// Index of the arc running `to -> from`
    pub reverse: usize,
}

impl<C: Capacity> FlowArc<C> {
    fn new(from: NodeIndex, to: NodeIndex, capacity: C, reverse: usize) -> Self {
        Self {
            from,
            to,
            capacity,
            flow: C::zero(),
            reverse,
        }
    }

    #[inline]
    pub fn residual_capacity(&self) -> C {
        self.capacity.residual_of(self.flow)
    }
}

/// Adjacency-list flow state for sparse graphs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseResidualGraph<C> {
    node_count: usize,
    arcs: Vec<FlowArc<C>>,
    /// Arc indices leaving each node, sorted by arc target
    adjacency: Vec<Vec<usize>>,
}

impl<C: Capacity> SparseResidualGraph<C> {
    /// Allocates an all-zero flow state over `graph`.
    ///
    /// Opposite edges `u -> v` and `v -> u` share one arc pair, so the pair
    /// carries a single antisymmetric flow value.
    pub fn new(graph: &CapacityGraph<C>) -> Self {
        let node_count = graph.node_count();
        let mut arcs: Vec<FlowArc<C>> = Vec::with_capacity(graph.edge_count() * 2);
        let mut adjacency = vec![Vec::new(); node_count];
        let mut pair_arcs: HashMap<(NodeIndex, NodeIndex), usize> = HashMap::new();

        for (from, to, capacity) in graph.edges() {
            let key = (from.min(to), from.max(to));
            if let Some(&forward) = pair_arcs.get(&key) {
                let arc = if arcs[forward].from == from {
                    forward
                } else {
                    arcs[forward].reverse
                };
                arcs[arc].capacity = arcs[arc].capacity + capacity;
                continue;
            }

            let forward = arcs.len();
            let backward = forward + 1;
            arcs.push(FlowArc::new(from, to, capacity, backward));
            arcs.push(FlowArc::new(to, from, C::zero(), forward));
            adjacency[from].push(forward);
            adjacency[to].push(backward);
            pair_arcs.insert(key, forward);
        }

        for outgoing in &mut adjacency {
            outgoing.sort_by_key(|&arc| arcs[arc].to);
        }

        Self {
            node_count,
            arcs,
            adjacency,
        }
    }

    pub fn arcs(&self) -> &[FlowArc<C>] {
        &self.arcs
    }

    fn find_arc(&self, from: NodeIndex, to: NodeIndex) -> Option<usize> {
        let outgoing = self.adjacency.get(from)?;
        outgoing
            .binary_search_by_key(&to, |&arc| self.arcs[arc].to)
            .ok()
            .map(|position| outgoing[position])
    }
}

impl<C: Capacity> ResidualNetwork<C> for SparseResidualGraph<C> {
    #[inline]
    fn node_count(&self) -> usize {
        self.node_count
    }

    fn capacity(&self, from: NodeIndex, to: NodeIndex) -> C {
        self.find_arc(from, to)
            .map_or_else(C::zero, |arc| self.arcs[arc].capacity)
    }

    fn flow(&self, from: NodeIndex, to: NodeIndex) -> C {
        self.find_arc(from, to).map_or_else(C::zero, |arc| self.arcs[arc].flow)
    }

    fn for_each_residual_arc<F>(&self, from: NodeIndex, mut visit: F) -> ControlFlow<()>
    where
        F: FnMut(NodeIndex, C) -> ControlFlow<()>,
    {
        let Some(outgoing) = self.adjacency.get(from) else {
            return ControlFlow::Continue(());
        };
        for &index in outgoing {
            let arc = &self.arcs[index];
            let residual = arc.residual_capacity();
            if residual > C::zero() {
                visit(arc.to, residual)?;
            }
        }
        ControlFlow::Continue(())
    }

    fn push_flow(&mut self, from: NodeIndex, to: NodeIndex, amount: C) -> Result<(), AlgorithmError> {
        check_node("push tail", from, self.node_count)?;
        check_node("push head", to, self.node_count)?;

        let Some(forward) = self.find_arc(from, to) else {
            if amount == C::zero() {
                return Ok(());
            }
            return Err(AlgorithmError::invariant(from, to, amount, C::zero()));
        };

        let residual = self.arcs[forward].residual_capacity();
        if amount < C::zero() || amount > residual {
            return Err(AlgorithmError::invariant(from, to, amount, residual));
        }

        let backward = self.arcs[forward].reverse;
        let updated = self.arcs[forward].capacity.flow_after_push(self.arcs[forward].flow, amount);
        self.arcs[forward].flow = updated;
        self.arcs[backward].flow = -updated;
        Ok(())
    }

    fn positive_flows(&self) -> Vec<(NodeIndex, NodeIndex, C)> {
        let mut flows: Vec<_> = self
            .arcs
            .iter()
            .filter(|arc| arc.flow > C::zero())
            .map(|arc| (arc.from, arc.to, arc.flow))
            .collect();
        flows.sort_by_key(|&(from, to, _)| (from, to));
        flows
    }
}

/// Flow state selected at run time by the engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResidualStore<C> {
    Dense(DenseResidualGraph<C>),
    Sparse(SparseResidualGraph<C>),
}

impl<C: Capacity> ResidualNetwork<C> for ResidualStore<C> {
    fn node_count(&self) -> usize {
        match self {
            Self::Dense(network) => network.node_count(),
            Self::Sparse(network) => network.node_count(),
        }
    }

    fn capacity(&self, from: NodeIndex, to: NodeIndex) -> C {
        match self {
            Self::Dense(network) => network.capacity(from, to),
            Self::Sparse(network) => network.capacity(from, to),
        }
    }

    fn flow(&self, from: NodeIndex, to: NodeIndex) -> C {
        match self {
            Self::Dense(network) => network.flow(from, to),
            Self::Sparse(network) => network.flow(from, to),
        }
    }

    fn for_each_residual_arc<F>(&self, from: NodeIndex, visit: F) -> ControlFlow<()>
    where
        F: FnMut(NodeIndex, C) -> ControlFlow<()>,
    {
        match self {
            Self::Dense(network) => network.for_each_residual_arc(from, visit),
            Self::Sparse(network) => network.for_each_residual_arc(from, visit),
        }
    }

    fn push_flow(&mut self, from: NodeIndex, to: NodeIndex, amount: C) -> Result<(), AlgorithmError> {
        match self {
            Self::Dense(network) => network.push_flow(from, to, amount),
            Self::Sparse(network) => network.push_flow(from, to, amount),
        }
    }

    fn positive_flows(&self) -> Vec<(NodeIndex, NodeIndex, C)> {
        match self {
            Self::Dense(network) => network.positive_flows(),
            Self::Sparse(network) => network.positive_flows(),
        }
    }
}

/// Positive flow on one ordered pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeFlow<C> {
    pub from: NodeIndex,
    pub to: NodeIndex,
    pub flow: C,
}

/// Final flow of a run, detached from the residual storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowAssignment<C> {
    node_count: usize,
    /// Strictly positive flows, sorted by `(from, to)`
    edges: Vec<EdgeFlow<C>>,
}

impl<C: Capacity> FlowAssignment<C> {
    pub fn from_network<R: ResidualNetwork<C>>(network: &R) -> Self {
        let edges = network
            .positive_flows()
            .into_iter()
            .map(|(from, to, flow)| EdgeFlow { from, to, flow })
            .collect();
        Self {
            node_count: network.node_count(),
            edges,
        }
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Edges carrying positive flow
    pub fn edge_flows(&self) -> &[EdgeFlow<C>] {
        &self.edges
    }

    /// Signed flow on `from -> to`
    pub fn flow(&self, from: NodeIndex, to: NodeIndex) -> C {
        if let Some(edge) = self.lookup(from, to) {
            return edge.flow;
        }
        self.lookup(to, from).map_or_else(C::zero, |edge| -edge.flow)
    }

    /// Signed flows as an `N x N` matrix
    pub fn to_matrix(&self) -> Vec<Vec<C>> {
        let mut matrix = vec![vec![C::zero(); self.node_count]; self.node_count];
        for edge in &self.edges {
            matrix[edge.from][edge.to] = edge.flow;
            matrix[edge.to][edge.from] = -edge.flow;
        }
        matrix
    }

    fn lookup(&self, from: NodeIndex, to: NodeIndex) -> Option<&EdgeFlow<C>> {
        self.edges
            .binary_search_by_key(&(from, to), |edge| (edge.from, edge.to))
            .ok()
            .map(|position| &self.edges[position])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::traits::ArgumentError;

    fn diamond() -> CapacityGraph<i64> {
        CapacityGraph::from_matrix(&[
            vec![0, 3, 2, 0],
            vec![0, 0, 1, 2],
            vec![0, 4, 0, 3],
            vec![0, 0, 0, 0],
        ])
        .unwrap()
    }

    fn residual_targets<R: ResidualNetwork<i64>>(network: &R, from: NodeIndex) -> Vec<(NodeIndex, i64)> {
        let mut targets = Vec::new();
        let _ = network.for_each_residual_arc(from, |to, residual| {
            targets.push((to, residual));
            ControlFlow::Continue(())
        });
        targets
    }

    #[test]
    fn test_dense_push_updates_both_directions() {
        let mut network = DenseResidualGraph::new(&diamond());
        network.push_flow(0, 1, 2).unwrap();

        assert_eq!(network.flow(0, 1), 2);
        assert_eq!(network.flow(1, 0), -2);
        assert_eq!(network.residual_capacity(0, 1), 1);
        assert_eq!(network.residual_capacity(1, 0), 2);
    }

    #[test]
    fn test_dense_push_beyond_residual_is_invariant_violation() {
        let mut network = DenseResidualGraph::new(&diamond());
        let err = network.push_flow(0, 2, 3).unwrap_err();
        assert!(matches!(err, AlgorithmError::InvariantViolation { from: 0, to: 2, .. }));
        assert_eq!(network.flow(0, 2), 0);

        let err = network.push_flow(0, 1, -1).unwrap_err();
        assert!(matches!(err, AlgorithmError::InvariantViolation { .. }));
    }

    #[test]
    fn test_push_out_of_range_is_invalid_argument() {
        let mut network = SparseResidualGraph::new(&diamond());
        let err = network.push_flow(0, 7, 1).unwrap_err();
        assert!(matches!(
            err,
            AlgorithmError::InvalidArgument(ArgumentError::NodeOutOfRange { index: 7, .. })
        ));
    }

    #[test]
    fn test_reverse_residual_enables_cancellation() {
        let mut network = SparseResidualGraph::new(&diamond());
        network.push_flow(0, 1, 1).unwrap();
        network.push_flow(1, 2, 1).unwrap();

        // 2 -> 1 now has its own capacity 4 plus the cancellable unit
        assert_eq!(network.residual_capacity(2, 1), 5);
        network.push_flow(2, 1, 5).unwrap();
        assert_eq!(network.flow(1, 2), -4);
        assert_eq!(network.flow(2, 1), 4);
    }

    #[test]
    fn test_residual_arcs_in_index_order() {
        let graph = diamond();
        let dense = DenseResidualGraph::new(&graph);
        let sparse = SparseResidualGraph::new(&graph);

        assert_eq!(residual_targets(&dense, 0), vec![(1, 3), (2, 2)]);
        assert_eq!(residual_targets(&dense, 2), vec![(1, 4), (3, 3)]);
        for node in 0..4 {
            assert_eq!(residual_targets(&dense, node), residual_targets(&sparse, node));
        }
    }

    #[test]
    fn test_opposite_edges_share_an_arc_pair() {
        let sparse = SparseResidualGraph::new(&diamond());
        // six edges over five distinct node pairs
        assert_eq!(sparse.arcs().len(), 10);
        assert_eq!(sparse.capacity(1, 2), 1);
        assert_eq!(sparse.capacity(2, 1), 4);
    }

    #[test]
    fn test_flow_assignment_from_both_backings() {
        let graph = diamond();
        let mut dense = ResidualStore::Dense(DenseResidualGraph::new(&graph));
        let mut sparse = ResidualStore::Sparse(SparseResidualGraph::new(&graph));
        for network in [&mut dense, &mut sparse] {
            network.push_flow(0, 1, 2).unwrap();
            network.push_flow(1, 3, 2).unwrap();
        }

        let from_dense = FlowAssignment::from_network(&dense);
        let from_sparse = FlowAssignment::from_network(&sparse);
        assert_eq!(from_dense, from_sparse);
        assert_eq!(from_dense.edge_flows().len(), 2);
        assert_eq!(from_dense.flow(1, 3), 2);
        assert_eq!(from_dense.flow(3, 1), -2);
        assert_eq!(from_dense.flow(0, 2), 0);

        if let ResidualStore::Dense(inner) = &dense {
            assert_eq!(inner.flow_matrix(), from_dense.to_matrix());
        }
    }

    #[test]
    fn test_reverse_of_unbounded_edge_saturates() {
        use crate::data_structures::graph::EdgeCapacity;

        let graph = CapacityGraph::<i32>::from_edges(
            3,
            [
                (0, 1, EdgeCapacity::Finite(1_100_000_000)),
                (1, 0, EdgeCapacity::Unbounded),
                (1, 2, EdgeCapacity::Unbounded),
            ],
        )
        .unwrap();
        let mut dense = ResidualStore::Dense(DenseResidualGraph::new(&graph));
        let mut sparse = ResidualStore::Sparse(SparseResidualGraph::new(&graph));

        for network in [&mut dense, &mut sparse] {
            network.push_flow(0, 1, 1_100_000_000).unwrap();
            assert_eq!(network.residual_capacity(1, 0), i32::MAX);

            let mut seen = Vec::new();
            let _ = network.for_each_residual_arc(1, |to, residual| {
                seen.push((to, residual));
                ControlFlow::Continue(())
            });
            assert_eq!(seen, vec![(0, i32::MAX), (2, 1_100_000_001)]);

            network.push_flow(1, 0, 7).unwrap();
            assert_eq!(network.flow(0, 1), 1_099_999_993);
            assert_eq!(network.flow(1, 0), -1_099_999_993);
        }
    }

    #[test]
    fn test_full_push_never_rounds_above_capacity() {
        let graph = CapacityGraph::from_matrix(&[vec![0.0, 7.2], vec![0.0, 0.0]]).unwrap();
        let mut dense = ResidualStore::Dense(DenseResidualGraph::new(&graph));
        let mut sparse = ResidualStore::Sparse(SparseResidualGraph::new(&graph));

        for network in [&mut dense, &mut sparse] {
            network.push_flow(0, 1, 4.9).unwrap();
            let rest = network.residual_capacity(0, 1);
            network.push_flow(0, 1, rest).unwrap();

            assert_eq!(network.flow(0, 1), 7.2);
            assert_eq!(network.flow(1, 0), -7.2);
            assert_eq!(network.residual_capacity(0, 1), 0.0);
        }
    }
}
