//! Capacitated directed graph representation
//!
//! `CapacityGraph` is the immutable input of a maximum-flow run. It stores
//! outgoing arcs per node in target order, resolves unbounded aggregation
//! edges to a numerically safe sentinel, and is built either from a dense
//! capacity matrix, an edge list, or a named-node builder.
//!
//! # Unbounded edges
//! Super-source and super-sink edges carry no real limit. They are resolved
//! to `U = 1 + sum of all finite capacities`, so every cut made of finite
//! edges is strictly smaller than `U` and bottleneck arithmetic never
//! overflows.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use std::collections::{BTreeMap, HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::algorithm::traits::{check_node, AlgorithmError, ArgumentError, Capacity, NodeIndex};

/// Capacity of a single input edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EdgeCapacity<C> {
    /// Finite, non-negative limit
    Finite(C),
    /// No limit; used for super-source / super-sink aggregation
    Unbounded,
}

impl<C> From<C> for EdgeCapacity<C> {
    fn from(capacity: C) -> Self {
        Self::Finite(capacity)
    }
}

/// Immutable capacitated directed graph over dense node indices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityGraph<C> {
    node_count: usize,
    /// Outgoing `(target, capacity)` pairs, sorted by target, capacity > 0
    adjacency: Vec<Vec<(NodeIndex, C)>>,
    /// Edges resolved from `EdgeCapacity::Unbounded`, sorted
    unbounded_edges: Vec<(NodeIndex, NodeIndex)>,
    /// Sentinel substituted for unbounded edges, if any exist
    unbounded_value: Option<C>,
}

impl<C: Capacity> CapacityGraph<C> {
    /// Builds a graph from a square matrix of finite capacities.
    /// `matrix[u][v] == 0` means there is no edge.
    pub fn from_matrix(matrix: &[Vec<C>]) -> Result<Self, AlgorithmError> {
        let node_count = matrix.len();
        check_square(matrix.iter().map(Vec::len), node_count)?;

        let edges = matrix.iter().enumerate().flat_map(|(from, row)| {
            row.iter()
                .enumerate()
                .map(move |(to, &capacity)| (from, to, EdgeCapacity::Finite(capacity)))
        });
        Self::from_edges(node_count, edges)
    }

    /// Builds a graph from a square matrix that may contain unbounded entries
    pub fn from_capacity_matrix(matrix: &[Vec<EdgeCapacity<C>>]) -> Result<Self, AlgorithmError> {
        let node_count = matrix.len();
        check_square(matrix.iter().map(Vec::len), node_count)?;

        let edges = matrix.iter().enumerate().flat_map(|(from, row)| {
            row.iter().enumerate().map(move |(to, &capacity)| (from, to, capacity))
        });
        Self::from_edges(node_count, edges)
    }

    /// Builds a graph from an edge list.
    ///
    /// Parallel edges for the same ordered pair are summed, an unbounded
    /// edge absorbs any finite parallel edge, zero capacities and self-loops
    /// are dropped.
    pub fn from_edges<I>(node_count: usize, edges: I) -> Result<Self, AlgorithmError>
    where
        I: IntoIterator<Item = (NodeIndex, NodeIndex, EdgeCapacity<C>)>,
    {
        if node_count == 0 {
            return Err(ArgumentError::EmptyGraph.into());
        }

        let mut merged: BTreeMap<(NodeIndex, NodeIndex), EdgeCapacity<C>> = BTreeMap::new();
        for (from, to, capacity) in edges {
            check_node("edge tail", from, node_count)?;
            check_node("edge head", to, node_count)?;

            if let EdgeCapacity::Finite(value) = capacity {
                if !value.is_finite_value() {
                    return Err(ArgumentError::NonFiniteCapacity {
                        from,
                        to,
                        capacity: value.to_string(),
                    }
                    .into());
                }
                if value < C::zero() {
                    return Err(ArgumentError::NegativeCapacity {
                        from,
                        to,
                        capacity: value.to_string(),
                    }
                    .into());
                }
                if value == C::zero() {
                    continue;
                }
            }
            if from == to {
                continue;
            }

            let entry = merged.entry((from, to)).or_insert(EdgeCapacity::Finite(C::zero()));
            *entry = match (*entry, capacity) {
                (EdgeCapacity::Finite(a), EdgeCapacity::Finite(b)) => {
                    EdgeCapacity::Finite(a.checked_total(b).ok_or(ArgumentError::CapacityOverflow)?)
                }
                _ => EdgeCapacity::Unbounded,
            };
        }

        let mut finite_total = C::zero();
        let mut unbounded_edges = Vec::new();
        for (&(from, to), capacity) in &merged {
            match capacity {
                EdgeCapacity::Finite(value) => {
                    finite_total = finite_total
                        .checked_total(*value)
                        .ok_or(ArgumentError::CapacityOverflow)?;
                }
                EdgeCapacity::Unbounded => unbounded_edges.push((from, to)),
            }
        }

        let unbounded_value = if unbounded_edges.is_empty() {
            None
        } else {
            Some(finite_total.checked_total(C::one()).ok_or(ArgumentError::CapacityOverflow)?)
        };

        let mut adjacency = vec![Vec::new(); node_count];
        for ((from, to), capacity) in merged {
            let value = match capacity {
                EdgeCapacity::Finite(value) => value,
                EdgeCapacity::Unbounded => unbounded_value.unwrap_or_else(C::one),
            };
            adjacency[from].push((to, value));
        }

        log::debug!(
            "built capacity graph: {} nodes, {} edges ({} unbounded)",
            node_count,
            adjacency.iter().map(Vec::len).sum::<usize>(),
            unbounded_edges.len()
        );

        Ok(Self {
            node_count,
            adjacency,
            unbounded_edges,
            unbounded_value,
        })
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum()
    }

    /// Capacity of `from -> to`; zero when there is no edge or an index is out of range
    pub fn capacity(&self, from: NodeIndex, to: NodeIndex) -> C {
        self.adjacency
            .get(from)
            .and_then(|arcs| {
                arcs.binary_search_by_key(&to, |&(target, _)| target)
                    .ok()
                    .map(|position| arcs[position].1)
            })
            .unwrap_or_else(C::zero)
    }

    /// Outgoing `(target, capacity)` pairs of `node`, sorted by target
    pub fn out_edges(&self, node: NodeIndex) -> &[(NodeIndex, C)] {
        self.adjacency.get(node).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every edge as `(from, to, capacity)`, in `(from, to)` order
    pub fn edges(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex, C)> + '_ {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(from, arcs)| arcs.iter().map(move |&(to, capacity)| (from, to, capacity)))
    }

    /// Whether `from -> to` was given as an unbounded edge
    pub fn is_unbounded(&self, from: NodeIndex, to: NodeIndex) -> bool {
        self.unbounded_edges.binary_search(&(from, to)).is_ok()
    }

    /// The sentinel standing in for unbounded edges, if any exist
    pub fn unbounded_value(&self) -> Option<C> {
        self.unbounded_value
    }

    /// Dense `N x N` copy of the capacities
    pub fn to_matrix(&self) -> Vec<Vec<C>> {
        let mut matrix = vec![vec![C::zero(); self.node_count]; self.node_count];
        for (from, to, capacity) in self.edges() {
            matrix[from][to] = capacity;
        }
        matrix
    }

    /// Whether `sink` can be reached from `source` using unbounded edges only
    pub fn has_unbounded_path(&self, source: NodeIndex, sink: NodeIndex) -> bool {
        if self.unbounded_edges.is_empty() || source >= self.node_count {
            return false;
        }

        let mut visited = vec![false; self.node_count];
        let mut queue = VecDeque::from([source]);
        visited[source] = true;

        while let Some(node) = queue.pop_front() {
            let start = self.unbounded_edges.partition_point(|&(from, _)| from < node);
            for &(_, next) in self.unbounded_edges[start..].iter().take_while(|&&(from, _)| from == node) {
                if next == sink {
                    return true;
                }
                if !visited[next] {
                    visited[next] = true;
                    queue.push_back(next);
                }
            }
        }
        false
    }
}

fn check_square<I>(row_lengths: I, expected: usize) -> Result<(), AlgorithmError>
where
    I: Iterator<Item = usize>,
{
    if expected == 0 {
        return Err(ArgumentError::EmptyGraph.into());
    }
    for (row, found) in row_lengths.enumerate() {
        if found != expected {
            return Err(ArgumentError::RaggedMatrix { row, expected, found }.into());
        }
    }
    Ok(())
}

/// Index <-> name mapping produced by [`CapacityGraphBuilder`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeNames {
    names: Vec<String>,
    lookup: HashMap<String, NodeIndex>,
}

impl NodeNames {
    pub fn index_of(&self, name: &str) -> Option<NodeIndex> {
        self.lookup.get(name).copied()
    }

    pub fn name_of(&self, index: NodeIndex) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeIndex, &str)> {
        self.names.iter().map(String::as_str).enumerate()
    }

    fn intern(&mut self, name: &str) -> NodeIndex {
        if let Some(&index) = self.lookup.get(name) {
            return index;
        }
        let index = self.names.len();
        self.names.push(name.to_owned());
        self.lookup.insert(name.to_owned(), index);
        index
    }
}

/// Builds a [`CapacityGraph`] from named nodes.
///
/// Nodes receive dense indices in first-seen order.
#[derive(Debug, Clone)]
pub struct CapacityGraphBuilder<C> {
    names: NodeNames,
    edges: Vec<(NodeIndex, NodeIndex, EdgeCapacity<C>)>,
}

impl<C: Capacity> Default for CapacityGraphBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Capacity> CapacityGraphBuilder<C> {
    pub fn new() -> Self {
        Self {
            names: NodeNames::default(),
            edges: Vec::new(),
        }
    }

    /// Registers a node without edges and returns its index
    pub fn add_node(&mut self, name: &str) -> NodeIndex {
        self.names.intern(name)
    }

    pub fn add_edge(&mut self, from: &str, to: &str, capacity: C) -> &mut Self {
        self.push_edge(from, to, EdgeCapacity::Finite(capacity))
    }

    pub fn add_unbounded_edge(&mut self, from: &str, to: &str) -> &mut Self {
        self.push_edge(from, to, EdgeCapacity::Unbounded)
    }

    /// Collapses several true sources and sinks into one super-source and
    /// one super-sink joined by unbounded edges
    pub fn with_super_terminals(
        &mut self,
        super_source: &str,
        sources: &[&str],
        super_sink: &str,
        sinks: &[&str],
    ) -> &mut Self {
        for source in sources {
            self.add_unbounded_edge(super_source, source);
        }
        for sink in sinks {
            self.add_unbounded_edge(sink, super_sink);
        }
        self
    }

    pub fn node_count(&self) -> usize {
        self.names.len()
    }

    pub fn build(self) -> Result<(CapacityGraph<C>, NodeNames), AlgorithmError> {
        let graph = CapacityGraph::from_edges(self.names.len(), self.edges)?;
        Ok((graph, self.names))
    }

    fn push_edge(&mut self, from: &str, to: &str, capacity: EdgeCapacity<C>) -> &mut Self {
        let from = self.names.intern(from);
        let to = self.names.intern(to);
        self.edges.push((from, to, capacity));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_matrix_lookup() {
        let graph = CapacityGraph::from_matrix(&[vec![0, 10, 5], vec![0, 0, 4], vec![0, 0, 0]]).unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.capacity(0, 1), 10);
        assert_eq!(graph.capacity(1, 0), 0);
        assert_eq!(graph.out_edges(0), &[(1, 10), (2, 5)]);
        assert_eq!(graph.to_matrix(), vec![vec![0, 10, 5], vec![0, 0, 4], vec![0, 0, 0]]);
    }

    #[test]
    fn test_ragged_matrix_rejected() {
        let err = CapacityGraph::from_matrix(&[vec![0, 1], vec![0]]).unwrap_err();
        assert_eq!(
            err,
            AlgorithmError::InvalidArgument(ArgumentError::RaggedMatrix { row: 1, expected: 2, found: 1 })
        );
    }

    #[test]
    fn test_negative_and_non_finite_rejected() {
        let err = CapacityGraph::from_matrix(&[vec![0.0, -1.0], vec![0.0, 0.0]]).unwrap_err();
        assert!(matches!(
            err,
            AlgorithmError::InvalidArgument(ArgumentError::NegativeCapacity { from: 0, to: 1, .. })
        ));

        let err = CapacityGraph::from_matrix(&[vec![0.0, f64::INFINITY], vec![0.0, 0.0]]).unwrap_err();
        assert!(matches!(
            err,
            AlgorithmError::InvalidArgument(ArgumentError::NonFiniteCapacity { from: 0, to: 1, .. })
        ));
    }

    #[test]
    fn test_empty_graph_rejected() {
        let empty: Vec<Vec<i64>> = Vec::new();
        assert_eq!(
            CapacityGraph::from_matrix(&empty).unwrap_err(),
            AlgorithmError::InvalidArgument(ArgumentError::EmptyGraph)
        );
    }

    #[test]
    fn test_parallel_edges_summed_and_self_loops_dropped() {
        let edges = vec![
            (0, 1, EdgeCapacity::Finite(3_i64)),
            (0, 1, EdgeCapacity::Finite(4)),
            (1, 1, EdgeCapacity::Finite(9)),
        ];
        let graph = CapacityGraph::from_edges(2, edges).unwrap();
        assert_eq!(graph.capacity(0, 1), 7);
        assert_eq!(graph.capacity(1, 1), 0);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_edge_index_out_of_range() {
        let err = CapacityGraph::from_edges(2, vec![(0, 2, EdgeCapacity::Finite(1_i64))]).unwrap_err();
        assert_eq!(
            err,
            AlgorithmError::InvalidArgument(ArgumentError::NodeOutOfRange {
                role: "edge head",
                index: 2,
                node_count: 2,
            })
        );
    }

    #[test]
    fn test_unbounded_sentinel_exceeds_finite_total() {
        let graph = CapacityGraph::from_capacity_matrix(&[
            vec![EdgeCapacity::Finite(0_i64), EdgeCapacity::Unbounded, EdgeCapacity::Finite(0)],
            vec![EdgeCapacity::Finite(0), EdgeCapacity::Finite(0), EdgeCapacity::Finite(7)],
            vec![EdgeCapacity::Finite(0), EdgeCapacity::Finite(5), EdgeCapacity::Finite(0)],
        ])
        .unwrap();
        assert_eq!(graph.unbounded_value(), Some(13));
        assert_eq!(graph.capacity(0, 1), 13);
        assert!(graph.is_unbounded(0, 1));
        assert!(!graph.is_unbounded(1, 2));
    }

    #[test]
    fn test_capacity_overflow_detected() {
        let edges = vec![
            (0, 1, EdgeCapacity::Finite(i32::MAX)),
            (1, 2, EdgeCapacity::Finite(1)),
        ];
        assert_eq!(
            CapacityGraph::from_edges(3, edges).unwrap_err(),
            AlgorithmError::InvalidArgument(ArgumentError::CapacityOverflow)
        );
    }

    #[test]
    fn test_unbounded_path_detection() {
        let mut builder = CapacityGraphBuilder::<i64>::new();
        builder.add_unbounded_edge("s", "a").add_unbounded_edge("a", "t").add_edge("s", "t", 3);
        let (graph, names) = builder.build().unwrap();
        let s = names.index_of("s").unwrap();
        let t = names.index_of("t").unwrap();
        assert!(graph.has_unbounded_path(s, t));
        assert!(!graph.has_unbounded_path(t, s));
    }

    #[test]
    fn test_builder_first_seen_order() {
        let mut builder = CapacityGraphBuilder::<i64>::new();
        builder
            .with_super_terminals("Start", &["Terminal 1", "Terminal 2"], "Finish", &["Market 1"])
            .add_edge("Terminal 1", "Market 1", 25);
        assert_eq!(builder.node_count(), 5);

        let (graph, names) = builder.build().unwrap();
        assert_eq!(names.name_of(0), Some("Start"));
        assert_eq!(names.index_of("Finish"), Some(4));
        assert_eq!(graph.capacity(1, 3), 25);
        assert!(graph.is_unbounded(0, 2));
        assert_eq!(graph.unbounded_value(), Some(26));
    }
}
