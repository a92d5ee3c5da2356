//! Breadth-first augmenting path search
//!
//! Finds a shortest (fewest-hop) path from source to sink using only arcs
//! of strictly positive residual capacity. Neighbors are explored in
//! increasing node index order, so the path found for a given residual
//! state is deterministic.
//!
//! # Complexity Analysis
//! - Time Complexity: O(V + E) per search over an adjacency-list network,
//!   O(V^2) over a dense matrix
//! - Space Complexity: O(V) for the predecessor map and frontier
//!
//! Shortest-path selection bounds the number of augmentations by O(V * E)
//! regardless of capacity values, which gives Edmonds-Karp its O(V * E^2)
//! bound.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use std::collections::VecDeque;
use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use crate::algorithm::traits::{check_terminals, AlgorithmError, Capacity, NodeIndex, ResidualNetwork};

/// Outcome of one augmenting path search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSearch {
    source: NodeIndex,
    sink: NodeIndex,
    found: bool,
    /// Predecessor of every node discovered by the search
    predecessors: Vec<Option<NodeIndex>>,
}

impl PathSearch {
    #[inline]
    pub fn found(&self) -> bool {
        self.found
    }

    pub fn predecessor(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.predecessors.get(node).copied().flatten()
    }

    /// Reconstructs the path by walking predecessors from the sink back to
    /// the source. Returns nodes in source-to-sink order.
    pub fn path(&self) -> Option<Vec<NodeIndex>> {
        if !self.found {
            return None;
        }

        let mut path = vec![self.sink];
        let mut current = self.sink;
        while current != self.source {
            current = self.predecessor(current)?;
            path.push(current);
        }
        path.reverse();
        Some(path)
    }
}

/// Reusable BFS augmenting path finder with exploration counters
#[derive(Debug, Clone, Default)]
pub struct AugmentingPathFinder {
    searches: usize,
    nodes_explored: usize,
}

impl AugmentingPathFinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of searches run so far
    pub fn searches(&self) -> usize {
        self.searches
    }

    /// Total nodes dequeued across all searches
    pub fn nodes_explored(&self) -> usize {
        self.nodes_explored
    }

    /// Searches `network` for an augmenting path from `source` to `sink`.
    ///
    /// Stops as soon as the sink is discovered, without finishing the
    /// current frontier.
    pub fn find<C, R>(&mut self, network: &R, source: NodeIndex, sink: NodeIndex) -> Result<PathSearch, AlgorithmError>
    where
        C: Capacity,
        R: ResidualNetwork<C>,
    {
        let node_count = network.node_count();
        check_terminals(source, sink, node_count)?;
        self.searches += 1;

        let mut predecessors = vec![None; node_count];
        let mut visited = vec![false; node_count];
        let mut queue = VecDeque::from([source]);
        visited[source] = true;

        while let Some(node) = queue.pop_front() {
            self.nodes_explored += 1;

            let reached = network.for_each_residual_arc(node, |next, _residual| {
                if visited[next] {
                    return ControlFlow::Continue(());
                }
                visited[next] = true;
                predecessors[next] = Some(node);
                if next == sink {
                    return ControlFlow::Break(());
                }
                queue.push_back(next);
                ControlFlow::Continue(())
            });

            if reached.is_break() {
                log::trace!("augmenting path reached sink {} after {} searches", sink, self.searches);
                return Ok(PathSearch {
                    source,
                    sink,
                    found: true,
                    predecessors,
                });
            }
        }

        log::trace!("no augmenting path from {} to {}", source, sink);
        Ok(PathSearch {
            source,
            sink,
            found: false,
            predecessors,
        })
    }

    /// Nodes reachable from `source` through positive residual capacity.
    ///
    /// After a run has terminated this is the source side of a minimum cut.
    pub fn reachable_from<C, R>(&mut self, network: &R, source: NodeIndex) -> Vec<bool>
    where
        C: Capacity,
        R: ResidualNetwork<C>,
    {
        let mut visited = vec![false; network.node_count()];
        if source >= visited.len() {
            return visited;
        }
        visited[source] = true;

        let mut queue = VecDeque::from([source]);
        while let Some(node) = queue.pop_front() {
            self.nodes_explored += 1;
            let _ = network.for_each_residual_arc(node, |next, _residual| {
                if !visited[next] {
                    visited[next] = true;
                    queue.push_back(next);
                }
                ControlFlow::Continue(())
            });
        }
        visited
    }
}
