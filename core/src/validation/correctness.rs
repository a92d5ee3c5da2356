//! Flow Correctness Verification
//!
//! Checks a finished (or in-progress) flow against the properties every
//! valid maximum-flow state satisfies, independently of how it was
//! computed:
//!
//! - antisymmetry: `flow(u, v) == -flow(v, u)`
//! - capacity respect: `flow(u, v) <= capacity(u, v)`
//! - conservation at every node other than source and sink
//! - reported value equals the net outflow of the source
//! - for exact results, reported value equals the minimum cut capacity
//!
//! Every violated property is collected, so one report explains all that
//! went wrong.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use serde::{Deserialize, Serialize};

use crate::algorithm::graph::max_flow::MaxFlowResult;
use crate::algorithm::traits::{Capacity, NodeIndex, ResidualNetwork};
use crate::data_structures::graph::CapacityGraph;
use crate::data_structures::residual::{DenseResidualGraph, FlowAssignment, ResidualStore, SparseResidualGraph};

/// Relative tolerance for comparing float sums
const RELATIVE_TOLERANCE: f64 = 1e-9;

/// Read-only view of signed flow values
pub trait FlowView<C: Capacity> {
    fn node_count(&self) -> usize;
    fn flow(&self, from: NodeIndex, to: NodeIndex) -> C;
}

impl<C: Capacity> FlowView<C> for FlowAssignment<C> {
    fn node_count(&self) -> usize {
        FlowAssignment::node_count(self)
    }

    fn flow(&self, from: NodeIndex, to: NodeIndex) -> C {
        FlowAssignment::flow(self, from, to)
    }
}

macro_rules! residual_flow_view {
    ($($network:ident),*) => {
        $(
            impl<C: Capacity> FlowView<C> for $network<C> {
                fn node_count(&self) -> usize {
                    ResidualNetwork::node_count(self)
                }

                fn flow(&self, from: NodeIndex, to: NodeIndex) -> C {
                    ResidualNetwork::flow(self, from, to)
                }
            }
        )*
    };
}

residual_flow_view!(DenseResidualGraph, SparseResidualGraph, ResidualStore);

/// A single violated property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CertificateViolation {
    ShapeMismatch { graph_nodes: usize, flow_nodes: usize },
    Antisymmetry { from: NodeIndex, to: NodeIndex },
    CapacityExceeded { from: NodeIndex, to: NodeIndex, flow: f64, capacity: f64 },
    Conservation { node: NodeIndex, imbalance: f64 },
    ValueMismatch { reported: f64, source_outflow: f64 },
    CutMismatch { reported: f64, cut_capacity: f64 },
    MissingCut,
}

/// Outcome of a certificate check
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CertificateReport {
    violations: Vec<CertificateViolation>,
}

impl CertificateReport {
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[CertificateViolation] {
        &self.violations
    }
}

/// Flow certificate checker
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowCertificate;

impl FlowCertificate {
    /// Verifies a finished run
    pub fn verify<C: Capacity>(
        graph: &CapacityGraph<C>,
        source: NodeIndex,
        sink: NodeIndex,
        result: &MaxFlowResult<C>,
    ) -> CertificateReport {
        let mut report = Self::verify_flow(graph, source, sink, &result.flow, result.max_flow);

        if result.is_exact() {
            match &result.min_cut {
                Some(cut) if !approx_eq(cut.capacity, result.max_flow) => {
                    report.violations.push(CertificateViolation::CutMismatch {
                        reported: as_f64(result.max_flow),
                        cut_capacity: as_f64(cut.capacity),
                    });
                }
                Some(_) => {}
                None => report.violations.push(CertificateViolation::MissingCut),
            }
        }

        if !report.is_valid() {
            log::warn!("flow certificate rejected: {} violations", report.violations.len());
        }
        report
    }

    /// Verifies any flow state against `graph` and a claimed value
    pub fn verify_flow<C, F>(
        graph: &CapacityGraph<C>,
        source: NodeIndex,
        sink: NodeIndex,
        flow: &F,
        claimed: C,
    ) -> CertificateReport
    where
        C: Capacity,
        F: FlowView<C>,
    {
        let mut violations = Vec::new();
        let node_count = graph.node_count();

        if flow.node_count() != node_count {
            violations.push(CertificateViolation::ShapeMismatch {
                graph_nodes: node_count,
                flow_nodes: flow.node_count(),
            });
            return CertificateReport { violations };
        }

        for from in 0..node_count {
            for to in 0..node_count {
                let value = flow.flow(from, to);
                if from < to && value != -flow.flow(to, from) {
                    violations.push(CertificateViolation::Antisymmetry { from, to });
                }
                let capacity = graph.capacity(from, to);
                if value > capacity {
                    violations.push(CertificateViolation::CapacityExceeded {
                        from,
                        to,
                        flow: as_f64(value),
                        capacity: as_f64(capacity),
                    });
                }
            }
        }

        let net_outflow = |node: NodeIndex| {
            (0..node_count).fold(C::zero(), |total, other| total + flow.flow(node, other))
        };

        for node in (0..node_count).filter(|&node| node != source && node != sink) {
            let imbalance = net_outflow(node);
            if !approx_eq(imbalance, C::zero()) {
                violations.push(CertificateViolation::Conservation {
                    node,
                    imbalance: as_f64(imbalance),
                });
            }
        }

        let source_outflow = net_outflow(source);
        if !approx_eq(source_outflow, claimed) {
            violations.push(CertificateViolation::ValueMismatch {
                reported: as_f64(claimed),
                source_outflow: as_f64(source_outflow),
            });
        }

        CertificateReport { violations }
    }
}

fn as_f64<C: Capacity>(value: C) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

fn approx_eq<C: Capacity>(left: C, right: C) -> bool {
    if left == right {
        return true;
    }
    let (left, right) = (as_f64(left), as_f64(right));
    let scale = left.abs().max(right.abs()).max(1.0);
    (left - right).abs() <= RELATIVE_TOLERANCE * scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::graph::max_flow::{compute_max_flow, MaxFlowConfig, MaxFlowEngine};

    fn chain() -> CapacityGraph<i64> {
        CapacityGraph::from_matrix(&[vec![0, 5, 0], vec![0, 0, 3], vec![0, 0, 0]]).unwrap()
    }

    #[test]
    fn test_valid_result_passes() {
        let graph = chain();
        let result = compute_max_flow(&graph, 0, 2, MaxFlowConfig::default()).unwrap();
        let report = FlowCertificate::verify(&graph, 0, 2, &result);
        assert!(report.is_valid(), "{:?}", report.violations());
    }

    #[test]
    fn test_conservation_violation_detected() {
        let graph = chain();
        let mut network = DenseResidualGraph::new(&graph);
        network.push_flow(0, 1, 4).unwrap();
        network.push_flow(1, 2, 3).unwrap();

        let report = FlowCertificate::verify_flow(&graph, 0, 2, &network, 4);
        assert_eq!(
            report.violations(),
            &[CertificateViolation::Conservation { node: 1, imbalance: -1.0 }]
        );
    }

    #[test]
    fn test_wrong_claim_detected() {
        let graph = chain();
        let result = compute_max_flow(&graph, 0, 2, MaxFlowConfig::default()).unwrap();

        let report = FlowCertificate::verify_flow(&graph, 0, 2, &result.flow, 5);
        assert_eq!(
            report.violations(),
            &[CertificateViolation::ValueMismatch { reported: 5.0, source_outflow: 3.0 }]
        );
    }

    #[test]
    fn test_cut_mismatch_detected() {
        let graph = chain();
        let mut result = compute_max_flow(&graph, 0, 2, MaxFlowConfig::default()).unwrap();
        if let Some(cut) = result.min_cut.as_mut() {
            cut.capacity = 5;
        }
        let report = FlowCertificate::verify(&graph, 0, 2, &result);
        assert_eq!(
            report.violations(),
            &[CertificateViolation::CutMismatch { reported: 3.0, cut_capacity: 5.0 }]
        );
    }

    #[test]
    fn test_in_progress_engine_state_is_checkable() {
        let graph = chain();
        let mut engine = MaxFlowEngine::new(&graph, 0, 2).unwrap();
        while engine.step().unwrap() != crate::algorithm::graph::max_flow::EnginePhase::Done {
            let report = FlowCertificate::verify_flow(&graph, 0, 2, engine.network(), engine.total_flow());
            assert!(report.is_valid());
        }
    }

    #[test]
    fn test_shape_mismatch() {
        let graph = chain();
        let other = CapacityGraph::from_matrix(&[vec![0_i64, 1], vec![0, 0]]).unwrap();
        let network = SparseResidualGraph::new(&other);
        let report = FlowCertificate::verify_flow(&graph, 0, 2, &network, 0);
        assert_eq!(
            report.violations(),
            &[CertificateViolation::ShapeMismatch { graph_nodes: 3, flow_nodes: 2 }]
        );
    }
}
