// src/graph/validation.rs

//! Structural checks run before a workflow executes.

use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::fmt;

use super::{Graph, Node, NodeKind};
use crate::circuits::Circuit;
use crate::core::{FlowError, NodeId, Result};

const MAX_SENSIBLE_EPOCHS: usize = 1000;
const MAX_SENSIBLE_LEARNING_RATE: f64 = 0.1;
const MAX_FAST_QUBITS: usize = 10;
const MAX_SHALLOW_DEPTH: usize = 20;
const TRAIN_SPLIT_RANGE: std::ops::RangeInclusive<f64> = 50.0..=95.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    pub message: String,
    pub fix: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// `InvalidGraph` listing every error, or the report when there are none.
    pub fn into_result(self) -> Result<Self> {
        if self.is_valid() {
            return Ok(self);
        }
        let message = self.errors.iter().map(|e| e.message.as_str()).collect::<Vec<_>>().join("; ");
        Err(FlowError::InvalidGraph { message })
    }

    fn error(&mut self, node: Option<&Node>, message: String, fix: &str) {
        self.errors.push(ValidationIssue {
            severity: Severity::Error,
            node_id: node.map(|n| n.id.clone()),
            message,
            fix: fix.to_string(),
        });
    }

    fn warn(&mut self, node: Option<&Node>, message: String, fix: &str) {
        self.warnings.push(ValidationIssue {
            severity: Severity::Warning,
            node_id: node.map(|n| n.id.clone()),
            message,
            fix: fix.to_string(),
        });
    }
}

/// Checks a graph for structural errors and suspicious settings.
pub fn validate_graph(graph: &Graph) -> ValidationReport {
    let mut report = ValidationReport::default();
    check_structure(graph, &mut report);
    for node in &graph.nodes {
        check_node_config(node, &mut report);
    }
    check_connectivity(graph, &mut report);
    check_flow_patterns(graph, &mut report);
    report
}

fn check_structure(graph: &Graph, report: &mut ValidationReport) {
    if graph.nodes.is_empty() {
        report.error(None, "Workflow is empty".into(), "Add nodes to build a pipeline");
        return;
    }
    if graph.nodes_of_kind(NodeKind::Input).next().is_none() {
        report.error(None, "No Input node found".into(), "Add an Input node to load a dataset");
    }
    if graph.nodes_of_kind(NodeKind::Output).next().is_none() {
        report.error(None, "No Output node found".into(), "Add an Output node to see results");
    }

    let mut seen = HashSet::new();
    for node in &graph.nodes {
        if !seen.insert(&node.id) {
            report.error(Some(node), format!("Duplicate node id '{}'", node.id), "Give every node a unique id");
        }
    }
    for edge in &graph.edges {
        for end in [&edge.source, &edge.target] {
            if !graph.contains(end) {
                report.error(
                    None,
                    format!("Edge {} -> {} references unknown node '{}'", edge.source, edge.target, end),
                    "Remove the edge or add the missing node",
                );
            }
        }
    }
}

fn check_node_config(node: &Node, report: &mut ValidationReport) {
    let name = node.display_name().to_string();
    match node.kind {
        NodeKind::Input => {
            if let Err(e) = node.input_config() {
                report.error(Some(node), e.to_string(), "Fix the input node configuration");
            }
        }
        NodeKind::Preprocess => match node.preprocess_config() {
            Ok(config) => {
                if config.operations.is_empty() {
                    report.warn(
                        Some(node),
                        format!("Preprocess node \"{}\" has no operation selected, normalize is used", name),
                        "Choose normalize, standardize, pca or another operation",
                    );
                }
                if let Some(split) = config.train_split {
                    if !TRAIN_SPLIT_RANGE.contains(&split) {
                        report.warn(
                            Some(node),
                            format!("Unusual train/test split: {}%", split),
                            "Consider a split between 60% and 80%",
                        );
                    }
                }
            }
            Err(e) => report.error(Some(node), e.to_string(), "Fix the preprocess node configuration"),
        },
        NodeKind::Ml => match node.ml_config() {
            Ok(config) => {
                if config.model_type.is_none() {
                    report.warn(
                        Some(node),
                        format!("ML node \"{}\" has no model type selected, perceptron is used", name),
                        "Choose perceptron, logistic, knn or a network model",
                    );
                }
                if config.epochs.is_some_and(|e| e > MAX_SENSIBLE_EPOCHS) {
                    report.warn(
                        Some(node),
                        format!("Very high epoch count: {}", config.epochs.unwrap_or_default()),
                        "Start with 50-200 epochs",
                    );
                }
                if config.learning_rate.is_some_and(|lr| lr > MAX_SENSIBLE_LEARNING_RATE) {
                    report.warn(
                        Some(node),
                        format!("High learning rate: {}", config.learning_rate.unwrap_or_default()),
                        "Try a learning rate between 0.001 and 0.01",
                    );
                }
            }
            Err(e) => report.error(Some(node), e.to_string(), "Fix the ml node configuration"),
        },
        NodeKind::Quantum => match node.quantum_config() {
            Ok(config) => {
                if config.encoding_method.is_none() {
                    report.warn(
                        Some(node),
                        format!("Quantum node \"{}\" has no encoding method selected, angle is used", name),
                        "Choose basis, angle or amplitude encoding",
                    );
                }
                if config.num_qubits() > MAX_FAST_QUBITS {
                    report.warn(
                        Some(node),
                        format!("High qubit count: {}", config.num_qubits()),
                        "Simulating more than 10 qubits is slow",
                    );
                }
                if let Ok(circuit) = Circuit::from_specs(&config.circuit) {
                    if circuit.depth() > MAX_SHALLOW_DEPTH {
                        report.warn(
                            Some(node),
                            format!("Deep quantum circuit: {} layers", circuit.depth()),
                            "Very deep circuits take longer to simulate",
                        );
                    }
                }
            }
            Err(e) => report.error(Some(node), e.to_string(), "Fix the quantum node configuration"),
        },
        NodeKind::Output => {}
    }
}

fn check_connectivity(graph: &Graph, report: &mut ValidationReport) {
    for node in &graph.nodes {
        if node.kind != NodeKind::Input && graph.predecessors(&node.id).next().is_none() {
            report.error(
                Some(node),
                format!("Node \"{}\" is not connected to any input", node.display_name()),
                "Connect an upstream node to it",
            );
        }
    }

    let has_io = graph.nodes_of_kind(NodeKind::Input).next().is_some()
        && graph.nodes_of_kind(NodeKind::Output).next().is_some();
    if has_io && !has_path_from_input_to_output(graph) {
        report.error(
            None,
            "No valid path from Input to Output".into(),
            "Connect the nodes Input -> processing -> Output",
        );
    }
}

fn check_flow_patterns(graph: &Graph, report: &mut ValidationReport) {
    for quantum in graph.nodes_of_kind(NodeKind::Quantum) {
        let downstream = downstream_nodes(graph, &quantum.id);
        let classical_then_quantum = downstream
            .iter()
            .filter(|n| n.kind == NodeKind::Ml)
            .any(|ml| downstream_nodes(graph, &ml.id).iter().any(|n| n.kind == NodeKind::Quantum));
        if classical_then_quantum {
            report.warn(
                Some(quantum),
                "Quantum -> Classical -> Quantum pattern detected".into(),
                "Consider restructuring the workflow",
            );
        }
        if downstream.iter().any(|n| n.kind == NodeKind::Preprocess) {
            report.warn(
                Some(quantum),
                "Preprocessing after quantum transformation detected".into(),
                "Preprocess before quantum encoding",
            );
        }
    }
}

fn has_path_from_input_to_output(graph: &Graph) -> bool {
    graph
        .nodes_of_kind(NodeKind::Input)
        .any(|input| downstream_nodes(graph, &input.id).iter().any(|n| n.kind == NodeKind::Output))
}

/// Every node reachable from `start`, breadth first, `start` excluded.
fn downstream_nodes<'a>(graph: &'a Graph, start: &NodeId) -> Vec<&'a Node> {
    let mut visited: HashSet<&NodeId> = HashSet::new();
    let mut queue: VecDeque<&NodeId> = graph.successors(start).collect();
    let mut found = Vec::new();
    while let Some(id) = queue.pop_front() {
        if !visited.insert(id) {
            continue;
        }
        if let Some(node) = graph.node(id) {
            found.push(node);
            queue.extend(graph.successors(&node.id));
        }
    }
    found
}
