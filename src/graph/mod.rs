// src/graph/mod.rs

//! Workflow graphs as produced by the visual editor, plus the scheduler that
//! orders and feeds them.

mod scheduler;
mod validation;

pub use scheduler::{DatasetSource, GraphScheduler, ResolvedInput};
pub use validation::{validate_graph, Severity, ValidationIssue, ValidationReport};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::{
    DatasetRecord, FlowError, NodeId, Result, DEFAULT_EPOCHS, DEFAULT_K, DEFAULT_LEARNING_RATE,
    DEFAULT_MAX_ITERATIONS, DEFAULT_NUM_QUBITS, DEFAULT_SHOTS,
};
use crate::ml::{ClassifierParams, ClusteringParams, ModelType};
use crate::operations::{EncodingMethod, GateSpec};
use crate::preprocess::PreprocessOp;

/// The five block types of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Input,
    Preprocess,
    Ml,
    Quantum,
    Output,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Input => "input",
            NodeKind::Preprocess => "preprocess",
            NodeKind::Ml => "ml",
            NodeKind::Quantum => "quantum",
            NodeKind::Output => "output",
        };
        f.write_str(name)
    }
}

/// One block of the workflow. `config` is kept as raw JSON and read through
/// the typed accessors so that a bad value is reported against its node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub config: serde_json::Value,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, kind: NodeKind, config: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            kind,
            label: None,
            config,
        }
    }

    /// Label for messages, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(self.id.as_str())
    }

    fn typed_config<T: DeserializeOwned + Default>(&self) -> Result<T> {
        if self.config.is_null() {
            return Ok(T::default());
        }
        serde_json::from_value(self.config.clone()).map_err(|e| FlowError::InvalidGraph {
            message: format!("node '{}' has an invalid {} config: {}", self.id, self.kind, e),
        })
    }

    pub fn input_config(&self) -> Result<InputConfig> {
        self.typed_config()
    }

    pub fn preprocess_config(&self) -> Result<PreprocessConfig> {
        self.typed_config()
    }

    pub fn ml_config(&self) -> Result<MlConfig> {
        self.typed_config()
    }

    pub fn quantum_config(&self) -> Result<QuantumConfig> {
        self.typed_config()
    }
}

/// A dependency: `target` consumes the output of `source`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
}

impl Edge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// `{ nodes, edges }`, in declaration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn connect(&mut self, source: impl Into<NodeId>, target: impl Into<NodeId>) -> &mut Self {
        self.edges.push(Edge::new(source, target));
        self
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Sources of the edges into `id`, in edge declaration order.
    pub fn predecessors<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a NodeId> + 'a {
        self.edges.iter().filter(move |e| &e.target == id).map(|e| &e.source)
    }

    /// Targets of the edges out of `id`, in edge declaration order.
    pub fn successors<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a NodeId> + 'a {
        self.edges.iter().filter(move |e| &e.source == id).map(|e| &e.target)
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

//-------------------------------------------------------------------------
// Node configurations
//-------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputConfig {
    /// Name of a built-in dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
    /// Inline data from the file-ingestion collaborator; wins over `dataset`.
    /// Kept raw so that bad cells surface as dataset errors when the node runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl InputConfig {
    /// Parses the inline data, if any.
    pub fn record(&self) -> Result<Option<DatasetRecord>> {
        self.data.as_ref().map(DatasetRecord::from_json).transpose()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreprocessConfig {
    #[serde(default)]
    pub operations: Vec<String>,
    /// Percentage of rows kept for training.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_split: Option<f64>,
}

impl PreprocessConfig {
    /// Parsed operation list; an empty list means `normalize`.
    pub fn parsed_operations(&self) -> Result<Vec<PreprocessOp>> {
        if self.operations.is_empty() {
            return Ok(vec![PreprocessOp::Normalize]);
        }
        self.operations.iter().map(|op| op.parse()).collect()
    }
}

/// What an ml node does with its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MlTask {
    #[default]
    Classification,
    Clustering,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MlConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epochs: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
}

impl MlConfig {
    pub fn task(&self) -> Result<MlTask> {
        match self.task.as_deref().map(str::trim) {
            None | Some("classification") => Ok(MlTask::Classification),
            Some("clustering") => Ok(MlTask::Clustering),
            Some(other) => Err(FlowError::invalid_operation(format!("unknown ml task '{}'", other))),
        }
    }

    pub fn classifier_params(&self) -> Result<ClassifierParams> {
        let model_type = match &self.model_type {
            Some(name) => name.parse::<ModelType>()?,
            None => ModelType::default(),
        };
        Ok(ClassifierParams {
            model_type,
            epochs: self.epochs.unwrap_or(DEFAULT_EPOCHS),
            learning_rate: self.learning_rate.unwrap_or(DEFAULT_LEARNING_RATE),
            k: self.k.unwrap_or(DEFAULT_K),
        })
    }

    pub fn clustering_params(&self) -> ClusteringParams {
        ClusteringParams {
            k: self.k.unwrap_or(DEFAULT_K),
            max_iterations: self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantumConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_qubits: Option<usize>,
    #[serde(default)]
    pub circuit: Vec<GateSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shots: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding_method: Option<String>,
}

impl QuantumConfig {
    pub fn num_qubits(&self) -> usize {
        self.num_qubits.unwrap_or(DEFAULT_NUM_QUBITS)
    }

    pub fn shots(&self) -> usize {
        self.shots.unwrap_or(DEFAULT_SHOTS)
    }

    pub fn encoding(&self) -> Result<EncodingMethod> {
        match &self.encoding_method {
            Some(name) => name.parse(),
            None => Ok(EncodingMethod::default()),
        }
    }
}
