//! Error handling logic

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identifier of a node in a workflow graph.
/// Ids are assigned by the editor that produced the graph and are only
/// required to be unique within that graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Creates a node id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Errors that abort a workflow run.
///
/// Every variant is fatal for the run it occurs in: the runner discards the
/// run's stored node outputs and reports a single `error` result.
#[derive(Debug, Error)]
pub enum FlowError {
    /// The graph contains at least one cycle. `remaining` lists the nodes
    /// that could not be scheduled.
    #[error("Circular dependency detected in workflow ({} node(s) unschedulable: {})", .remaining.len(), join_ids(.remaining))]
    CycleDetected {
        /// Nodes left with a non-zero in-degree after Kahn's algorithm.
        remaining: Vec<NodeId>,
    },

    /// A node that needs upstream data has no resolvable predecessor output.
    #[error("Node '{node_id}' requires input data but no predecessor produced any")]
    MissingInput {
        /// The node that could not be fed.
        node_id: NodeId,
    },

    /// Malformed feature rows, mismatched labels or non-finite values.
    #[error("Invalid dataset{}: {message}", node_suffix(.node_id))]
    InvalidDataset {
        /// The node whose data was rejected, when known.
        node_id: Option<NodeId>,
        /// What was wrong with the data.
        message: String,
    },

    #[error("Unknown gate: {0}")]
    UnknownGate(String),

    #[error("Unknown model type: {0}")]
    UnknownModelType(String),

    #[error("Unknown encoding method: {0}")]
    UnknownEncoding(String),

    #[error("Unknown preprocessing operation: {0}")]
    UnknownPreprocessOperation(String),

    /// An edge or lookup referenced a node id that is not part of the graph.
    #[error("Unknown node '{0}'")]
    UnknownNode(NodeId),

    /// Structural validation of the graph failed.
    #[error("Invalid workflow graph: {message}")]
    InvalidGraph {
        message: String,
    },

    /// An operation is inconsistent with the current state (bad qubit index, arity, ...).
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        message: String,
    },

    /// The model type needs an external numeric backend and none was registered.
    #[error("Model type '{model_type}' requires an external training backend, none registered")]
    BackendUnavailable {
        model_type: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FlowError {
    /// Shorthand for an `InvalidDataset` error not yet attributed to a node.
    pub fn invalid_dataset(message: impl Into<String>) -> Self {
        Self::InvalidDataset {
            node_id: None,
            message: message.into(),
        }
    }

    /// Shorthand for an `InvalidOperation` error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Attributes a dataset error to `node_id` if it is not attributed yet.
    /// Other variants pass through unchanged.
    pub fn with_node(self, node_id: &NodeId) -> Self {
        match self {
            Self::InvalidDataset { node_id: None, message } => Self::InvalidDataset {
                node_id: Some(node_id.clone()),
                message,
            },
            other => other,
        }
    }
}

fn node_suffix(node_id: &Option<NodeId>) -> String {
    node_id
        .as_ref()
        .map(|id| format!(" at node '{}'", id))
        .unwrap_or_default()
}

fn join_ids(ids: &[NodeId]) -> String {
    ids.iter().map(NodeId::as_str).collect::<Vec<_>>().join(", ")
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, FlowError>;
