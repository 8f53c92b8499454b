// src/graph/scheduler.rs

use std::collections::{HashMap, VecDeque};
use tracing::{debug, trace};

use super::Graph;
use crate::core::{Dataset, FlowError, NodeId, Result};

/// Node outputs that can be read as a dataset when feeding a successor.
pub trait DatasetSource {
    /// The tabular view of this output, if it has one.
    fn dataset(&self) -> Option<&Dataset>;
}

/// What a node receives from its predecessors.
#[derive(Debug, PartialEq)]
pub enum ResolvedInput<'a, O> {
    /// No predecessor has a stored output.
    None,
    /// Exactly one predecessor output, passed through unchanged.
    Single(&'a O),
    /// Several predecessor outputs, concatenated row-wise in edge order.
    Merged(Dataset),
}

impl<O: DatasetSource> ResolvedInput<'_, O> {
    /// The dataset view of the input, if any.
    pub fn dataset(&self) -> Option<&Dataset> {
        match self {
            ResolvedInput::None => None,
            ResolvedInput::Single(output) => output.dataset(),
            ResolvedInput::Merged(dataset) => Some(dataset),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ResolvedInput::None)
    }
}

/// Orders a graph and holds the outputs of the nodes run so far.
///
/// The store lives for one run only; `clear` discards it.
#[derive(Debug)]
pub struct GraphScheduler<O> {
    outputs: HashMap<NodeId, O>,
}

impl<O> Default for GraphScheduler<O> {
    fn default() -> Self {
        Self {
            outputs: HashMap::new(),
        }
    }
}

impl<O> GraphScheduler<O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kahn's algorithm. The queue is seeded with the zero in-degree nodes
    /// in declaration order and successors are released in edge order, so
    /// the result is deterministic for a given graph.
    pub fn compute_order(&self, graph: &Graph) -> Result<Vec<NodeId>> {
        let mut in_degree: HashMap<&NodeId, usize> = graph.nodes.iter().map(|n| (&n.id, 0)).collect();
        let mut adjacency: HashMap<&NodeId, Vec<&NodeId>> = HashMap::new();

        for edge in &graph.edges {
            if !in_degree.contains_key(&edge.source) {
                return Err(FlowError::UnknownNode(edge.source.clone()));
            }
            let degree = in_degree
                .get_mut(&edge.target)
                .ok_or_else(|| FlowError::UnknownNode(edge.target.clone()))?;
            *degree += 1;
            adjacency.entry(&edge.source).or_default().push(&edge.target);
        }

        let mut queue: VecDeque<&NodeId> = graph
            .nodes
            .iter()
            .map(|n| &n.id)
            .filter(|id| in_degree.get(id) == Some(&0))
            .collect();
        let mut order = Vec::with_capacity(graph.nodes.len());

        while let Some(id) = queue.pop_front() {
            order.push(id.clone());
            for &next in adjacency.get(id).map(Vec::as_slice).unwrap_or_default() {
                if let Some(degree) = in_degree.get_mut(next) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(next);
                    }
                }
            }
        }

        if order.len() != graph.nodes.len() {
            let remaining = graph
                .nodes
                .iter()
                .filter(|n| in_degree.get(&n.id).is_some_and(|d| *d > 0))
                .map(|n| n.id.clone())
                .collect();
            return Err(FlowError::CycleDetected { remaining });
        }

        debug!(order = ?order.iter().map(NodeId::as_str).collect::<Vec<_>>(), "execution order computed");
        Ok(order)
    }

    /// Records the output of `node_id`, replacing any earlier one.
    pub fn store(&mut self, node_id: NodeId, output: O) {
        trace!(node = %node_id, "output stored");
        self.outputs.insert(node_id, output);
    }

    pub fn fetch(&self, node_id: &NodeId) -> Option<&O> {
        self.outputs.get(node_id)
    }

    /// Drops every stored output.
    pub fn clear(&mut self) {
        self.outputs.clear();
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

impl<O: DatasetSource> GraphScheduler<O> {
    /// Collects the stored outputs of `node_id`'s predecessors.
    ///
    /// Predecessors without a stored output are skipped. With several
    /// outputs, the dataset views are concatenated in edge order and outputs
    /// without a dataset view contribute nothing.
    pub fn resolve_inputs(&self, graph: &Graph, node_id: &NodeId) -> Result<ResolvedInput<'_, O>> {
        if !graph.contains(node_id) {
            return Err(FlowError::UnknownNode(node_id.clone()));
        }
        let inputs: Vec<&O> = graph.predecessors(node_id).filter_map(|p| self.outputs.get(p)).collect();
        match inputs.as_slice() {
            [] => Ok(ResolvedInput::None),
            [single] => Ok(ResolvedInput::Single(*single)),
            many => {
                let merged = Dataset::concat(many.iter().filter_map(|o| o.dataset()))
                    .map_err(|e| e.with_node(node_id))?;
                debug!(node = %node_id, sources = many.len(), rows = merged.rows(), "inputs merged");
                Ok(ResolvedInput::Merged(merged))
            }
        }
    }
}
