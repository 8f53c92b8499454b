// src/workflow/mod.rs

//! The run driver: validates a graph, orders it and executes every node.
//!
//! Each call to [`WorkflowRunner::try_run`] builds a fresh scheduler, fresh
//! engines and a fresh output store. Nothing survives between runs, so a
//! graph that is serialized and run again with the same seed produces the
//! same result.

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::circuits::Circuit;
use crate::core::rng::seeded_rng;
use crate::core::{Dataset, FlowError, NodeId, Result, DEFAULT_DATASET};
use crate::data::get_dataset;
use crate::graph::{
    validate_graph, DatasetSource, Graph, GraphScheduler, MlTask, Node, NodeKind, ResolvedInput,
    ValidationReport,
};
use crate::ml::{ClassifierOutput, ClusteringOutput, ExternalTrainer, MlEngine};
use crate::preprocess::{apply_operations, train_test_split};
use crate::results::{ResultsAggregator, WorkflowResult};
use crate::simulation::{QuantumBatch, QuantumEngine};

/// Engine-level settings for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunConfig {
    /// Seeds measurement sampling, k-means++ and train/test shuffling.
    pub seed: Option<u64>,
    /// Built-in dataset used by input nodes that name none.
    pub default_dataset: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: None,
            default_dataset: DEFAULT_DATASET.to_string(),
        }
    }
}

impl RunConfig {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Seed of the `offset`-th random stream of a run.
    fn stream(&self, offset: u64) -> Option<u64> {
        self.seed.map(|s| s.wrapping_add(offset))
    }
}

/// What a node hands to its successors.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutput {
    Data(Dataset),
    Classifier(ClassifierOutput),
    Clustering(ClusteringOutput),
    Quantum(QuantumBatch),
    Result(WorkflowResult),
}

impl NodeOutput {
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeOutput::Data(_) => "data",
            NodeOutput::Classifier(_) => "classifier",
            NodeOutput::Clustering(_) => "clustering",
            NodeOutput::Quantum(_) => "quantum",
            NodeOutput::Result(_) => "result",
        }
    }
}

impl DatasetSource for NodeOutput {
    /// Data passes through as is; a quantum node exposes its per-sample
    /// feature matrix. Trained models and results have no tabular view.
    fn dataset(&self) -> Option<&Dataset> {
        match self {
            NodeOutput::Data(dataset) => Some(dataset),
            NodeOutput::Quantum(batch) => Some(&batch.features),
            NodeOutput::Classifier(_) | NodeOutput::Clustering(_) | NodeOutput::Result(_) => None,
        }
    }
}

impl fmt::Display for NodeOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeOutput::Data(d) => write!(f, "data {:?}", d.shape()),
            NodeOutput::Classifier(c) => write!(f, "{} classifier, accuracy {:.4}", c.model_type, c.metrics.accuracy),
            NodeOutput::Clustering(c) => write!(f, "{}", c),
            NodeOutput::Quantum(q) => write!(f, "quantum batch of {} run(s) on {} qubits", q.len(), q.num_qubits),
            NodeOutput::Result(r) => write!(f, "{} result", r.kind),
        }
    }
}

/// Executes workflow graphs.
#[derive(Default)]
pub struct WorkflowRunner {
    config: RunConfig,
    external: Option<Arc<dyn ExternalTrainer>>,
    aggregator: ResultsAggregator,
}

impl WorkflowRunner {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            external: None,
            aggregator: ResultsAggregator::new(),
        }
    }

    /// Registers the backend for the network model types.
    pub fn with_external_trainer(mut self, trainer: Arc<dyn ExternalTrainer>) -> Self {
        self.external = Some(trainer);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Structural check without running anything.
    pub fn validate(&self, graph: &Graph) -> ValidationReport {
        validate_graph(graph)
    }

    /// Runs `graph` and always returns a result; failures become a single
    /// `error` result.
    pub fn run(&self, graph: &Graph) -> WorkflowResult {
        match self.try_run(graph) {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "workflow run failed");
                self.aggregator.error(&err)
            }
        }
    }

    /// Runs `graph`, returning the result of the last output node in
    /// execution order.
    pub fn try_run(&self, graph: &Graph) -> Result<WorkflowResult> {
        info!(nodes = graph.nodes.len(), edges = graph.edges.len(), "workflow run started");
        let report = validate_graph(graph).into_result()?;
        for issue in &report.warnings {
            warn!(node = ?issue.node_id.as_ref().map(NodeId::as_str), "{}", issue.message);
        }

        let mut run = Run::new(&self.config, self.external.clone());
        let order = run.scheduler.compute_order(graph)?;

        let mut final_result = None;
        for id in &order {
            let node = graph.node(id).ok_or_else(|| FlowError::UnknownNode(id.clone()))?;
            debug!(node = %id, kind = %node.kind, "executing node");
            let output = run.execute(graph, node).map_err(|e| e.with_node(id))?;
            debug!(node = %id, kind = output.kind_name(), output = %output, "node complete");
            if let NodeOutput::Result(result) = &output {
                final_result = Some(result.clone());
            }
            run.scheduler.store(id.clone(), output);
        }

        info!(executed = order.len(), "workflow run complete");
        final_result.ok_or_else(|| FlowError::InvalidGraph {
            message: "workflow produced no output".to_string(),
        })
    }
}

/// State owned by a single run. Dropping it discards every node output.
struct Run<'c> {
    scheduler: GraphScheduler<NodeOutput>,
    quantum: QuantumEngine,
    ml: MlEngine,
    rng: StdRng,
    aggregator: ResultsAggregator,
    default_dataset: &'c str,
}

impl<'c> Run<'c> {
    fn new(config: &'c RunConfig, external: Option<Arc<dyn ExternalTrainer>>) -> Self {
        let mut ml = MlEngine::new(config.stream(1));
        if let Some(trainer) = external {
            ml = ml.with_external_trainer(trainer);
        }
        Self {
            scheduler: GraphScheduler::new(),
            quantum: QuantumEngine::new(config.stream(0)),
            ml,
            rng: seeded_rng(config.stream(2)),
            aggregator: ResultsAggregator::new(),
            default_dataset: &config.default_dataset,
        }
    }

    fn execute(&mut self, graph: &Graph, node: &Node) -> Result<NodeOutput> {
        match node.kind {
            NodeKind::Input => self.run_input(node),
            NodeKind::Preprocess => self.run_preprocess(graph, node),
            NodeKind::Ml => self.run_ml(graph, node),
            NodeKind::Quantum => self.run_quantum(graph, node),
            NodeKind::Output => self.run_output(graph, node),
        }
    }

    fn run_input(&mut self, node: &Node) -> Result<NodeOutput> {
        let config = node.input_config()?;
        let dataset = match config.record()? {
            Some(record) => Dataset::try_from(record)?,
            None => get_dataset(config.dataset.as_deref().unwrap_or(self.default_dataset))?,
        };
        debug!(node = %node.id, shape = ?dataset.shape(), "dataset loaded");
        Ok(NodeOutput::Data(dataset))
    }

    fn run_preprocess(&mut self, graph: &Graph, node: &Node) -> Result<NodeOutput> {
        let config = node.preprocess_config()?;
        let ops = config.parsed_operations()?;
        let input = self.scheduler.resolve_inputs(graph, &node.id)?;
        let data = required(&input, &node.id)?;

        let mut processed = apply_operations(data, &ops, &mut self.rng)?;
        if let Some(percent) = config.train_split {
            let test_size = (100.0 - percent) / 100.0;
            processed = train_test_split(&processed, test_size, &mut self.rng)?.train;
            debug!(node = %node.id, percent, rows = processed.rows(), "train split applied");
        }
        Ok(NodeOutput::Data(processed))
    }

    fn run_ml(&mut self, graph: &Graph, node: &Node) -> Result<NodeOutput> {
        let config = node.ml_config()?;
        let input = self.scheduler.resolve_inputs(graph, &node.id)?;
        let data = required(&input, &node.id)?;

        match config.task()? {
            MlTask::Clustering => {
                let output = self.ml.train_clustering(data, &config.clustering_params())?;
                Ok(NodeOutput::Clustering(output))
            }
            MlTask::Classification => {
                let output = self.ml.train_classifier(data, &config.classifier_params()?)?;
                Ok(NodeOutput::Classifier(output))
            }
        }
    }

    fn run_quantum(&mut self, graph: &Graph, node: &Node) -> Result<NodeOutput> {
        let config = node.quantum_config()?;
        let circuit = if config.circuit.is_empty() {
            Circuit::bell()
        } else {
            Circuit::from_specs(&config.circuit)?
        };
        let encoding = config.encoding()?;

        let input = self.scheduler.resolve_inputs(graph, &node.id)?;
        let batch = match (&input, input.dataset()) {
            (ResolvedInput::Single(NodeOutput::Classifier(classifier)), _) => {
                debug!(node = %node.id, "preparing state from classifier predictions");
                self.quantum
                    .run_from_predictions(config.num_qubits(), &circuit, config.shots(), &classifier.predictions)?
            }
            (_, samples) => {
                if samples.is_none() && !input.is_none() {
                    debug!(node = %node.id, "predecessor output has no samples, running unencoded");
                }
                self.quantum
                    .run_batch(config.num_qubits(), &circuit, config.shots(), samples, encoding)?
            }
        };
        Ok(NodeOutput::Quantum(batch))
    }

    fn run_output(&mut self, graph: &Graph, node: &Node) -> Result<NodeOutput> {
        let result = match self.scheduler.resolve_inputs(graph, &node.id)? {
            ResolvedInput::None => return Err(FlowError::MissingInput { node_id: node.id.clone() }),
            ResolvedInput::Single(output) => self.aggregator.process(output),
            ResolvedInput::Merged(dataset) => self.aggregator.process_dataset(&dataset),
        };
        Ok(NodeOutput::Result(result))
    }
}

fn required<'a>(input: &'a ResolvedInput<'_, NodeOutput>, node_id: &NodeId) -> Result<&'a Dataset> {
    input.dataset().ok_or_else(|| FlowError::MissingInput {
        node_id: node_id.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{ResultKind, SummaryValue};
    use serde_json::{Value, json};

    fn iris_graph(ml_config: Value) -> Graph {
        let mut graph = Graph::new();
        graph
            .add_node(Node::new("in", NodeKind::Input, json!({ "dataset": "iris" })))
            .add_node(Node::new("ml", NodeKind::Ml, ml_config))
            .add_node(Node::new("out", NodeKind::Output, Value::Null))
            .connect("in", "ml")
            .connect("ml", "out");
        graph
    }

    #[test]
    fn test_classifier_pipeline() -> Result<()> {
        let runner = WorkflowRunner::new(RunConfig::seeded(7));
        let result = runner.try_run(&iris_graph(json!({ "modelType": "logistic", "epochs": 100, "learningRate": 0.1 })))?;
        assert_eq!(result.kind, ResultKind::Ml);
        assert_eq!(result.get("modelType"), Some(&SummaryValue::from("logistic")));
        Ok(())
    }

    #[test]
    fn test_clustering_pipeline() -> Result<()> {
        let runner = WorkflowRunner::new(RunConfig::seeded(7));
        let result = runner.try_run(&iris_graph(json!({ "task": "clustering", "k": 2 })))?;
        assert_eq!(result.kind, ResultKind::Clustering);
        assert_eq!(result.get("numClusters"), Some(&SummaryValue::Integer(2)));
        Ok(())
    }

    #[test]
    fn test_input_straight_to_output_is_info() -> Result<()> {
        let mut graph = Graph::new();
        graph
            .add_node(Node::new("in", NodeKind::Input, json!({ "dataset": "xor" })))
            .add_node(Node::new("out", NodeKind::Output, Value::Null))
            .connect("in", "out");
        let result = WorkflowRunner::default().try_run(&graph)?;
        assert_eq!(result.kind, ResultKind::Info);
        assert_eq!(result.get("rows"), Some(&SummaryValue::Integer(4)));
        Ok(())
    }

    #[test]
    fn test_inline_data_wins_over_named_dataset() -> Result<()> {
        let mut graph = Graph::new();
        graph
            .add_node(Node::new(
                "in",
                NodeKind::Input,
                json!({ "dataset": "iris", "data": { "features": [[1.0], [2.0]], "labels": [0, 1] } }),
            ))
            .add_node(Node::new("out", NodeKind::Output, Value::Null))
            .connect("in", "out");
        let result = WorkflowRunner::default().try_run(&graph)?;
        assert_eq!(result.get("rows"), Some(&SummaryValue::Integer(2)));
        Ok(())
    }

    #[test]
    fn test_train_split_keeps_percentage() -> Result<()> {
        let mut graph = Graph::new();
        graph
            .add_node(Node::new("in", NodeKind::Input, json!({ "dataset": "iris" })))
            .add_node(Node::new("prep", NodeKind::Preprocess, json!({ "operations": ["normalize"], "trainSplit": 80 })))
            .add_node(Node::new("out", NodeKind::Output, Value::Null))
            .connect("in", "prep")
            .connect("prep", "out");
        let result = WorkflowRunner::new(RunConfig::seeded(3)).try_run(&graph)?;
        assert_eq!(result.get("rows"), Some(&SummaryValue::Integer(24)));
        Ok(())
    }

    #[test]
    fn test_ml_fed_by_a_model_has_missing_input() {
        let mut graph = iris_graph(json!({ "modelType": "perceptron" }));
        graph.add_node(Node::new("ml2", NodeKind::Ml, json!({}))).connect("ml", "ml2");
        let err = WorkflowRunner::default().try_run(&graph).unwrap_err();
        assert!(matches!(err, FlowError::MissingInput { ref node_id } if node_id.as_str() == "ml2"));
    }

    #[test]
    fn test_unknown_dataset_names_the_node() {
        let mut graph = Graph::new();
        graph
            .add_node(Node::new("source", NodeKind::Input, json!({ "dataset": "mnist" })))
            .add_node(Node::new("out", NodeKind::Output, Value::Null))
            .connect("source", "out");
        let result = WorkflowRunner::default().run(&graph);
        assert!(result.is_error());
        assert_eq!(result.get("nodeId"), Some(&SummaryValue::from("source")));
    }

    #[test]
    fn test_run_config_deserializes_with_defaults() -> Result<()> {
        let config: RunConfig = serde_json::from_str(r#"{ "seed": 9 }"#)?;
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.default_dataset, DEFAULT_DATASET);
        Ok(())
    }
}
