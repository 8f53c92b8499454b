// src/lib.rs

//! `hybridflow` - An execution engine for hybrid quantum/classical ML workflows
//!
//! A workflow is a directed graph of input, preprocess, ml, quantum and
//! output nodes. The runner orders the graph with Kahn's algorithm, executes
//! each node against a dense state-vector simulator or a set of classical
//! learners, and reports the output node's result as `{type, summary, rawData}`.

pub mod core;
pub mod operations;
pub mod circuits;
pub mod simulation;
pub mod validation;
pub mod ml;
pub mod preprocess;
pub mod data;
pub mod graph;
pub mod results;
pub mod workflow;

// Re-export the most common types for easier top-level use
pub use core::{Dataset, FlowError, NodeId, QuantumState, Result};
pub use operations::{EncodingMethod, Gate, GateOp};
pub use circuits::{Circuit, CircuitBuilder};
pub use simulation::{Histogram, QuantumBatch, QuantumEngine, QuantumRunResult};
pub use ml::{ClassifierParams, ClusteringParams, ExternalTrainer, MlEngine, ModelType};
pub use graph::{validate_graph, Edge, Graph, GraphScheduler, Node, NodeKind};
pub use results::{ResultKind, ResultsAggregator, SummaryValue, WorkflowResult};
pub use workflow::{NodeOutput, RunConfig, WorkflowRunner};
pub use validation::{check_normalization, purity, shannon_entropy, StateMetrics};

// Example 1: Bell pair on the simulator
// Prepares (|00> + |11>)/sqrt(2) and samples it.
/// ```
/// use hybridflow::{Circuit, CircuitBuilder, GateOp, QuantumEngine};
///
/// let circuit = CircuitBuilder::new()
///     .add_op(GateOp::h(0))
///     .add_op(GateOp::cnot(0, 1))
///     .build();
/// assert_eq!(circuit, Circuit::bell());
///
/// let mut engine = QuantumEngine::new(Some(42));
/// match engine.run_workflow(2, &circuit, 2000, None, None) {
///     Ok(run) => {
///         println!("Circuit:\n{}", circuit);
///         println!("Result:\n{}", run);
///         // only the correlated outcomes are ever observed
///         assert!(run.measurements.counts().keys().all(|k| k == "00" || k == "11"));
///         assert!((run.fidelity - 0.5).abs() < 0.02);
///     }
///     Err(e) => {
///         eprintln!("Example 1 failed: {}", e);
///         assert!(false, "Example 1 failed"); // Force test failure
///     }
/// }
/// ```
#[doc(hidden)]
const _: () = (); // Attaches the preceding doc comment block to a hidden item

// Example 2: A workflow graph as the editor sends it
// Input -> classifier -> output, run with a fixed seed.
/// ```
/// use hybridflow::{Graph, ResultKind, RunConfig, WorkflowRunner};
///
/// let graph = Graph::from_json(r#"{
///     "nodes": [
///         { "id": "in",  "type": "input",  "config": { "dataset": "iris" } },
///         { "id": "clf", "type": "ml",     "config": { "modelType": "knn", "k": 3 } },
///         { "id": "out", "type": "output", "config": {} }
///     ],
///     "edges": [
///         { "source": "in",  "target": "clf" },
///         { "source": "clf", "target": "out" }
///     ]
/// }"#).expect("valid graph json");
///
/// let runner = WorkflowRunner::new(RunConfig::seeded(7));
/// let result = runner.run(&graph);
/// println!("{}", result);
/// assert_eq!(result.kind, ResultKind::Ml);
/// assert!(result.get("accuracy").is_some());
/// ```
#[doc(hidden)]
const _: () = (); // Attaches the preceding doc comment block to a hidden item

// Example 3: Failures become a single error result
// A two-node cycle is rejected before any node runs.
/// ```
/// use hybridflow::{FlowError, Graph, Node, NodeKind, RunConfig, WorkflowRunner};
/// use serde_json::{json, Value};
///
/// let mut graph = Graph::new();
/// graph
///     .add_node(Node::new("in", NodeKind::Input, json!({ "dataset": "xor" })))
///     .add_node(Node::new("a", NodeKind::Preprocess, Value::Null))
///     .add_node(Node::new("b", NodeKind::Preprocess, Value::Null))
///     .add_node(Node::new("out", NodeKind::Output, Value::Null))
///     .connect("in", "a")
///     .connect("a", "b")
///     .connect("b", "a")
///     .connect("b", "out");
///
/// let runner = WorkflowRunner::new(RunConfig::default());
/// match runner.try_run(&graph) {
///     Err(FlowError::CycleDetected { remaining }) => {
///         assert!(remaining.iter().any(|id| id.as_str() == "a"));
///     }
///     other => panic!("expected a cycle, got {:?}", other),
/// }
/// assert!(runner.run(&graph).is_error());
/// ```
#[doc(hidden)]
const _: () = (); // Attaches the preceding doc comment block to a hidden item
