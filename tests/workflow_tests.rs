// tests/workflow_tests.rs

use hybridflow::core::Dataset;
use hybridflow::ml::{ClassifierParams, ExternalTrainer, ExternalTraining, TrainingEpoch};
use hybridflow::{
    FlowError, Graph, GraphScheduler, Node, NodeKind, NodeOutput, ResultKind, RunConfig, SummaryValue,
    WorkflowRunner,
};
use serde_json::{Value, json};
use std::sync::Arc;

// Helper building the usual input -> ... -> output chain
fn chain(nodes: Vec<Node>) -> Graph {
    let mut graph = Graph::new();
    let ids: Vec<String> = nodes.iter().map(|n| n.id.to_string()).collect();
    for node in nodes {
        graph.add_node(node);
    }
    for pair in ids.windows(2) {
        graph.connect(pair[0].as_str(), pair[1].as_str());
    }
    graph
}

fn hybrid_graph() -> Graph {
    chain(vec![
        Node::new("data", NodeKind::Input, json!({ "dataset": "quantum_prep" })),
        Node::new(
            "circuit",
            NodeKind::Quantum,
            json!({
                "numQubits": 3,
                "shots": 256,
                "encodingMethod": "angle",
                "circuit": [
                    { "gate": "H", "qubits": [0] },
                    { "gate": "CNOT", "qubits": [0, 1] },
                    { "gate": "RY", "qubits": [2], "angle": 0.3 }
                ]
            }),
        ),
        Node::new("clf", NodeKind::Ml, json!({ "modelType": "knn", "k": 3 })),
        Node::new("report", NodeKind::Output, Value::Null),
    ])
}

#[test]
fn test_hybrid_pipeline_reports_ml_result() -> Result<(), FlowError> {
    let result = WorkflowRunner::new(RunConfig::seeded(11)).try_run(&hybrid_graph())?;
    assert_eq!(result.kind, ResultKind::Ml);
    assert_eq!(result.get("totalSamples"), Some(&SummaryValue::Integer(8)));
    assert_eq!(result.get("modelType"), Some(&SummaryValue::from("knn")));
    Ok(())
}

#[test]
fn test_quantum_node_output_is_a_feature_matrix() -> Result<(), FlowError> {
    let graph = chain(vec![
        Node::new("data", NodeKind::Input, json!({ "dataset": "xor" })),
        Node::new("q", NodeKind::Quantum, json!({ "numQubits": 2, "shots": 100, "encodingMethod": "basis" })),
        Node::new("out", NodeKind::Output, Value::Null),
    ]);
    let result = WorkflowRunner::new(RunConfig::seeded(5)).try_run(&graph)?;
    assert_eq!(result.kind, ResultKind::Quantum);
    assert_eq!(result.get("samples"), Some(&SummaryValue::Integer(4)));
    assert_eq!(result.get("totalShots"), Some(&SummaryValue::Integer(400)));
    let rows = result.raw_data["quantumFeatures"].as_array().map(Vec::len);
    assert_eq!(rows, Some(4));
    assert_eq!(result.raw_data["labels"], json!([0, 1, 1, 0]));
    Ok(())
}

#[test]
fn test_classifier_predictions_prepare_the_register() -> Result<(), FlowError> {
    let graph = chain(vec![
        Node::new("data", NodeKind::Input, json!({ "dataset": "xor" })),
        Node::new("clf", NodeKind::Ml, json!({ "modelType": "knn", "k": 1 })),
        Node::new(
            "q",
            NodeKind::Quantum,
            json!({ "numQubits": 2, "shots": 500, "circuit": [{ "gate": "Z", "qubits": [0] }] }),
        ),
        Node::new("out", NodeKind::Output, Value::Null),
    ]);
    let result = WorkflowRunner::new(RunConfig::seeded(3)).try_run(&graph)?;

    assert_eq!(result.kind, ResultKind::Quantum);
    assert_eq!(result.get("samples"), Some(&SummaryValue::Integer(1)));
    assert_eq!(result.raw_data["encoding"], "amplitude");
    // predictions [0, 1, 1, 0] give (|01> + |10>)/sqrt(2)
    let outcomes: Vec<&String> = result.raw_data["measurements"]
        .as_object()
        .map(|m| m.keys().collect())
        .unwrap_or_default();
    assert_eq!(outcomes, vec!["01", "10"]);
    assert_eq!(result.get("entangled"), Some(&SummaryValue::from("yes")));
    Ok(())
}

#[test]
fn test_serialized_graph_reruns_identically() -> Result<(), FlowError> {
    let graph = hybrid_graph();
    let text = graph.to_json()?;
    let restored = Graph::from_json(&text)?;
    assert_eq!(restored, graph);

    let runner = WorkflowRunner::new(RunConfig::seeded(2024));
    let scheduler: GraphScheduler<NodeOutput> = GraphScheduler::new();
    assert_eq!(scheduler.compute_order(&graph)?, scheduler.compute_order(&restored)?);

    let first = runner.try_run(&graph)?;
    let second = runner.try_run(&restored)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_order_covers_every_node_and_edge() -> Result<(), FlowError> {
    let mut graph = Graph::new();
    for (id, kind) in [
        ("out", NodeKind::Output),
        ("ml", NodeKind::Ml),
        ("q", NodeKind::Quantum),
        ("prep", NodeKind::Preprocess),
        ("in", NodeKind::Input),
    ] {
        graph.add_node(Node::new(id, kind, Value::Null));
    }
    graph
        .connect("in", "prep")
        .connect("prep", "q")
        .connect("prep", "ml")
        .connect("q", "ml")
        .connect("ml", "out");

    let order = GraphScheduler::<NodeOutput>::new().compute_order(&graph)?;
    assert_eq!(order.len(), graph.nodes.len());
    let position = |id: &str| order.iter().position(|n| n.as_str() == id);
    for edge in &graph.edges {
        assert!(position(edge.source.as_str()) < position(edge.target.as_str()), "{:?}", edge);
    }
    Ok(())
}

#[test]
fn test_cycle_yields_single_error_result() {
    let mut graph = chain(vec![
        Node::new("in", NodeKind::Input, Value::Null),
        Node::new("a", NodeKind::Preprocess, json!({ "operations": ["normalize"] })),
        Node::new("b", NodeKind::Preprocess, json!({ "operations": ["standardize"] })),
        Node::new("out", NodeKind::Output, Value::Null),
    ]);
    graph.connect("b", "a");

    let runner = WorkflowRunner::default();
    assert!(matches!(runner.try_run(&graph), Err(FlowError::CycleDetected { .. })));
    let result = runner.run(&graph);
    assert_eq!(result.kind, ResultKind::Error);
    assert_eq!(result.summary.len(), 1);
}

#[test]
fn test_configuration_errors_surface_verbatim() {
    let runner = WorkflowRunner::default();

    let bad_gate = chain(vec![
        Node::new("in", NodeKind::Input, Value::Null),
        Node::new("q", NodeKind::Quantum, json!({ "circuit": [{ "gate": "TOFFOLI", "qubits": [0, 1, 2] }] })),
        Node::new("out", NodeKind::Output, Value::Null),
    ]);
    assert!(matches!(runner.try_run(&bad_gate), Err(FlowError::UnknownGate(ref g)) if g == "TOFFOLI"));

    let bad_model = chain(vec![
        Node::new("in", NodeKind::Input, Value::Null),
        Node::new("ml", NodeKind::Ml, json!({ "modelType": "svm" })),
        Node::new("out", NodeKind::Output, Value::Null),
    ]);
    assert!(matches!(runner.try_run(&bad_model), Err(FlowError::UnknownModelType(ref m)) if m == "svm"));

    let bad_dataset = chain(vec![
        Node::new("loader", NodeKind::Input, json!({ "dataset": "cifar" })),
        Node::new("out", NodeKind::Output, Value::Null),
    ]);
    match runner.try_run(&bad_dataset) {
        Err(FlowError::InvalidDataset { node_id: Some(id), .. }) => assert_eq!(id.as_str(), "loader"),
        other => panic!("expected InvalidDataset, got {:?}", other),
    }
}

#[test]
fn test_ragged_inline_data_is_rejected_with_node_id() {
    let graph = chain(vec![
        Node::new("upload", NodeKind::Input, json!({ "data": { "features": [[1.0, 2.0], [3.0]] } })),
        Node::new("out", NodeKind::Output, Value::Null),
    ]);
    let result = WorkflowRunner::default().run(&graph);
    assert!(result.is_error());
    assert_eq!(result.get("nodeId"), Some(&SummaryValue::from("upload")));
}

#[test]
fn test_non_numeric_inline_cell_is_a_dataset_error() {
    let graph = chain(vec![
        Node::new("in", NodeKind::Input, json!({ "data": { "features": [[1.0, "abc"]], "labels": [1] } })),
        Node::new("out", NodeKind::Output, Value::Null),
    ]);
    let runner = WorkflowRunner::default();
    assert!(runner.validate(&graph).is_valid());
    match runner.try_run(&graph) {
        Err(FlowError::InvalidDataset { node_id: Some(id), .. }) => assert_eq!(id.as_str(), "in"),
        other => panic!("expected InvalidDataset, got {:?}", other),
    }
    assert_eq!(runner.run(&graph).get("nodeId"), Some(&SummaryValue::from("in")));
}

#[test]
fn test_structural_errors_are_reported_before_running() {
    let graph = chain(vec![
        Node::new("in", NodeKind::Input, Value::Null),
        Node::new("ml", NodeKind::Ml, Value::Null),
    ]);
    let runner = WorkflowRunner::default();
    assert!(!runner.validate(&graph).is_valid());
    assert!(matches!(runner.try_run(&graph), Err(FlowError::InvalidGraph { .. })));
}

#[test]
fn test_multiple_predecessors_are_concatenated() -> Result<(), FlowError> {
    let mut graph = Graph::new();
    graph
        .add_node(Node::new("a", NodeKind::Input, json!({ "dataset": "xor" })))
        .add_node(Node::new("b", NodeKind::Input, json!({ "dataset": "iris" })))
        .add_node(Node::new("prep", NodeKind::Preprocess, json!({ "operations": ["scale"] })))
        .add_node(Node::new("out", NodeKind::Output, Value::Null))
        .connect("a", "prep")
        .connect("b", "prep")
        .connect("prep", "out");

    let result = WorkflowRunner::default().try_run(&graph)?;
    assert_eq!(result.kind, ResultKind::Info);
    assert_eq!(result.get("rows"), Some(&SummaryValue::Integer(34)));
    assert_eq!(result.get("labeled"), Some(&SummaryValue::from("yes")));
    Ok(())
}

struct MajorityTrainer;

impl ExternalTrainer for MajorityTrainer {
    fn train(&self, data: &Dataset, params: &ClassifierParams) -> hybridflow::Result<ExternalTraining> {
        let history = (1..=params.epochs)
            .map(|epoch| TrainingEpoch { epoch, accuracy: 0.5, loss: 0.7 })
            .collect();
        Ok(ExternalTraining { predictions: vec![1; data.rows()], history })
    }
}

#[test]
fn test_network_models_need_a_backend() -> Result<(), FlowError> {
    let graph = chain(vec![
        Node::new("in", NodeKind::Input, json!({ "dataset": "iris" })),
        Node::new("nn", NodeKind::Ml, json!({ "modelType": "neural-network", "epochs": 5 })),
        Node::new("out", NodeKind::Output, Value::Null),
    ]);

    let bare = WorkflowRunner::default();
    assert!(matches!(bare.try_run(&graph), Err(FlowError::BackendUnavailable { .. })));

    let backed = WorkflowRunner::default().with_external_trainer(Arc::new(MajorityTrainer));
    let result = backed.try_run(&graph)?;
    assert_eq!(result.kind, ResultKind::Ml);
    // 20 of the 30 iris rows are labelled 1
    assert_eq!(result.get("correctPredictions"), Some(&SummaryValue::Integer(20)));
    assert_eq!(result.get("recall"), Some(&SummaryValue::from("100.00%")));
    Ok(())
}
