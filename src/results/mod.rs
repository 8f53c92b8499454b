// src/results/mod.rs

//! Converts node outputs into the single result object a run reports.
//!
//! Every function here is pure: the same output always produces the same
//! result, and nothing is retained between calls.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt;

use crate::core::{Dataset, FlowError};
use crate::ml::{ClassifierOutput, ClusteringOutput};
use crate::simulation::{QuantumBatch, QuantumRunResult};
use crate::workflow::NodeOutput;

/// Which renderer the result is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Ml,
    Quantum,
    Clustering,
    Error,
    Info,
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResultKind::Ml => "ml",
            ResultKind::Quantum => "quantum",
            ResultKind::Clustering => "clustering",
            ResultKind::Error => "error",
            ResultKind::Info => "info",
        };
        f.write_str(name)
    }
}

/// A summary entry: a count, a plain number or pre-formatted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SummaryValue {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl From<usize> for SummaryValue {
    fn from(value: usize) -> Self {
        SummaryValue::Integer(value as i64)
    }
}

impl From<f64> for SummaryValue {
    fn from(value: f64) -> Self {
        SummaryValue::Number(value)
    }
}

impl From<String> for SummaryValue {
    fn from(value: String) -> Self {
        SummaryValue::Text(value)
    }
}

impl From<&str> for SummaryValue {
    fn from(value: &str) -> Self {
        SummaryValue::Text(value.to_string())
    }
}

impl fmt::Display for SummaryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryValue::Integer(v) => write!(f, "{}", v),
            SummaryValue::Number(v) => write!(f, "{:.4}", v),
            SummaryValue::Text(v) => f.write_str(v),
        }
    }
}

/// `{type, summary, rawData}` as handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowResult {
    #[serde(rename = "type")]
    pub kind: ResultKind,
    pub summary: BTreeMap<String, SummaryValue>,
    pub raw_data: Value,
}

impl WorkflowResult {
    fn new(kind: ResultKind, raw_data: Value) -> Self {
        Self {
            kind,
            summary: BTreeMap::new(),
            raw_data,
        }
    }

    fn with(mut self, key: &str, value: impl Into<SummaryValue>) -> Self {
        self.summary.insert(key.to_string(), value.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.kind == ResultKind::Error
    }

    /// Looks up a summary entry.
    pub fn get(&self, key: &str) -> Option<&SummaryValue> {
        self.summary.get(key)
    }
}

impl fmt::Display for WorkflowResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}]", self.kind)?;
        for (key, value) in &self.summary {
            writeln!(f, "  {}: {}", key, value)?;
        }
        Ok(())
    }
}

/// `0.875` -> `"87.50%"`. Non-finite values render as `"N/A"`.
pub fn format_percentage(value: f64) -> String {
    if value.is_finite() {
        format!("{:.2}%", value * 100.0)
    } else {
        "N/A".to_string()
    }
}

/// Builds `WorkflowResult`s from engine outputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultsAggregator;

impl ResultsAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Picks the renderer from the shape of the output.
    pub fn process(&self, output: &NodeOutput) -> WorkflowResult {
        match output {
            NodeOutput::Classifier(classifier) => self.process_ml(classifier),
            NodeOutput::Clustering(clustering) => self.process_clustering(clustering),
            NodeOutput::Quantum(batch) => self.process_quantum_batch(batch),
            NodeOutput::Data(dataset) => self.process_dataset(dataset),
            NodeOutput::Result(result) => result.clone(),
        }
    }

    pub fn process_ml(&self, output: &ClassifierOutput) -> WorkflowResult {
        let metrics = &output.metrics;
        let mut result = WorkflowResult::new(
            ResultKind::Ml,
            json!({
                "modelType": output.model_type,
                "model": output.model,
                "predictions": output.predictions,
                "metrics": metrics,
                "trainingHistory": output.training_history,
            }),
        )
        .with("modelType", output.model_type.as_str())
        .with("accuracy", format_percentage(metrics.accuracy))
        .with("precision", format_percentage(metrics.precision))
        .with("recall", format_percentage(metrics.recall))
        .with("f1Score", format_percentage(metrics.f1_score))
        .with("totalSamples", metrics.total_samples)
        .with("correctPredictions", metrics.correct_predictions);

        if let Some(multiclass) = &metrics.multiclass {
            result = result.with("numClasses", multiclass.classes.len());
        }
        if !output.training_history.is_empty() {
            result = result.with("epochs", output.training_history.len());
        }
        result
    }

    /// Result of a single circuit run. One-qubit runs also report their Bloch
    /// vector, two-qubit runs their concurrence.
    pub fn process_quantum(&self, run: &QuantumRunResult) -> WorkflowResult {
        let metrics = &run.state_metrics;
        let mut result = WorkflowResult::new(
            ResultKind::Quantum,
            json!({
                "measurements": run.measurements.counts(),
                "probabilities": run.measurements.probabilities(),
                "fidelity": run.fidelity,
                "stateMetrics": metrics,
                "quantumFeatures": run.quantum_features,
                "stateVector": run.final_state.vector(),
                "encoding": run.encoding,
            }),
        )
        .with("numQubits", run.num_qubits)
        .with("gatesApplied", run.gates_applied)
        .with("circuitDepth", run.circuit_depth)
        .with("fidelity", format_percentage(run.fidelity))
        .with("totalShots", run.measurements.shots())
        .with("samples", 1usize)
        .with("purity", format!("{:.4}", metrics.purity))
        .with("entropy", format!("{:.4}", metrics.entropy));

        if let Some([x, y, z]) = metrics.bloch_coordinates {
            result = result.with("blochVector", format!("({:.3}, {:.3}, {:.3})", x, y, z));
        }
        if let (Some(concurrence), Some(entangled)) = (metrics.concurrence, metrics.is_entangled) {
            result = result
                .with("concurrence", format!("{:.4}", concurrence))
                .with("entangled", if entangled { "yes" } else { "no" });
        }
        result
    }

    /// Result of a quantum node: counts are summed over every sample and the
    /// fidelity is the mean over the runs.
    pub fn process_quantum_batch(&self, batch: &QuantumBatch) -> WorkflowResult {
        if let [run] = batch.runs.as_slice() {
            return self.process_quantum(run);
        }
        let combined = match batch.combined_histogram() {
            Ok(histogram) => histogram,
            Err(err) => return self.error(&err),
        };
        let fidelity = batch.mean_fidelity();

        WorkflowResult::new(
            ResultKind::Quantum,
            json!({
                "measurements": combined.counts(),
                "probabilities": combined.probabilities(),
                "fidelity": fidelity,
                "quantumFeatures": batch.features.features(),
                "labels": batch.features.labels(),
                "stateMetrics": batch.runs.iter().map(|r| &r.state_metrics).collect::<Vec<_>>(),
                "encoding": batch.encoding,
            }),
        )
        .with("numQubits", batch.num_qubits)
        .with("gatesApplied", batch.gates_applied)
        .with("circuitDepth", batch.circuit_depth)
        .with("fidelity", format_percentage(fidelity))
        .with("totalShots", combined.shots())
        .with("samples", batch.len())
    }

    pub fn process_clustering(&self, output: &ClusteringOutput) -> WorkflowResult {
        let total = output.assignments.len();
        let clusters: Vec<Value> = output
            .cluster_sizes
            .iter()
            .enumerate()
            .map(|(idx, &size)| {
                let share = if total > 0 { size as f64 / total as f64 } else { 0.0 };
                json!({
                    "cluster": idx,
                    "size": size,
                    "percentage": format_percentage(share),
                    "centroid": output.centroids.get(idx),
                })
            })
            .collect();

        WorkflowResult::new(
            ResultKind::Clustering,
            json!({
                "model": output.model(),
                "centroids": output.centroids,
                "assignments": output.assignments,
                "clusters": clusters,
                "inertia": output.inertia,
            }),
        )
        .with("numClusters", output.k)
        .with("iterations", output.iterations)
        .with("totalPoints", total)
        .with("converged", if output.converged { "yes" } else { "no" })
        .with("inertia", output.inertia)
    }

    /// An output node fed straight from data has nothing to evaluate.
    pub fn process_dataset(&self, dataset: &Dataset) -> WorkflowResult {
        self.info("Workflow executed successfully", json!(dataset))
            .with("rows", dataset.rows())
            .with("columns", dataset.cols())
            .with("labeled", if dataset.labels().is_some() { "yes" } else { "no" })
    }

    pub fn error(&self, err: &FlowError) -> WorkflowResult {
        let node = match err {
            FlowError::MissingInput { node_id } => Some(node_id),
            FlowError::InvalidDataset { node_id, .. } => node_id.as_ref(),
            FlowError::UnknownNode(node_id) => Some(node_id),
            _ => None,
        };
        let mut result = self.error_message(&err.to_string());
        if let Some(node_id) = node {
            result = result.with("nodeId", node_id.as_str());
            result.raw_data["nodeId"] = json!(node_id);
        }
        result
    }

    pub fn error_message(&self, message: &str) -> WorkflowResult {
        WorkflowResult::new(ResultKind::Error, json!({ "error": message })).with("message", message)
    }

    pub fn info(&self, message: &str, data: Value) -> WorkflowResult {
        WorkflowResult::new(ResultKind::Info, data).with("message", message)
    }
}
