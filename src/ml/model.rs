// src/ml/model.rs

//! Trained models and the outputs of training runs.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::knn::knn_predict;
use super::linear::sigmoid;
use super::metrics::Metrics;
use super::ModelType;
use crate::core::{Dataset, FlowError, Result};

/// A fitted model. Immutable once training returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TrainedModel {
    Perceptron { weights: Vec<f64>, bias: f64 },
    Logistic { weights: Vec<f64>, bias: f64 },
    Knn { features: Vec<Vec<f64>>, labels: Vec<i64>, k: usize },
    Kmeans { centroids: Vec<Vec<f64>>, assignments: Vec<usize> },
}

impl TrainedModel {
    /// Predicts one label (or cluster index for k-means) per row.
    pub fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<i64>> {
        let expected = self.input_width();
        if let Some(row) = features.iter().position(|x| expected.is_some_and(|w| x.len() != w)) {
            return Err(FlowError::invalid_dataset(format!(
                "row {} has {} features, the model expects {}",
                row,
                features[row].len(),
                expected.unwrap_or(0)
            )));
        }
        Ok(features.iter().map(|x| self.predict_one(x)).collect())
    }

    fn predict_one(&self, x: &[f64]) -> i64 {
        match self {
            TrainedModel::Perceptron { weights, bias } => {
                if linear_activation(weights, *bias, x) >= 0.0 { 1 } else { 0 }
            }
            TrainedModel::Logistic { weights, bias } => {
                if sigmoid(linear_activation(weights, *bias, x)) >= 0.5 { 1 } else { 0 }
            }
            TrainedModel::Knn { features, labels, k } => knn_predict(features, labels, *k, x),
            TrainedModel::Kmeans { centroids, .. } => super::kmeans::nearest_centroid(x, centroids) as i64,
        }
    }

    fn input_width(&self) -> Option<usize> {
        match self {
            TrainedModel::Perceptron { weights, .. } | TrainedModel::Logistic { weights, .. } => Some(weights.len()),
            TrainedModel::Knn { features, .. } => features.first().map(Vec::len),
            TrainedModel::Kmeans { centroids, .. } => centroids.first().map(Vec::len),
        }
    }
}

pub(crate) fn linear_activation(weights: &[f64], bias: f64, x: &[f64]) -> f64 {
    bias + weights.iter().zip(x).map(|(w, v)| w * v).sum::<f64>()
}

/// Accuracy and loss after one training epoch. `epoch` counts from 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingEpoch {
    pub epoch: usize,
    pub accuracy: f64,
    pub loss: f64,
}

/// Output of a classifier training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierOutput {
    pub model_type: ModelType,
    /// `None` when an external backend trained the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<TrainedModel>,
    pub predictions: Vec<i64>,
    pub metrics: Metrics,
    pub training_history: Vec<TrainingEpoch>,
    pub training_data: Dataset,
}

/// Output of a k-means run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteringOutput {
    pub centroids: Vec<Vec<f64>>,
    pub assignments: Vec<usize>,
    pub cluster_sizes: Vec<usize>,
    pub inertia: f64,
    pub k: usize,
    pub iterations: usize,
    pub converged: bool,
}

impl ClusteringOutput {
    /// The fitted centroids as a reusable model.
    pub fn model(&self) -> TrainedModel {
        TrainedModel::Kmeans {
            centroids: self.centroids.clone(),
            assignments: self.assignments.clone(),
        }
    }
}

impl fmt::Display for ClusteringOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "k-means: {} clusters, {} iterations{}, inertia {:.4}",
            self.k,
            self.iterations,
            if self.converged { " (converged)" } else { "" },
            self.inertia
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perceptron_predict_threshold_is_inclusive() -> Result<()> {
        let model = TrainedModel::Perceptron { weights: vec![1.0, -1.0], bias: 0.0 };
        assert_eq!(model.predict(&[vec![1.0, 1.0], vec![0.0, 1.0], vec![2.0, 1.0]])?, vec![1, 0, 1]);
        Ok(())
    }

    #[test]
    fn test_predict_rejects_wrong_width() {
        let model = TrainedModel::Logistic { weights: vec![0.5], bias: 0.0 };
        assert!(model.predict(&[vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn test_model_serializes_with_type_tag() {
        let model = TrainedModel::Knn { features: vec![vec![0.0]], labels: vec![1], k: 1 };
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["type"], "knn");
        assert_eq!(json["k"], 1);
    }
}
