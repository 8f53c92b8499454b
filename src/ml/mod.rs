// src/ml/mod.rs

//! Classical machine-learning back-end: linear classifiers, k-NN, k-means
//! and their evaluation metrics.

pub mod kmeans;
pub mod knn;
pub mod linear;
pub mod metrics;
mod model;

pub use metrics::{calculate_metrics, ConfusionCounts, Metrics, MulticlassConfusion};
pub use model::{ClassifierOutput, ClusteringOutput, TrainedModel, TrainingEpoch};

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::rng::seeded_rng;
use crate::core::{
    Dataset, FlowError, Result, DEFAULT_EPOCHS, DEFAULT_K, DEFAULT_LEARNING_RATE, DEFAULT_MAX_ITERATIONS,
};

/// Classifier families an ml node can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelType {
    #[default]
    Perceptron,
    Logistic,
    Knn,
    /// Trained by an [`ExternalTrainer`].
    NeuralNetwork,
    /// Trained by an [`ExternalTrainer`].
    DeepNetwork,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Perceptron => "perceptron",
            ModelType::Logistic => "logistic",
            ModelType::Knn => "knn",
            ModelType::NeuralNetwork => "neural-network",
            ModelType::DeepNetwork => "deep-network",
        }
    }

    /// Whether training is delegated to an external numeric backend.
    pub fn is_external(&self) -> bool {
        matches!(self, ModelType::NeuralNetwork | ModelType::DeepNetwork)
    }
}

impl FromStr for ModelType {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "perceptron" => Ok(ModelType::Perceptron),
            "logistic" => Ok(ModelType::Logistic),
            "knn" => Ok(ModelType::Knn),
            "neural-network" => Ok(ModelType::NeuralNetwork),
            "deep-network" => Ok(ModelType::DeepNetwork),
            _ => Err(FlowError::UnknownModelType(s.to_string())),
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hyper-parameters of a classifier run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierParams {
    pub model_type: ModelType,
    pub epochs: usize,
    pub learning_rate: f64,
    /// Neighbour count, read by k-NN only.
    pub k: usize,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            model_type: ModelType::default(),
            epochs: DEFAULT_EPOCHS,
            learning_rate: DEFAULT_LEARNING_RATE,
            k: DEFAULT_K,
        }
    }
}

/// Hyper-parameters of a k-means run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusteringParams {
    pub k: usize,
    pub max_iterations: usize,
}

impl Default for ClusteringParams {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Predictions and per-epoch history returned by an external backend.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExternalTraining {
    pub predictions: Vec<i64>,
    pub history: Vec<TrainingEpoch>,
}

/// A numeric backend (for example an autodiff library) able to train the
/// network model types. Metrics are computed from its predictions the same
/// way as for the built-in trainers.
pub trait ExternalTrainer: Send + Sync {
    fn train(&self, data: &Dataset, params: &ClassifierParams) -> Result<ExternalTraining>;
}

/// Trains classifiers and clusterers on in-memory datasets.
pub struct MlEngine {
    rng: StdRng,
    external: Option<Arc<dyn ExternalTrainer>>,
}

impl Default for MlEngine {
    fn default() -> Self {
        Self::new(None)
    }
}

impl MlEngine {
    /// A seed makes k-means++ seeding reproducible.
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: seeded_rng(seed),
            external: None,
        }
    }

    /// Registers the backend used for `neural-network` and `deep-network`.
    pub fn with_external_trainer(mut self, trainer: Arc<dyn ExternalTrainer>) -> Self {
        self.external = Some(trainer);
        self
    }

    /// Trains a classifier and evaluates it on its own training data.
    pub fn train_classifier(&mut self, data: &Dataset, params: &ClassifierParams) -> Result<ClassifierOutput> {
        let labels = data.require_labels()?;
        if data.is_empty() {
            return Err(FlowError::invalid_dataset("cannot train on an empty dataset"));
        }
        let features = data.features();
        debug!(model = %params.model_type, rows = data.rows(), cols = data.cols(), "training classifier");

        let evaluate = |model: TrainedModel, history: Vec<TrainingEpoch>| -> Result<_> {
            let predictions = model.predict(features)?;
            Ok((Some(model), history, predictions))
        };

        let (model, history, predictions) = match params.model_type {
            ModelType::Perceptron => {
                let (model, history) = linear::train_perceptron(features, labels, params.epochs, params.learning_rate);
                evaluate(model, history)?
            }
            ModelType::Logistic => {
                let (model, history) = linear::train_logistic(features, labels, params.epochs, params.learning_rate);
                evaluate(model, history)?
            }
            ModelType::Knn => {
                if params.k == 0 {
                    return Err(FlowError::invalid_operation("k-NN requires k >= 1"));
                }
                evaluate(knn::train_knn(features, labels, params.k), Vec::new())?
            }
            ModelType::NeuralNetwork | ModelType::DeepNetwork => {
                let trainer = self.external.as_ref().ok_or_else(|| FlowError::BackendUnavailable {
                    model_type: params.model_type.to_string(),
                })?;
                let ExternalTraining { predictions, history } = trainer.train(data, params)?;
                (None, history, predictions)
            }
        };

        let metrics = calculate_metrics(&predictions, labels)?;
        info!(model = %params.model_type, accuracy = metrics.accuracy, epochs = history.len(), "classifier trained");

        Ok(ClassifierOutput {
            model_type: params.model_type,
            model,
            predictions,
            metrics,
            training_history: history,
            training_data: data.clone(),
        })
    }

    /// Runs k-means on the dataset's features; labels are ignored.
    pub fn train_clustering(&mut self, data: &Dataset, params: &ClusteringParams) -> Result<ClusteringOutput> {
        let output = kmeans::train_clustering(data.features(), params.k, params.max_iterations, &mut self.rng)?;
        info!(k = output.k, iterations = output.iterations, converged = output.converged, "clustering complete");
        Ok(output)
    }
}
