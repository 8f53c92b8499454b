// src/ml/linear.rs

//! Online gradient-descent classifiers: perceptron and logistic regression.

use tracing::debug;

use super::model::{linear_activation, TrainedModel, TrainingEpoch};

// Keeps ln() finite when a prediction saturates at 0 or 1.
const LOG_EPSILON: f64 = 1e-15;

pub(crate) fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Trains a perceptron with zero-initialised weights.
///
/// Each misclassified sample moves the weights by `lr * error * x`. Training
/// stops after the first epoch without corrections.
pub fn train_perceptron(
    features: &[Vec<f64>],
    labels: &[i64],
    epochs: usize,
    learning_rate: f64,
) -> (TrainedModel, Vec<TrainingEpoch>) {
    let num_features = features.first().map_or(0, Vec::len);
    let mut weights = vec![0.0; num_features];
    let mut bias = 0.0;
    let mut history = Vec::with_capacity(epochs);
    let n = features.len().max(1) as f64;

    for epoch in 0..epochs {
        let mut total_error: i64 = 0;
        let mut correct = 0usize;

        for (x, &y) in features.iter().zip(labels) {
            let prediction = if linear_activation(&weights, bias, x) >= 0.0 { 1 } else { 0 };
            if prediction == y {
                correct += 1;
            }
            let error = y - prediction;
            if error != 0 {
                total_error += error.abs();
                let step = learning_rate * error as f64;
                bias += step;
                for (w, v) in weights.iter_mut().zip(x) {
                    *w += step * v;
                }
            }
        }

        history.push(TrainingEpoch {
            epoch: epoch + 1,
            accuracy: correct as f64 / n,
            loss: total_error as f64 / n,
        });

        if total_error == 0 {
            debug!(epoch = epoch + 1, "perceptron converged");
            break;
        }
    }

    (TrainedModel::Perceptron { weights, bias }, history)
}

/// Trains logistic regression by per-sample gradient descent on the binary
/// cross-entropy. Runs every epoch.
pub fn train_logistic(
    features: &[Vec<f64>],
    labels: &[i64],
    epochs: usize,
    learning_rate: f64,
) -> (TrainedModel, Vec<TrainingEpoch>) {
    let num_features = features.first().map_or(0, Vec::len);
    let mut weights = vec![0.0; num_features];
    let mut bias = 0.0;
    let mut history = Vec::with_capacity(epochs);
    let n = features.len().max(1) as f64;

    for epoch in 0..epochs {
        let mut total_loss = 0.0;
        let mut correct = 0usize;

        for (x, &label) in features.iter().zip(labels) {
            let y = label as f64;
            let p = sigmoid(linear_activation(&weights, bias, x));
            total_loss += -(y * (p + LOG_EPSILON).ln() + (1.0 - y) * (1.0 - p + LOG_EPSILON).ln());

            let predicted = if p >= 0.5 { 1 } else { 0 };
            if predicted == label {
                correct += 1;
            }

            let gradient = p - y;
            bias -= learning_rate * gradient;
            for (w, v) in weights.iter_mut().zip(x) {
                *w -= learning_rate * gradient * v;
            }
        }

        history.push(TrainingEpoch {
            epoch: epoch + 1,
            accuracy: correct as f64 / n,
            loss: total_loss / n,
        });
    }

    (TrainedModel::Logistic { weights, bias }, history)
}
