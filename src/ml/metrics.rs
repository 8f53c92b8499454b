// src/ml/metrics.rs

//! Classification metrics. Label `1` is the positive class.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::{FlowError, Result};

/// Raw binary confusion counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub tp: usize,
    pub tn: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
}

/// Confusion matrix over an arbitrary label set. `matrix[actual][predicted]`
/// indexes into `classes`, which is sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MulticlassConfusion {
    pub classes: Vec<i64>,
    pub matrix: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// `[[tn, fp], [fn, tp]]`
    pub confusion_matrix: [[usize; 2]; 2],
    pub confusion_matrix_raw: ConfusionCounts,
    pub total_samples: usize,
    pub correct_predictions: usize,
    /// Present when more than two distinct labels occur.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiclass: Option<MulticlassConfusion>,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 { 0.0 } else { numerator as f64 / denominator as f64 }
}

/// Computes accuracy and the binary metrics of `predictions` against `labels`.
///
/// Samples whose label or prediction is neither 0 nor 1 count toward accuracy
/// only. Every ratio with a zero denominator is reported as 0.
pub fn calculate_metrics(predictions: &[i64], labels: &[i64]) -> Result<Metrics> {
    if labels.is_empty() {
        return Err(FlowError::invalid_dataset("no labels provided for evaluation"));
    }
    if predictions.len() != labels.len() {
        return Err(FlowError::invalid_dataset(format!(
            "{} predictions for {} labels",
            predictions.len(),
            labels.len()
        )));
    }

    let mut counts = ConfusionCounts::default();
    let mut correct = 0;
    for (&pred, &actual) in predictions.iter().zip(labels) {
        if pred == actual {
            correct += 1;
        }
        match (pred, actual) {
            (1, 1) => counts.tp += 1,
            (0, 0) => counts.tn += 1,
            (1, 0) => counts.fp += 1,
            (0, 1) => counts.fn_ += 1,
            _ => {}
        }
    }

    let precision = ratio(counts.tp, counts.tp + counts.fp);
    let recall = ratio(counts.tp, counts.tp + counts.fn_);
    let f1_score = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    let multiclass = confusion_matrix_multiclass(predictions, labels);
    Ok(Metrics {
        accuracy: ratio(correct, labels.len()),
        precision,
        recall,
        f1_score,
        confusion_matrix: [[counts.tn, counts.fp], [counts.fn_, counts.tp]],
        confusion_matrix_raw: counts,
        total_samples: labels.len(),
        correct_predictions: correct,
        multiclass: (multiclass.classes.len() > 2).then_some(multiclass),
    })
}

/// Confusion matrix over the union of observed labels and predictions.
pub fn confusion_matrix_multiclass(predictions: &[i64], labels: &[i64]) -> MulticlassConfusion {
    let classes: Vec<i64> = labels
        .iter()
        .chain(predictions)
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let mut matrix = vec![vec![0usize; classes.len()]; classes.len()];
    for (pred, actual) in predictions.iter().zip(labels) {
        if let (Ok(p), Ok(a)) = (classes.binary_search(pred), classes.binary_search(actual)) {
            matrix[a][p] += 1;
        }
    }
    MulticlassConfusion { classes, matrix }
}
