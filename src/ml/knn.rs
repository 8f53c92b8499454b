// src/ml/knn.rs

//! k-nearest-neighbour classification.

use std::collections::BTreeMap;

use super::model::TrainedModel;

pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt()
}

/// k-NN has no fitting step: the model is the stored training set.
pub fn train_knn(features: &[Vec<f64>], labels: &[i64], k: usize) -> TrainedModel {
    TrainedModel::Knn {
        features: features.to_vec(),
        labels: labels.to_vec(),
        k,
    }
}

/// Majority vote over the `k` nearest training points.
///
/// Equidistant neighbours keep their training order. A tied vote goes to the
/// smallest label.
pub fn knn_predict(features: &[Vec<f64>], labels: &[i64], k: usize, x: &[f64]) -> i64 {
    let mut distances: Vec<(f64, i64)> = features
        .iter()
        .zip(labels)
        .map(|(train_x, &label)| (euclidean_distance(x, train_x), label))
        .collect();
    distances.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut votes: BTreeMap<i64, usize> = BTreeMap::new();
    for (_, label) in distances.iter().take(k) {
        *votes.entry(*label).or_insert(0) += 1;
    }

    // max_by_key returns the last maximum; iterate labels descending so that is the smallest
    votes
        .iter()
        .rev()
        .max_by_key(|(_, count)| **count)
        .map_or(0, |(label, _)| *label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_majority_vote() {
        let features = vec![vec![0.0], vec![0.1], vec![0.2], vec![5.0], vec![5.1]];
        let labels = vec![0, 0, 1, 1, 1];
        assert_eq!(knn_predict(&features, &labels, 3, &[0.05]), 0);
        assert_eq!(knn_predict(&features, &labels, 3, &[4.9]), 1);
    }

    #[test]
    fn test_vote_tie_goes_to_smallest_label() {
        let features = vec![vec![-1.0], vec![1.0]];
        let labels = vec![7, 3];
        assert_eq!(knn_predict(&features, &labels, 2, &[0.0]), 3);
    }

    #[test]
    fn test_distance_tie_keeps_training_order() {
        // both candidates at distance 1, k = 1 picks the first in training order
        let features = vec![vec![1.0], vec![-1.0]];
        let labels = vec![4, 2];
        assert_eq!(knn_predict(&features, &labels, 1, &[0.0]), 4);
    }

    #[test]
    fn test_k_larger_than_training_set() {
        let model = train_knn(&[vec![0.0], vec![1.0], vec![2.0]], &[1, 1, 0], 10);
        assert_eq!(model.predict(&[vec![2.0]]).unwrap(), vec![1]);
    }
}
