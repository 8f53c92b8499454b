// src/ml/kmeans.rs

//! k-means clustering with k-means++ seeding.

use rand::rngs::StdRng;
use rand::RngExt;
use tracing::debug;

use super::knn::euclidean_distance;
use super::model::ClusteringOutput;
use crate::core::{FlowError, Result};

/// Clusters `features` into `k` groups.
///
/// Every point starts in cluster 0. An iteration reassigns every point to
/// its nearest centroid, marks convergence when no assignment changed, then
/// recomputes the centroids as cluster means (an empty cluster gets the
/// all-zero centroid). Inertia is measured against the final centroids.
pub fn train_clustering(
    features: &[Vec<f64>],
    k: usize,
    max_iterations: usize,
    rng: &mut StdRng,
) -> Result<ClusteringOutput> {
    if k == 0 {
        return Err(FlowError::invalid_operation("k-means requires k >= 1"));
    }
    if features.len() < k {
        return Err(FlowError::invalid_dataset(format!(
            "k-means with k = {} needs at least {} points, got {}",
            k,
            k,
            features.len()
        )));
    }

    let mut centroids = initialize_centroids(features, k, rng);
    let mut assignments = vec![0usize; features.len()];
    let mut converged = false;
    let mut iterations = 0;

    while !converged && iterations < max_iterations {
        let new_assignments: Vec<usize> = features
            .iter()
            .map(|point| nearest_centroid(point, &centroids))
            .collect();
        converged = new_assignments == assignments;
        assignments = new_assignments;
        centroids = update_centroids(features, &assignments, k);
        iterations += 1;
    }

    let mut cluster_sizes = vec![0usize; k];
    for &cluster in &assignments {
        cluster_sizes[cluster] += 1;
    }

    let inertia = features
        .iter()
        .zip(&assignments)
        .map(|(point, &cluster)| euclidean_distance(point, &centroids[cluster]).powi(2))
        .sum();

    debug!(k, iterations, converged, inertia, "k-means finished");

    Ok(ClusteringOutput {
        centroids,
        assignments,
        cluster_sizes,
        inertia,
        k,
        iterations,
        converged,
    })
}

/// k-means++: the first centroid is a uniformly drawn point, each further
/// centroid is drawn with probability proportional to the squared distance
/// to the nearest centroid chosen so far.
fn initialize_centroids(features: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let first = rng.random_range(0..features.len());
    let mut centroids = vec![features[first].clone()];

    while centroids.len() < k {
        let distances: Vec<f64> = features
            .iter()
            .map(|point| {
                centroids
                    .iter()
                    .map(|c| euclidean_distance(point, c))
                    .fold(f64::INFINITY, f64::min)
                    .powi(2)
            })
            .collect();

        let total: f64 = distances.iter().sum();
        let mut remaining = rng.random::<f64>() * total;
        let mut chosen = None;
        for (idx, d) in distances.iter().enumerate() {
            remaining -= d;
            if remaining <= 0.0 {
                chosen = Some(idx);
                break;
            }
        }
        let idx = chosen
            .or_else(|| distances.iter().rposition(|d| *d > 0.0))
            .unwrap_or(0);
        centroids.push(features[idx].clone());
    }

    centroids
}

/// Index of the closest centroid; the first one wins on ties.
pub fn nearest_centroid(point: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut nearest = 0;
    let mut min_dist = f64::INFINITY;
    for (idx, centroid) in centroids.iter().enumerate() {
        let dist = euclidean_distance(point, centroid);
        if dist < min_dist {
            min_dist = dist;
            nearest = idx;
        }
    }
    nearest
}

fn update_centroids(features: &[Vec<f64>], assignments: &[usize], k: usize) -> Vec<Vec<f64>> {
    let width = features.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0; width]; k];
    let mut counts = vec![0usize; k];

    for (point, &cluster) in features.iter().zip(assignments) {
        counts[cluster] += 1;
        for (acc, v) in sums[cluster].iter_mut().zip(point) {
            *acc += v;
        }
    }

    for (centroid, &count) in sums.iter_mut().zip(&counts) {
        if count == 0 {
            debug!("empty cluster, centroid reset to origin");
            continue;
        }
        for value in centroid.iter_mut() {
            *value /= count as f64;
        }
    }
    sums
}
