// src/preprocess/mod.rs

//! Column-wise feature transforms applied by preprocess nodes.
//!
//! Every transform maps a feature matrix to a new one and leaves labels
//! untouched, except the split which selects rows (labels follow their rows).

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::core::{Dataset, FlowError, Result};

/// Components kept by `pca`.
pub const PCA_COMPONENTS: usize = 2;
/// Power-iteration steps per principal component.
pub const PCA_ITERATIONS: usize = 100;
/// Columns whose variance does not exceed this are dropped by `select_variance`.
pub const VARIANCE_THRESHOLD: f64 = 0.01;
/// Fraction of rows held out by the `trainTestSplit` operation.
pub const DEFAULT_TEST_SIZE: f64 = 0.2;

type Matrix = Vec<Vec<f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PreprocessOp {
    Normalize,
    Standardize,
    Scale,
    Polynomial,
    Pca,
    SelectVariance,
    TrainTestSplit,
}

impl FromStr for PreprocessOp {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "normalize" => Ok(PreprocessOp::Normalize),
            "standardize" => Ok(PreprocessOp::Standardize),
            "scale" => Ok(PreprocessOp::Scale),
            "polynomial" => Ok(PreprocessOp::Polynomial),
            "pca" => Ok(PreprocessOp::Pca),
            "selectVariance" | "select_variance" => Ok(PreprocessOp::SelectVariance),
            "trainTestSplit" | "train_test_split" => Ok(PreprocessOp::TrainTestSplit),
            _ => Err(FlowError::UnknownPreprocessOperation(s.to_string())),
        }
    }
}

impl fmt::Display for PreprocessOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PreprocessOp::Normalize => "normalize",
            PreprocessOp::Standardize => "standardize",
            PreprocessOp::Scale => "scale",
            PreprocessOp::Polynomial => "polynomial",
            PreprocessOp::Pca => "pca",
            PreprocessOp::SelectVariance => "selectVariance",
            PreprocessOp::TrainTestSplit => "trainTestSplit",
        };
        f.write_str(name)
    }
}

/// Applies `ops` to `data` in order.
///
/// `TrainTestSplit` keeps the training part of a shuffled split and discards
/// the held-out rows.
pub fn apply_operations(data: &Dataset, ops: &[PreprocessOp], rng: &mut StdRng) -> Result<Dataset> {
    let mut current = data.clone();
    for op in ops {
        current = match op {
            PreprocessOp::Normalize => current.with_features(normalize(current.features()))?,
            PreprocessOp::Standardize => current.with_features(standardize(current.features()))?,
            PreprocessOp::Scale => current.with_features(scale(current.features(), -1.0, 1.0))?,
            PreprocessOp::Polynomial => current.with_features(polynomial_features(current.features()))?,
            PreprocessOp::Pca => current.with_features(pca(current.features(), PCA_COMPONENTS).data)?,
            PreprocessOp::SelectVariance => {
                let (features, kept) = select_by_variance(current.features(), VARIANCE_THRESHOLD);
                debug!(kept = ?kept, "variance selection");
                current.with_features(features)?
            }
            PreprocessOp::TrainTestSplit => train_test_split(&current, DEFAULT_TEST_SIZE, rng)?.train,
        };
        debug!(op = %op, shape = ?current.shape(), "preprocess step applied");
    }
    Ok(current)
}

fn column_stats(data: &[Vec<f64>]) -> (Vec<f64>, Vec<f64>) {
    let width = data.first().map_or(0, Vec::len);
    let mut mins = vec![f64::INFINITY; width];
    let mut maxs = vec![f64::NEG_INFINITY; width];
    for row in data {
        for (j, &v) in row.iter().enumerate() {
            mins[j] = mins[j].min(v);
            maxs[j] = maxs[j].max(v);
        }
    }
    (mins, maxs)
}

fn column_means(data: &[Vec<f64>]) -> Vec<f64> {
    let width = data.first().map_or(0, Vec::len);
    let n = data.len().max(1) as f64;
    let mut means = vec![0.0; width];
    for row in data {
        for (m, v) in means.iter_mut().zip(row) {
            *m += v;
        }
    }
    means.iter_mut().for_each(|m| *m /= n);
    means
}

/// Population variance of every column.
fn column_variances(data: &[Vec<f64>], means: &[f64]) -> Vec<f64> {
    let n = data.len().max(1) as f64;
    let mut vars = vec![0.0; means.len()];
    for row in data {
        for ((acc, v), m) in vars.iter_mut().zip(row).zip(means) {
            *acc += (v - m).powi(2);
        }
    }
    vars.iter_mut().for_each(|v| *v /= n);
    vars
}

/// Min-max scaling of every column to `[0, 1]`. A constant column becomes 0.
pub fn normalize(data: &[Vec<f64>]) -> Matrix {
    let (mins, maxs) = column_stats(data);
    data.iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(j, &v)| {
                    let range = maxs[j] - mins[j];
                    if range == 0.0 { 0.0 } else { (v - mins[j]) / range }
                })
                .collect()
        })
        .collect()
}

/// Z-score of every column. A column with zero deviation becomes 0.
pub fn standardize(data: &[Vec<f64>]) -> Matrix {
    let means = column_means(data);
    let stds: Vec<f64> = column_variances(data, &means).into_iter().map(f64::sqrt).collect();
    if stds.iter().any(|&s| s == 0.0) {
        debug!("constant column(s) standardized to zero");
    }
    data.iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(j, &v)| if stds[j] == 0.0 { 0.0 } else { (v - means[j]) / stds[j] })
                .collect()
        })
        .collect()
}

/// Min-max scaling to `[min, max]`.
pub fn scale(data: &[Vec<f64>], min: f64, max: f64) -> Matrix {
    let range = max - min;
    normalize(data)
        .into_iter()
        .map(|row| row.into_iter().map(|v| v * range + min).collect())
        .collect()
}

/// Appends every pairwise product `x_i * x_j` with `j >= i`.
pub fn polynomial_features(data: &[Vec<f64>]) -> Matrix {
    data.iter()
        .map(|sample| {
            let mut row = sample.clone();
            for i in 0..sample.len() {
                for j in i..sample.len() {
                    row.push(sample[i] * sample[j]);
                }
            }
            row
        })
        .collect()
}

/// Result of a principal component projection.
#[derive(Debug, Clone, PartialEq)]
pub struct PcaResult {
    pub data: Matrix,
    pub components: Matrix,
    pub eigenvalues: Vec<f64>,
    pub explained_variance: Vec<f64>,
}

/// Projects the centred data on its leading principal components, found by
/// power iteration with deflation.
pub fn pca(data: &[Vec<f64>], num_components: usize) -> PcaResult {
    let samples = data.len();
    let width = data.first().map_or(0, Vec::len);
    let num_components = num_components.min(width).min(samples);

    let means = column_means(data);
    let centered: Matrix = data
        .iter()
        .map(|row| row.iter().zip(&means).map(|(v, m)| v - m).collect())
        .collect();

    let denom = samples.saturating_sub(1).max(1) as f64;
    let mut covariance = vec![vec![0.0; width]; width];
    for i in 0..width {
        for j in 0..width {
            covariance[i][j] = centered.iter().map(|r| r[i] * r[j]).sum::<f64>() / denom;
        }
    }

    let mut components = Vec::with_capacity(num_components);
    let mut eigenvalues = Vec::with_capacity(num_components);
    for comp in 0..num_components {
        // deterministic start vector
        let mut v: Vec<f64> = (0..width).map(|j| 1.0 + (j + comp) as f64 * 0.1).collect();
        for _ in 0..PCA_ITERATIONS {
            let next = mat_vec(&covariance, &v);
            let norm = next.iter().map(|x| x * x).sum::<f64>().sqrt();
            if norm <= f64::EPSILON {
                break;
            }
            v = next.into_iter().map(|x| x / norm).collect();
        }
        let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }

        let av = mat_vec(&covariance, &v);
        let eigenvalue: f64 = av.iter().zip(&v).map(|(a, b)| a * b).sum();
        for i in 0..width {
            for j in 0..width {
                covariance[i][j] -= eigenvalue * v[i] * v[j];
            }
        }
        eigenvalues.push(eigenvalue);
        components.push(v);
    }

    let projected = centered
        .iter()
        .map(|row| components.iter().map(|c| row.iter().zip(c).map(|(a, b)| a * b).sum::<f64>()).collect())
        .collect();

    let total: f64 = eigenvalues.iter().map(|e| e.abs()).sum();
    let explained_variance = eigenvalues
        .iter()
        .map(|e| if total > 0.0 { e.abs() / total } else { 0.0 })
        .collect();

    PcaResult {
        data: projected,
        components,
        eigenvalues,
        explained_variance,
    }
}

fn mat_vec(m: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    m.iter().map(|row| row.iter().zip(v).map(|(a, b)| a * b).sum::<f64>()).collect()
}

/// Keeps the columns whose population variance exceeds `threshold`.
/// Returns the reduced matrix and the kept column indices.
pub fn select_by_variance(data: &[Vec<f64>], threshold: f64) -> (Matrix, Vec<usize>) {
    let means = column_means(data);
    let kept: Vec<usize> = column_variances(data, &means)
        .into_iter()
        .enumerate()
        .filter(|(_, var)| *var > threshold)
        .map(|(j, _)| j)
        .collect();
    if kept.is_empty() && !means.is_empty() {
        warn!(threshold, "variance selection removed every column");
    }
    let reduced = data.iter().map(|row| kept.iter().map(|&j| row[j]).collect()).collect();
    (reduced, kept)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainTestSplit {
    pub train: Dataset,
    pub test: Dataset,
}

/// Shuffles the rows and holds out `floor(rows * test_size)` of them.
pub fn train_test_split(data: &Dataset, test_size: f64, rng: &mut StdRng) -> Result<TrainTestSplit> {
    if !(0.0..=1.0).contains(&test_size) {
        return Err(FlowError::invalid_operation(format!(
            "test size {} outside [0, 1]",
            test_size
        )));
    }
    let rows = data.rows();
    let num_test = (rows as f64 * test_size).floor() as usize;
    let mut indices: Vec<usize> = (0..rows).collect();
    indices.shuffle(rng);
    let (train_idx, test_idx) = indices.split_at(rows - num_test);
    Ok(TrainTestSplit {
        train: data.select_rows(train_idx)?,
        test: data.select_rows(test_idx)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::seeded_rng;
    use approx::assert_abs_diff_eq;

    fn sample() -> Matrix {
        vec![vec![1.0, 5.0, 2.0], vec![2.0, 5.0, 4.0], vec![3.0, 5.0, 6.0], vec![4.0, 5.0, 8.0]]
    }

    #[test]
    fn test_normalize_constant_column_is_zero() {
        let out = normalize(&sample());
        assert_eq!(out[0], vec![0.0, 0.0, 0.0]);
        assert_eq!(out[3], vec![1.0, 0.0, 1.0]);
        assert_abs_diff_eq!(out[1][0], 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_standardize_zero_mean_unit_variance() {
        let out = standardize(&sample());
        let col: Vec<f64> = out.iter().map(|r| r[0]).collect();
        assert_abs_diff_eq!(col.iter().sum::<f64>(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(col.iter().map(|v| v * v).sum::<f64>() / 4.0, 1.0, epsilon = 1e-12);
        assert!(out.iter().all(|r| r[1] == 0.0));
    }

    #[test]
    fn test_scale_to_symmetric_range() {
        let out = scale(&sample(), -1.0, 1.0);
        assert_eq!(out[0][0], -1.0);
        assert_eq!(out[3][2], 1.0);
        assert_eq!(out[2][1], -1.0);
    }

    #[test]
    fn test_polynomial_pairwise_products() {
        let out = polynomial_features(&[vec![2.0, 3.0]]);
        assert_eq!(out[0], vec![2.0, 3.0, 4.0, 6.0, 9.0]);
    }

    #[test]
    fn test_pca_finds_dominant_direction() {
        let data: Matrix = (0..10).map(|i| vec![i as f64, 2.0 * i as f64 + 0.01 * (i % 2) as f64]).collect();
        let result = pca(&data, 2);
        assert_eq!(result.data[0].len(), 2);
        let v = &result.components[0];
        let expected = 1.0 / 5f64.sqrt();
        assert_abs_diff_eq!(v[0].abs(), expected, epsilon = 1e-3);
        assert_abs_diff_eq!(v[1].abs(), 2.0 * expected, epsilon = 1e-3);
        assert!(result.explained_variance[0] > 0.99);
    }

    #[test]
    fn test_pca_caps_components_at_width() {
        let result = pca(&[vec![1.0], vec![2.0], vec![4.0]], 2);
        assert_eq!(result.components.len(), 1);
    }

    #[test]
    fn test_select_variance_drops_constant_columns() {
        let (out, kept) = select_by_variance(&sample(), VARIANCE_THRESHOLD);
        assert_eq!(kept, vec![0, 2]);
        assert_eq!(out[0], vec![1.0, 2.0]);
    }

    #[test]
    fn test_split_keeps_label_alignment() -> Result<()> {
        let data = Dataset::labeled((0..10).map(|i| vec![i as f64]).collect(), (0..10).collect())?;
        let mut rng = seeded_rng(Some(4));
        let split = train_test_split(&data, 0.2, &mut rng)?;
        assert_eq!(split.train.rows(), 8);
        assert_eq!(split.test.rows(), 2);
        let labels = split.train.labels().unwrap();
        for (row, label) in split.train.features().iter().zip(labels) {
            assert_eq!(row[0] as i64, *label);
        }

        let again = train_test_split(&data, 0.2, &mut seeded_rng(Some(4)))?;
        assert_eq!(again.train, split.train);
        let mut seen: Vec<i64> = split.train.labels().into_iter().chain(split.test.labels()).flatten().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn test_operation_names() {
        assert_eq!("pca".parse::<PreprocessOp>().unwrap(), PreprocessOp::Pca);
        assert_eq!("selectVariance".parse::<PreprocessOp>().unwrap(), PreprocessOp::SelectVariance);
        assert!(matches!(
            "whiten".parse::<PreprocessOp>(),
            Err(FlowError::UnknownPreprocessOperation(_))
        ));
    }

    #[test]
    fn test_pipeline_applies_in_order() -> Result<()> {
        let data = Dataset::labeled(sample(), vec![0, 0, 1, 1])?;
        let mut rng = seeded_rng(Some(0));
        let out = apply_operations(&data, &[PreprocessOp::SelectVariance, PreprocessOp::Normalize], &mut rng)?;
        assert_eq!(out.shape(), [4, 2]);
        assert_eq!(out.features()[3], vec![1.0, 1.0]);
        assert_eq!(out.labels(), Some(&[0, 0, 1, 1][..]));
        Ok(())
    }
}
