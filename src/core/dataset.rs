// src/core/dataset.rs

//! Tabular numeric data flowing between workflow nodes.

use serde::{Deserialize, Serialize};

use super::error::{FlowError, Result};

/// A feature matrix with optional integer labels.
///
/// Invariants, checked on construction:
/// - every feature row has the same length,
/// - every value is finite,
/// - when labels are present there is exactly one per row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "DatasetRecord", into = "DatasetRecord")]
pub struct Dataset {
    features: Vec<Vec<f64>>,
    labels: Option<Vec<i64>>,
}

impl Dataset {
    /// Builds a labelled or unlabelled dataset, rejecting malformed input.
    pub fn new(features: Vec<Vec<f64>>, labels: Option<Vec<i64>>) -> Result<Self> {
        let dataset = Self { features, labels };
        dataset.validate()?;
        Ok(dataset)
    }

    /// Builds a labelled dataset.
    pub fn labeled(features: Vec<Vec<f64>>, labels: Vec<i64>) -> Result<Self> {
        Self::new(features, Some(labels))
    }

    /// Builds a dataset without labels.
    pub fn unlabeled(features: Vec<Vec<f64>>) -> Result<Self> {
        Self::new(features, None)
    }

    fn validate(&self) -> Result<()> {
        if let Some(first) = self.features.first() {
            let width = first.len();
            for (row_idx, row) in self.features.iter().enumerate() {
                if row.len() != width {
                    return Err(FlowError::invalid_dataset(format!(
                        "row {} has {} values, expected {}",
                        row_idx,
                        row.len(),
                        width
                    )));
                }
                if let Some(col_idx) = row.iter().position(|v| !v.is_finite()) {
                    return Err(FlowError::invalid_dataset(format!(
                        "non-finite value at row {}, column {}",
                        row_idx, col_idx
                    )));
                }
            }
        }
        if let Some(labels) = &self.labels {
            if labels.len() != self.features.len() {
                return Err(FlowError::invalid_dataset(format!(
                    "{} labels for {} feature rows",
                    labels.len(),
                    self.features.len()
                )));
            }
        }
        Ok(())
    }

    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    pub fn labels(&self) -> Option<&[i64]> {
        self.labels.as_deref()
    }

    /// Labels, or an `InvalidDataset` error when the dataset has none.
    pub fn require_labels(&self) -> Result<&[i64]> {
        self.labels
            .as_deref()
            .ok_or_else(|| FlowError::invalid_dataset("training requires labels"))
    }

    pub fn rows(&self) -> usize {
        self.features.len()
    }

    pub fn cols(&self) -> usize {
        self.features.first().map_or(0, Vec::len)
    }

    /// `[rows, cols]`
    pub fn shape(&self) -> [usize; 2] {
        [self.rows(), self.cols()]
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Replaces the feature matrix, keeping the labels.
    pub fn with_features(&self, features: Vec<Vec<f64>>) -> Result<Self> {
        Self::new(features, self.labels.clone())
    }

    /// Keeps the rows at `indices`, in that order.
    pub fn select_rows(&self, indices: &[usize]) -> Result<Self> {
        let mut features = Vec::with_capacity(indices.len());
        for &idx in indices {
            let row = self.features.get(idx).ok_or_else(|| {
                FlowError::invalid_dataset(format!("row index {} out of range", idx))
            })?;
            features.push(row.clone());
        }
        let labels = self
            .labels
            .as_ref()
            .map(|labels| indices.iter().map(|&idx| labels[idx]).collect());
        Self::new(features, labels)
    }

    /// Concatenates datasets row-wise in iteration order.
    ///
    /// No alignment or join is attempted: rows and labels are simply
    /// appended. Labels are kept only if every part carries them, otherwise
    /// the result is unlabelled.
    pub fn concat<'a, I>(parts: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Dataset>,
    {
        let mut features = Vec::new();
        let mut labels = Some(Vec::new());
        for part in parts {
            features.extend(part.features.iter().cloned());
            match (&mut labels, &part.labels) {
                (Some(acc), Some(l)) => acc.extend_from_slice(l),
                _ => labels = None,
            }
        }
        Self::new(features, labels)
    }

    pub fn into_parts(self) -> (Vec<Vec<f64>>, Option<Vec<i64>>) {
        (self.features, self.labels)
    }
}

/// Wire form of a dataset as produced by the file-ingestion collaborator:
/// `{features, labels, shape}`. The original editor also emitted the matrix
/// under `data`, which is accepted as an alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    #[serde(alias = "data")]
    pub features: Vec<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<[usize; 2]>,
}

impl DatasetRecord {
    /// Parses a JSON value into a record. Non-numeric cells are rejected as
    /// `InvalidDataset` rather than coerced.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(|e| FlowError::invalid_dataset(e.to_string()))
    }
}

impl TryFrom<DatasetRecord> for Dataset {
    type Error = FlowError;

    fn try_from(record: DatasetRecord) -> Result<Self> {
        let dataset = Dataset::new(record.features, record.labels)?;
        if let Some(shape) = record.shape {
            if shape != dataset.shape() && !dataset.is_empty() {
                return Err(FlowError::invalid_dataset(format!(
                    "declared shape {:?} does not match actual shape {:?}",
                    shape,
                    dataset.shape()
                )));
            }
        }
        Ok(dataset)
    }
}

impl From<Dataset> for DatasetRecord {
    fn from(dataset: Dataset) -> Self {
        let shape = Some(dataset.shape());
        let (features, labels) = dataset.into_parts();
        Self { features, labels, shape }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ragged_rows_rejected() {
        let err = Dataset::unlabeled(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, FlowError::InvalidDataset { .. }));
    }

    #[test]
    fn test_label_count_must_match() {
        assert!(Dataset::labeled(vec![vec![1.0], vec![2.0]], vec![1]).is_err());
        assert!(Dataset::labeled(vec![vec![1.0], vec![2.0]], vec![1, 0]).is_ok());
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(Dataset::unlabeled(vec![vec![f64::NAN]]).is_err());
        assert!(Dataset::unlabeled(vec![vec![f64::INFINITY]]).is_err());
    }

    #[test]
    fn test_non_numeric_json_rejected() {
        let value = json!({ "features": [[1.0, "abc"]], "labels": [1] });
        let err = DatasetRecord::from_json(&value).unwrap_err();
        assert!(matches!(err, FlowError::InvalidDataset { .. }));
    }

    #[test]
    fn test_record_round_trip_with_shape() -> Result<()> {
        let value = json!({ "data": [[0.0, 1.0], [1.0, 0.0]], "labels": [1, 1], "shape": [2, 2] });
        let dataset = Dataset::try_from(DatasetRecord::from_json(&value)?)?;
        assert_eq!(dataset.shape(), [2, 2]);

        let text = serde_json::to_string(&dataset)?;
        let back: Dataset = serde_json::from_str(&text)?;
        assert_eq!(back, dataset);

        let bad_shape = json!({ "features": [[0.0]], "shape": [3, 1] });
        assert!(Dataset::try_from(DatasetRecord::from_json(&bad_shape)?).is_err());
        Ok(())
    }

    #[test]
    fn test_concat_keeps_order_and_drops_partial_labels() -> Result<()> {
        let a = Dataset::labeled(vec![vec![1.0]], vec![0])?;
        let b = Dataset::labeled(vec![vec![2.0], vec![3.0]], vec![1, 1])?;
        let merged = Dataset::concat([&a, &b])?;
        assert_eq!(merged.features(), &[vec![1.0], vec![2.0], vec![3.0]]);
        assert_eq!(merged.labels(), Some(&[0, 1, 1][..]));

        let c = Dataset::unlabeled(vec![vec![4.0]])?;
        let merged = Dataset::concat([&a, &c])?;
        assert_eq!(merged.rows(), 2);
        assert!(merged.labels().is_none());
        Ok(())
    }
}
