// src/data/mod.rs

//! Small built-in datasets an input node can load by name.

use serde::Serialize;

use crate::core::{Dataset, FlowError, Result};

/// Catalogue entry for a built-in dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub samples: usize,
    pub features: usize,
    pub feature_names: &'static [&'static str],
    pub target_names: &'static [&'static str],
}

struct BuiltIn {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    rows: &'static [&'static [f64]],
    labels: &'static [i64],
    feature_names: &'static [&'static str],
    target_names: &'static [&'static str],
}

const XOR: BuiltIn = BuiltIn {
    id: "xor",
    name: "XOR Problem",
    description: "Binary XOR classification (4 samples)",
    rows: &[&[0.0, 0.0], &[0.0, 1.0], &[1.0, 0.0], &[1.0, 1.0]],
    labels: &[0, 1, 1, 0],
    feature_names: &["x1", "x2"],
    target_names: &["0", "1"],
};

const IRIS: BuiltIn = BuiltIn {
    id: "iris",
    name: "Iris Flowers (Simplified)",
    description: "Sepal measurements of setosa and versicolor (30 samples, 2 classes)",
    rows: &[
        &[5.1, 3.5], &[4.9, 3.0], &[4.7, 3.2], &[4.6, 3.1], &[5.0, 3.6],
        &[5.4, 3.9], &[4.6, 3.4], &[5.0, 3.4], &[4.4, 2.9], &[4.9, 3.1],
        &[7.0, 3.2], &[6.4, 3.2], &[6.9, 3.1], &[5.5, 2.3], &[6.5, 2.8],
        &[5.7, 2.8], &[6.3, 3.3], &[4.9, 2.4], &[6.6, 2.9], &[5.2, 2.7],
        &[5.0, 2.0], &[5.9, 3.0], &[6.0, 2.2], &[6.1, 2.9], &[5.6, 2.9],
        &[6.7, 3.1], &[5.6, 3.0], &[5.8, 2.7], &[6.2, 2.2], &[5.6, 2.5],
    ],
    labels: &[
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
        1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    ],
    feature_names: &["sepal_length", "sepal_width"],
    target_names: &["setosa", "versicolor"],
};

const LINEAR: BuiltIn = BuiltIn {
    id: "linear",
    name: "Linear Relationship",
    description: "y = 2x + 1 sampled at x = 0..19 (20 samples)",
    rows: &[
        &[0.0], &[1.0], &[2.0], &[3.0], &[4.0], &[5.0], &[6.0], &[7.0], &[8.0], &[9.0],
        &[10.0], &[11.0], &[12.0], &[13.0], &[14.0], &[15.0], &[16.0], &[17.0], &[18.0], &[19.0],
    ],
    labels: &[1, 3, 5, 7, 9, 11, 13, 15, 17, 19, 21, 23, 25, 27, 29, 31, 33, 35, 37, 39],
    feature_names: &["x"],
    target_names: &["y"],
};

const QUANTUM_PREP: BuiltIn = BuiltIn {
    id: "quantum_prep",
    name: "Quantum State Prep",
    description: "Every 3-bit string labelled by its parity (8 samples)",
    rows: &[
        &[0.0, 0.0, 0.0],
        &[0.0, 0.0, 1.0],
        &[0.0, 1.0, 0.0],
        &[0.0, 1.0, 1.0],
        &[1.0, 0.0, 0.0],
        &[1.0, 0.0, 1.0],
        &[1.0, 1.0, 0.0],
        &[1.0, 1.0, 1.0],
    ],
    labels: &[0, 1, 1, 0, 1, 0, 0, 1],
    feature_names: &["bit1", "bit2", "bit3"],
    target_names: &["state_0", "state_1"],
};

const BUILT_INS: [&BuiltIn; 4] = [&XOR, &IRIS, &LINEAR, &QUANTUM_PREP];

impl BuiltIn {
    fn info(&self) -> DatasetInfo {
        DatasetInfo {
            id: self.id,
            name: self.name,
            description: self.description,
            samples: self.rows.len(),
            features: self.rows.first().map_or(0, |r| r.len()),
            feature_names: self.feature_names,
            target_names: self.target_names,
        }
    }

    fn to_dataset(&self) -> Result<Dataset> {
        let features = self.rows.iter().map(|r| r.to_vec()).collect();
        Dataset::labeled(features, self.labels.to_vec())
    }
}

/// Loads the built-in dataset `name`. Unknown names are an error.
pub fn get_dataset(name: &str) -> Result<Dataset> {
    BUILT_INS
        .iter()
        .find(|d| d.id == name)
        .ok_or_else(|| FlowError::invalid_dataset(format!("Dataset \"{}\" not found", name)))?
        .to_dataset()
}

/// Catalogue of every built-in dataset.
pub fn list_datasets() -> Vec<DatasetInfo> {
    BUILT_INS.iter().map(|d| d.info()).collect()
}
