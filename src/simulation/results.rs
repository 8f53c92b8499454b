// src/simulation/results.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::core::{Dataset, FlowError, QuantumState, Result};
use crate::operations::EncodingMethod;
use crate::validation::StateMetrics;

/// Measurement counts keyed by bitstring (most significant qubit first).
///
/// Only observed outcomes are present. Counts always sum to `shots`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    num_qubits: usize,
    shots: usize,
    counts: BTreeMap<String, usize>,
}

impl Histogram {
    /// Creates an empty histogram for an `num_qubits`-qubit register.
    pub(crate) fn new(num_qubits: usize) -> Self {
        Self {
            num_qubits,
            shots: 0,
            counts: BTreeMap::new(),
        }
    }

    pub(crate) fn record(&mut self, bitstring: String) {
        *self.counts.entry(bitstring).or_insert(0) += 1;
        self.shots += 1;
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    pub fn shots(&self) -> usize {
        self.shots
    }

    pub fn counts(&self) -> &BTreeMap<String, usize> {
        &self.counts
    }

    /// Count of `bitstring`, zero if it was never observed.
    pub fn count(&self, bitstring: &str) -> usize {
        self.counts.get(bitstring).copied().unwrap_or(0)
    }

    /// Empirical probability of every observed outcome.
    pub fn probabilities(&self) -> BTreeMap<String, f64> {
        if self.shots == 0 {
            return BTreeMap::new();
        }
        let total = self.shots as f64;
        self.counts
            .iter()
            .map(|(bits, &count)| (bits.clone(), count as f64 / total))
            .collect()
    }

    /// Sum of squared empirical probabilities.
    pub fn purity(&self) -> f64 {
        self.probabilities().values().map(|p| p * p).sum()
    }

    /// Adds the counts of `other`, which must describe a register of the same size.
    pub fn merge(&mut self, other: &Histogram) -> Result<()> {
        if other.num_qubits != self.num_qubits {
            return Err(FlowError::invalid_operation(format!(
                "cannot merge a {}-qubit histogram into a {}-qubit one",
                other.num_qubits, self.num_qubits
            )));
        }
        for (bits, count) in &other.counts {
            *self.counts.entry(bits.clone()).or_insert(0) += count;
        }
        self.shots += other.shots;
        Ok(())
    }

    /// Outcomes ordered by probability descending, ties by bitstring ascending.
    pub fn ranked(&self) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = self.probabilities().into_iter().collect();
        // BTreeMap iteration is already bitstring-ascending; the stable sort keeps that for ties.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

impl fmt::Display for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Histogram[{} shots on {} qubits]", self.shots, self.num_qubits)?;
        for (bits, p) in self.ranked() {
            writeln!(f, "  |{}>: {} ({:.2}%)", bits, self.count(&bits), p * 100.0)?;
        }
        Ok(())
    }
}

/// Everything a single quantum workflow run reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantumRunResult {
    pub num_qubits: usize,
    pub measurements: Histogram,
    /// Purity of the empirical distribution.
    pub fidelity: f64,
    /// Exact metrics of the state before measurement.
    pub state_metrics: StateMetrics,
    pub quantum_features: Vec<f64>,
    pub gates_applied: usize,
    pub circuit_depth: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<EncodingMethod>,
    pub final_state: QuantumState,
}

impl fmt::Display for QuantumRunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Quantum run: {} qubits, {} gates, depth {}", self.num_qubits, self.gates_applied, self.circuit_depth)?;
        writeln!(f, "  fidelity: {:.4}", self.fidelity)?;
        write!(f, "{}", self.measurements)
    }
}

/// Runs of one circuit over every sample of a dataset.
///
/// `features` holds one row of quantum features per run, with the labels of
/// the encoded dataset carried over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantumBatch {
    pub num_qubits: usize,
    pub gates_applied: usize,
    pub circuit_depth: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<EncodingMethod>,
    pub runs: Vec<QuantumRunResult>,
    pub features: Dataset,
}

impl QuantumBatch {
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Mean empirical fidelity over the runs, 0 for an empty batch.
    pub fn mean_fidelity(&self) -> f64 {
        if self.runs.is_empty() {
            return 0.0;
        }
        self.runs.iter().map(|r| r.fidelity).sum::<f64>() / self.runs.len() as f64
    }

    /// Sum of the measurement counts of every run.
    pub fn combined_histogram(&self) -> Result<Histogram> {
        let mut combined = Histogram::new(self.num_qubits);
        for run in &self.runs {
            combined.merge(&run.measurements)?;
        }
        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranked_breaks_ties_by_bitstring() {
        let mut hist = Histogram::new(2);
        for bits in ["11", "00", "01", "11", "00"] {
            hist.record(bits.to_string());
        }
        let ranked: Vec<String> = hist.ranked().into_iter().map(|(b, _)| b).collect();
        assert_eq!(ranked, vec!["00", "11", "01"]);
        assert_eq!(hist.shots(), 5);
        assert_eq!(hist.count("10"), 0);
    }

    #[test]
    fn test_merge_adds_counts() -> Result<()> {
        let mut a = Histogram::new(1);
        a.record("0".into());
        let mut b = Histogram::new(1);
        b.record("0".into());
        b.record("1".into());
        a.merge(&b)?;
        assert_eq!(a.count("0"), 2);
        assert_eq!(a.shots(), 3);
        assert!(a.merge(&Histogram::new(2)).is_err());
        Ok(())
    }

    #[test]
    fn test_empty_histogram_has_no_probabilities() {
        let hist = Histogram::new(3);
        assert!(hist.probabilities().is_empty());
        assert_eq!(hist.purity(), 0.0);
    }
}
