// src/simulation/mod.rs

//! The state-vector simulator behind quantum workflow nodes.
//!
//! `QuantumEngine` owns the run RNG used for measurement sampling; the gate
//! and encoding kernels themselves live in [`engine`] and are deterministic.

mod results;
pub mod engine;

pub use results::{Histogram, QuantumBatch, QuantumRunResult};

use rand::rngs::StdRng;
use tracing::debug;

use crate::circuits::Circuit;
use crate::core::rng::seeded_rng;
use crate::core::{Dataset, FlowError, QuantumState, Result, NORM_TOLERANCE, TOP_PROBABILITY_FEATURES};
use crate::operations::{EncodingMethod, GateOp};
use crate::validation::{check_normalization, shannon_entropy, StateMetrics};

/// Dense state-vector simulator.
pub struct QuantumEngine {
    rng: StdRng,
}

impl Default for QuantumEngine {
    fn default() -> Self {
        Self::new(None)
    }
}

impl QuantumEngine {
    /// Creates an engine. A seed makes measurement sampling reproducible.
    pub fn new(seed: Option<u64>) -> Self {
        Self { rng: seeded_rng(seed) }
    }

    /// `|0...0>` on `num_qubits` qubits.
    pub fn create_state(&self, num_qubits: usize) -> Result<QuantumState> {
        QuantumState::zero(num_qubits)
    }

    pub fn apply_gate(&self, state: &mut QuantumState, op: &GateOp) -> Result<()> {
        engine::apply_gate(state, op)
    }

    /// Applies every operation of `circuit` in order.
    pub fn apply_circuit(&self, state: &mut QuantumState, circuit: &Circuit) -> Result<()> {
        circuit.validate(state.num_qubits())?;
        for op in circuit.operations() {
            engine::apply_gate(state, op)?;
        }
        Ok(())
    }

    pub fn encode(&self, state: &mut QuantumState, data: &[f64], method: EncodingMethod) -> Result<()> {
        engine::encode(state, data, method)?;
        check_normalization(state, None)
    }

    /// Samples `shots` outcomes from `state` without collapsing it.
    pub fn measure(&mut self, state: &QuantumState, shots: usize) -> Result<Histogram> {
        if shots == 0 {
            return Err(FlowError::invalid_operation("Measurement requires at least one shot"));
        }
        let probabilities = state.probabilities();
        let mut histogram = Histogram::new(state.num_qubits());
        for _ in 0..shots {
            let idx = engine::sample_index(&probabilities, &mut self.rng);
            histogram.record(state.bitstring(idx));
        }
        debug!(shots, outcomes = histogram.counts().len(), "measurement complete");
        Ok(histogram)
    }

    /// Classical features of a measurement histogram:
    /// the top probabilities (at most four), then per bit position the
    /// observed frequency of `1` (leftmost position first), then the base-2
    /// entropy of the distribution.
    pub fn extract_features(&self, histogram: &Histogram) -> Vec<f64> {
        let n = histogram.num_qubits();
        let ranked = histogram.ranked();
        let mut features: Vec<f64> = ranked
            .iter()
            .take(TOP_PROBABILITY_FEATURES)
            .map(|(_, p)| *p)
            .collect();

        let total = histogram.shots() as f64;
        for pos in 0..n {
            let expectation = if total > 0.0 {
                histogram
                    .counts()
                    .iter()
                    .map(|(bits, &count)| {
                        let sign = if bits.as_bytes().get(pos) == Some(&b'1') { 1.0 } else { -1.0 };
                        sign * count as f64 / total
                    })
                    .sum::<f64>()
            } else {
                0.0
            };
            features.push((expectation + 1.0) / 2.0);
        }

        let probs: Vec<f64> = ranked.iter().map(|(_, p)| *p).collect();
        features.push(shannon_entropy(&probs));
        features
    }

    /// Full quantum node pipeline: fresh register, optional encoding, the
    /// circuit, measurement and feature extraction.
    pub fn run_workflow(
        &mut self,
        num_qubits: usize,
        circuit: &Circuit,
        shots: usize,
        input: Option<&[f64]>,
        encoding: Option<EncodingMethod>,
    ) -> Result<QuantumRunResult> {
        let mut state = self.create_state(num_qubits)?;
        circuit.validate(num_qubits)?;

        let encoding = match input {
            Some(data) => {
                let method = encoding.unwrap_or_default();
                self.encode(&mut state, data, method)?;
                Some(method)
            }
            None => None,
        };

        let prepared = state.clone();
        self.apply_circuit(&mut state, circuit)?;
        check_normalization(&state, Some(NORM_TOLERANCE))?;
        let state_metrics = StateMetrics::of(&state, &prepared)?;

        let measurements = self.measure(&state, shots)?;
        let fidelity = measurements.purity();
        let quantum_features = self.extract_features(&measurements);
        debug!(num_qubits, gates = circuit.len(), fidelity, "quantum run complete");

        Ok(QuantumRunResult {
            num_qubits,
            fidelity,
            state_metrics,
            quantum_features,
            gates_applied: circuit.len(),
            circuit_depth: circuit.depth(),
            encoding,
            measurements,
            final_state: state,
        })
    }

    /// Runs the circuit once per row of `samples`, encoding the row first,
    /// or once without encoding when there are no samples.
    pub fn run_batch(
        &mut self,
        num_qubits: usize,
        circuit: &Circuit,
        shots: usize,
        samples: Option<&Dataset>,
        encoding: EncodingMethod,
    ) -> Result<QuantumBatch> {
        let runs = match samples {
            Some(data) => data
                .features()
                .iter()
                .map(|row| self.run_workflow(num_qubits, circuit, shots, Some(row), Some(encoding)))
                .collect::<Result<Vec<_>>>()?,
            None => vec![self.run_workflow(num_qubits, circuit, shots, None, None)?],
        };

        let rows = runs.iter().map(|r| r.quantum_features.clone()).collect();
        let labels = samples.and_then(|d| d.labels()).map(<[i64]>::to_vec);
        // rows can differ in width when samples observe different numbers of outcomes
        let features = Dataset::new(pad_rows(rows, num_qubits), labels)?;

        debug!(samples = runs.len(), num_qubits, "quantum batch complete");
        Ok(QuantumBatch {
            num_qubits,
            gates_applied: circuit.len(),
            circuit_depth: circuit.depth(),
            encoding: samples.map(|_| encoding),
            runs,
            features,
        })
    }

    /// Prepares the register from a classifier's predictions and runs the
    /// circuit once. The absolute prediction values become the amplitudes,
    /// truncated or zero-padded to `2^n` and normalized.
    pub fn run_from_predictions(
        &mut self,
        num_qubits: usize,
        circuit: &Circuit,
        shots: usize,
        predictions: &[i64],
    ) -> Result<QuantumBatch> {
        let amplitudes: Vec<f64> = predictions.iter().map(|p| p.unsigned_abs() as f64).collect();
        let run = self.run_workflow(
            num_qubits,
            circuit,
            shots,
            Some(amplitudes.as_slice()),
            Some(EncodingMethod::Amplitude),
        )?;
        let features = Dataset::unlabeled(vec![run.quantum_features.clone()])?;
        debug!(predictions = predictions.len(), num_qubits, "state prepared from predictions");
        Ok(QuantumBatch {
            num_qubits,
            gates_applied: circuit.len(),
            circuit_depth: circuit.depth(),
            encoding: Some(EncodingMethod::Amplitude),
            runs: vec![run],
            features,
        })
    }
}

/// Zero-pads the probability block of shorter feature rows so every row of a
/// batch has the same width. The per-position and entropy tail stays last.
fn pad_rows(rows: Vec<Vec<f64>>, num_qubits: usize) -> Vec<Vec<f64>> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let tail = num_qubits + 1;
    rows.into_iter()
        .map(|mut row| {
            let missing = width - row.len();
            if missing > 0 {
                let top = row.len().saturating_sub(tail);
                row.splice(top..top, std::iter::repeat_n(0.0, missing));
            }
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_bell_measurement_statistics() -> Result<()> {
        let mut engine = QuantumEngine::new(Some(42));
        let run = engine.run_workflow(2, &Circuit::bell(), 2000, None, None)?;
        let counts = run.measurements.counts();
        assert!(counts.keys().all(|k| k == "00" || k == "11"));
        let p00 = run.measurements.count("00") as f64 / 2000.0;
        assert!((p00 - 0.5).abs() < 0.05, "p00 = {}", p00);
        assert_abs_diff_eq!(run.fidelity, 0.5, epsilon = 0.01);
        assert_abs_diff_eq!(run.state_metrics.purity, 0.5, epsilon = 1e-9);
        assert!(run.encoding.is_none());
        Ok(())
    }

    #[test]
    fn test_feature_layout() -> Result<()> {
        let mut engine = QuantumEngine::new(Some(1));
        let run = engine.run_workflow(2, &Circuit::bell(), 1000, None, None)?;
        // two observed outcomes + two positions + entropy
        assert_eq!(run.quantum_features.len(), 2 + 2 + 1);
        let entropy = run.quantum_features[4];
        assert!(entropy > 0.99 && entropy <= 1.0 + 1e-12);
        // each bit position reads 1 exactly when the outcome is "11"
        assert_abs_diff_eq!(run.quantum_features[2], run.quantum_features[3], epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_features_of_a_basis_state() -> Result<()> {
        let mut engine = QuantumEngine::new(Some(5));
        let run = engine.run_workflow(3, &Circuit::new(), 100, Some(&[1.0, 0.0, 1.0]), Some(EncodingMethod::Basis))?;
        assert_eq!(run.measurements.count("101"), 100);
        assert_eq!(run.quantum_features, vec![1.0, 1.0, 0.0, 1.0, 0.0]);
        assert_eq!(run.encoding, Some(EncodingMethod::Basis));
        Ok(())
    }

    #[test]
    fn test_top_probabilities_are_capped_at_four() -> Result<()> {
        let mut engine = QuantumEngine::new(Some(9));
        let circuit = Circuit::new();
        let mut state = engine.create_state(3)?;
        for q in 0..3 {
            engine.apply_gate(&mut state, &GateOp::h(q))?;
        }
        engine.apply_circuit(&mut state, &circuit)?;
        let hist = engine.measure(&state, 4000)?;
        assert_eq!(hist.counts().len(), 8);
        let features = engine.extract_features(&hist);
        assert_eq!(features.len(), 4 + 3 + 1);
        assert!(features[..4].windows(2).all(|w| w[0] >= w[1]));
        Ok(())
    }

    #[test]
    fn test_same_seed_same_histogram() -> Result<()> {
        let circuit = Circuit::bell();
        let a = QuantumEngine::new(Some(77)).run_workflow(2, &circuit, 500, None, None)?;
        let b = QuantumEngine::new(Some(77)).run_workflow(2, &circuit, 500, None, None)?;
        assert_eq!(a.measurements, b.measurements);
        assert_eq!(a.quantum_features, b.quantum_features);
        Ok(())
    }

    #[test]
    fn test_zero_shots_rejected() -> Result<()> {
        let mut engine = QuantumEngine::new(Some(0));
        let state = engine.create_state(1)?;
        assert!(engine.measure(&state, 0).is_err());
        Ok(())
    }

    #[test]
    fn test_batch_runs_once_per_sample_and_keeps_labels() -> Result<()> {
        let mut engine = QuantumEngine::new(Some(3));
        let samples = Dataset::labeled(vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![0.5, 0.0]], vec![0, 1, 1])?;
        let batch = engine.run_batch(2, &Circuit::new(), 200, Some(&samples), EncodingMethod::Angle)?;
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.features.rows(), 3);
        assert_eq!(batch.features.labels(), Some(&[0, 1, 1][..]));
        // the third sample has two outcomes, the others one; all rows share a width
        assert_eq!(batch.features.cols(), 2 + 2 + 1);
        assert_eq!(batch.features.features()[0], vec![1.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(batch.combined_histogram()?.shots(), 600);
        assert_eq!(batch.encoding, Some(EncodingMethod::Angle));
        Ok(())
    }

    #[test]
    fn test_batch_without_samples_runs_once() -> Result<()> {
        let mut engine = QuantumEngine::new(Some(3));
        let batch = engine.run_batch(2, &Circuit::bell(), 100, None, EncodingMethod::Basis)?;
        assert_eq!(batch.len(), 1);
        assert!(batch.features.labels().is_none());
        assert!(batch.encoding.is_none());
        Ok(())
    }

    #[test]
    fn test_predictions_become_amplitudes() -> Result<()> {
        let mut engine = QuantumEngine::new(Some(12));
        // truncated to four amplitudes, signs dropped: (|00> + |11>)/sqrt(2)
        let batch = engine.run_from_predictions(2, &Circuit::new(), 1000, &[-1, 0, 0, 1, 1])?;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.encoding, Some(EncodingMethod::Amplitude));
        let run = &batch.runs[0];
        assert!(run.measurements.counts().keys().all(|k| k == "00" || k == "11"));
        assert_eq!(run.state_metrics.is_entangled, Some(true));
        assert_eq!(batch.features.rows(), 1);
        Ok(())
    }

    #[test]
    fn test_circuit_wider_than_register_rejected() {
        let mut engine = QuantumEngine::new(Some(0));
        let err = engine.run_workflow(1, &Circuit::bell(), 10, None, None).unwrap_err();
        assert!(matches!(err, FlowError::InvalidOperation { .. }));
    }
}
