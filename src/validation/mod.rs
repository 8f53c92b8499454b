// src/validation/mod.rs

//! Checks and metrics over quantum states and outcome distributions.

use serde::{Deserialize, Serialize};

use crate::core::{ComplexAmplitude, FlowError, QuantumState, Result, NORM_TOLERANCE};

// Probabilities below this contribute nothing to the entropy.
const DEFAULT_AMPLITUDE_TOLERANCE: f64 = 1e-12;

// Concurrence above this marks a two-qubit state as entangled.
const ENTANGLEMENT_TOLERANCE: f64 = 1e-10;

/// Checks if the state vector is normalized (sum of squared amplitudes ≈ 1.0).
///
/// # Arguments
/// * `state` - The `QuantumState` to check.
/// * `tolerance` - Allowed deviation from 1.0, `NORM_TOLERANCE` when `None`.
///
/// # Returns
/// * `Ok(())` if normalized within tolerance.
/// * `Err(FlowError::InvalidOperation)` otherwise.
pub fn check_normalization(state: &QuantumState, tolerance: Option<f64>) -> Result<()> {
    let effective_tolerance = tolerance.unwrap_or(NORM_TOLERANCE);
    let norm_sq = state.norm_sqr();
    if (norm_sq - 1.0).abs() > effective_tolerance {
        Err(FlowError::invalid_operation(format!(
            "State vector normalization failed. Sum(|c_i|^2) = {} (Deviation > {})",
            norm_sq, effective_tolerance
        )))
    } else {
        Ok(())
    }
}

/// `sum(p_i^2)` over the basis probabilities of `state`.
pub fn purity(state: &QuantumState) -> f64 {
    state.vector().iter().map(|c| c.norm_sqr().powi(2)).sum()
}

/// Shannon entropy in bits. Zero probabilities are skipped.
pub fn shannon_entropy(probabilities: &[f64]) -> f64 {
    -probabilities
        .iter()
        .filter(|&&p| p > DEFAULT_AMPLITUDE_TOLERANCE)
        .map(|&p| p * p.log2())
        .sum::<f64>()
}

fn inner_product(a: &QuantumState, b: &QuantumState) -> Result<ComplexAmplitude> {
    if a.dim() != b.dim() {
        return Err(FlowError::invalid_operation(format!(
            "States have different dimensions ({} vs {})",
            a.dim(),
            b.dim()
        )));
    }
    Ok(a.vector().iter().zip(b.vector()).map(|(x, y)| x.conj() * y).sum())
}

/// `|<a|b>|^2` for two pure states of the same size.
pub fn state_fidelity(a: &QuantumState, b: &QuantumState) -> Result<f64> {
    Ok(inner_product(a, b)?.norm_sqr())
}

/// Trace distance between two pure states, `sqrt(1 - F)`.
pub fn trace_distance(a: &QuantumState, b: &QuantumState) -> Result<f64> {
    let fidelity = state_fidelity(a, b)?;
    Ok((1.0 - fidelity).max(0.0).sqrt())
}

/// Wootters concurrence of a two-qubit pure state: `2|a00 a11 - a01 a10|`.
pub fn concurrence(state: &QuantumState) -> Result<f64> {
    if state.num_qubits() != 2 {
        return Err(FlowError::invalid_operation(format!(
            "Concurrence is defined for two-qubit states, got {} qubit(s)",
            state.num_qubits()
        )));
    }
    let v = state.vector();
    Ok(2.0 * (v[0] * v[3] - v[1] * v[2]).norm())
}

/// Bloch vector `(x, y, z)` of a single-qubit pure state.
pub fn bloch_coordinates(state: &QuantumState) -> Result<(f64, f64, f64)> {
    if state.num_qubits() != 1 {
        return Err(FlowError::invalid_operation(format!(
            "Bloch coordinates need a single-qubit state, got {} qubit(s)",
            state.num_qubits()
        )));
    }
    let (a, b) = (state.vector()[0], state.vector()[1]);
    let coherence = a.conj() * b;
    Ok((2.0 * coherence.re, 2.0 * coherence.im, a.norm_sqr() - b.norm_sqr()))
}

/// Exact metrics of a simulated state, attached to every quantum run.
///
/// Bloch coordinates are only reported for one qubit, concurrence and the
/// entanglement flag only for two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMetrics {
    pub purity: f64,
    /// Shannon entropy of the basis probabilities, in bits.
    pub entropy: f64,
    /// Overlap between the final state and the state the circuit started from.
    pub fidelity_to_prepared: f64,
    pub trace_distance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bloch_coordinates: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_entangled: Option<bool>,
}

impl StateMetrics {
    /// Metrics of `state`, with `prepared` as the pre-circuit reference.
    pub fn of(state: &QuantumState, prepared: &QuantumState) -> Result<Self> {
        let bloch_coordinates = match state.num_qubits() {
            1 => {
                let (x, y, z) = bloch_coordinates(state)?;
                Some([x, y, z])
            }
            _ => None,
        };
        let concurrence = match state.num_qubits() {
            2 => Some(concurrence(state)?),
            _ => None,
        };
        Ok(Self {
            purity: purity(state),
            entropy: shannon_entropy(&state.probabilities()),
            fidelity_to_prepared: state_fidelity(state, prepared)?,
            trace_distance: trace_distance(state, prepared)?,
            bloch_coordinates,
            concurrence,
            is_entangled: concurrence.map(|c| c > ENTANGLEMENT_TOLERANCE),
        })
    }
}
