// src/simulation/engine.rs

//! State-vector kernels: gate application, classical-data encoding and
//! measurement sampling.
//!
//! All kernels update the amplitudes in place. Qubit `q` addresses bit
//! `1 << q` of the basis index.

use num_complex::Complex;
use num_traits::Zero;
use rand::rngs::StdRng;
use rand::RngExt;
use std::f64::consts::{FRAC_1_SQRT_2, PI};
use tracing::{trace, warn};

use crate::core::{ComplexAmplitude, FlowError, QuantumState, Result};
use crate::operations::{EncodingMethod, Gate, GateOp};

/// A single-qubit gate matrix, row-major.
pub type Matrix2 = [[ComplexAmplitude; 2]; 2];

/// The 2x2 matrix of a single-qubit gate. `angle` is only read by rotations.
pub fn gate_matrix(gate: Gate, angle: f64) -> Result<Matrix2> {
    let zero = Complex::zero();
    let one = Complex::new(1.0, 0.0);
    let i = Complex::i();
    let half = angle / 2.0;
    let (c, s) = (half.cos(), half.sin());

    let matrix = match gate {
        Gate::H => {
            let h = Complex::new(FRAC_1_SQRT_2, 0.0);
            [[h, h], [h, -h]]
        }
        Gate::X => [[zero, one], [one, zero]],
        Gate::Y => [[zero, -i], [i, zero]],
        Gate::Z => [[one, zero], [zero, -one]],
        Gate::Rx => [
            [Complex::new(c, 0.0), Complex::new(0.0, -s)],
            [Complex::new(0.0, -s), Complex::new(c, 0.0)],
        ],
        Gate::Ry => [
            [Complex::new(c, 0.0), Complex::new(-s, 0.0)],
            [Complex::new(s, 0.0), Complex::new(c, 0.0)],
        ],
        Gate::Rz => [
            [Complex::from_polar(1.0, -half), zero],
            [zero, Complex::from_polar(1.0, half)],
        ],
        Gate::Cnot => {
            return Err(FlowError::invalid_operation(
                "CNOT is a two-qubit gate and has no 2x2 matrix",
            ));
        }
    };
    Ok(matrix)
}

/// Applies `op` to `state`, checking arity and qubit bounds first.
pub fn apply_gate(state: &mut QuantumState, op: &GateOp) -> Result<()> {
    op.check_arity()?;
    let n = state.num_qubits();
    if let Some(&bad) = op.qubits.iter().find(|&&q| q >= n) {
        return Err(FlowError::invalid_operation(format!(
            "Gate {} addresses qubit {} but the register has only {} qubit(s)",
            op.gate, bad, n
        )));
    }

    trace!(gate = %op.gate, qubits = ?op.qubits, angle = ?op.angle, "applying gate");
    match op.gate {
        Gate::Cnot => apply_cnot(state, op.qubits[0], op.qubits[1]),
        gate => {
            let matrix = gate_matrix(gate, op.effective_angle())?;
            apply_single_qubit_gate(state, op.qubits[0], &matrix);
        }
    }
    Ok(())
}

/// Applies a 2x2 matrix to every amplitude pair differing only at `target`.
pub fn apply_single_qubit_gate(state: &mut QuantumState, target: usize, matrix: &Matrix2) {
    let mask = 1usize << target;
    let amps = state.vector_mut();
    for i0 in 0..amps.len() {
        if i0 & mask != 0 {
            continue;
        }
        let i1 = i0 | mask;
        let (a, b) = (amps[i0], amps[i1]);
        amps[i0] = matrix[0][0] * a + matrix[0][1] * b;
        amps[i1] = matrix[1][0] * a + matrix[1][1] * b;
    }
}

/// Swaps the target-bit pairs of every basis index whose control bit is set.
pub fn apply_cnot(state: &mut QuantumState, control: usize, target: usize) {
    let control_mask = 1usize << control;
    let target_mask = 1usize << target;
    let amps = state.vector_mut();
    for i in 0..amps.len() {
        if i & control_mask != 0 && i & target_mask == 0 {
            amps.swap(i, i | target_mask);
        }
    }
}

/// Loads `data` into `state` with the chosen method.
///
/// Basis and angle encoding act on qubit `i` for `data[i]`, ignoring values
/// beyond the register width. Amplitude encoding overwrites the first
/// `min(len, 2^n)` amplitudes with the normalized data and zeroes the rest.
pub fn encode(state: &mut QuantumState, data: &[f64], method: EncodingMethod) -> Result<()> {
    if let Some(pos) = data.iter().position(|v| !v.is_finite()) {
        return Err(FlowError::invalid_dataset(format!(
            "cannot encode non-finite value at position {}",
            pos
        )));
    }
    let width = data.len().min(state.num_qubits());
    match method {
        EncodingMethod::Basis => {
            for (qubit, _) in data[..width].iter().enumerate().filter(|(_, v)| **v > 0.5) {
                apply_gate(state, &GateOp::x(qubit))?;
            }
        }
        EncodingMethod::Angle => {
            for (qubit, value) in data[..width].iter().enumerate() {
                apply_gate(state, &GateOp::ry(qubit, value * PI))?;
            }
        }
        EncodingMethod::Amplitude => encode_amplitudes(state, data),
    }
    Ok(())
}

fn encode_amplitudes(state: &mut QuantumState, data: &[f64]) {
    let dim = state.dim();
    let written = &data[..data.len().min(dim)];
    let norm = written.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm <= f64::EPSILON {
        warn!(len = data.len(), "amplitude encoding of an all-zero vector, state left unchanged");
        return;
    }
    if data.len() != dim {
        trace!(len = data.len(), dim, "amplitude encoding length adjusted to register size");
    }
    let amps = state.vector_mut();
    for (idx, amp) in amps.iter_mut().enumerate() {
        *amp = match written.get(idx) {
            Some(v) => Complex::new(v / norm, 0.0),
            None => Complex::zero(),
        };
    }
}

/// Draws one basis index from the squared-amplitude distribution by inverse
/// CDF. Rounding residue falls back to the last index with non-zero weight.
pub fn sample_index(probabilities: &[f64], rng: &mut StdRng) -> usize {
    let mut remaining = rng.random::<f64>();
    for (idx, &p) in probabilities.iter().enumerate() {
        if remaining < p {
            return idx;
        }
        remaining -= p;
    }
    probabilities.iter().rposition(|p| *p > 0.0).unwrap_or(0)
}
