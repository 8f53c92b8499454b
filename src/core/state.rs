// src/core/state.rs

use num_complex::Complex;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::constants::flow_constants::MAX_QUBITS;
use super::error::{FlowError, Result};

/// A single complex amplitude of the state vector.
pub type ComplexAmplitude = Complex<f64>;

/// The state vector of an `n`-qubit register.
///
/// Basis index `i` encodes the register in binary with qubit `q` stored at
/// bit `1 << q`. The vector always has `2^n` entries.
///
/// Gates applied through the simulation engine keep the vector unit-norm.
/// Amplitude encoding writes entries directly and renormalizes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)] // Avoid Eq for floating-point complex numbers
pub struct QuantumState {
    num_qubits: usize,
    amplitudes: Vec<ComplexAmplitude>,
}

impl QuantumState {
    /// Creates the all-zero basis state `|0...0>` for `num_qubits` qubits.
    pub fn zero(num_qubits: usize) -> Result<Self> {
        if num_qubits == 0 {
            return Err(FlowError::invalid_operation("Cannot create a quantum state with zero qubits"));
        }
        if num_qubits > MAX_QUBITS {
            return Err(FlowError::invalid_operation(format!(
                "{} qubits requested, the dense simulator supports at most {}",
                num_qubits, MAX_QUBITS
            )));
        }
        let dim = 1usize << num_qubits;
        let mut amplitudes = vec![Complex::zero(); dim];
        amplitudes[0] = Complex::new(1.0, 0.0);
        Ok(Self { num_qubits, amplitudes })
    }

    /// Builds a state from raw amplitudes. The length must be a power of two.
    /// The vector is accepted as is; use `normalize` or the validation helpers
    /// when the caller cannot guarantee unit norm.
    pub fn from_amplitudes(amplitudes: Vec<ComplexAmplitude>) -> Result<Self> {
        let dim = amplitudes.len();
        if dim < 2 || !dim.is_power_of_two() {
            return Err(FlowError::invalid_operation(format!(
                "State vector length {} is not a power of two >= 2",
                dim
            )));
        }
        Ok(Self {
            num_qubits: dim.trailing_zeros() as usize,
            amplitudes,
        })
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Number of basis amplitudes (`2^n`).
    pub fn dim(&self) -> usize {
        self.amplitudes.len()
    }

    /// Provides read-only access to the amplitudes.
    pub fn vector(&self) -> &[ComplexAmplitude] {
        &self.amplitudes
    }

    /// Mutable access for the gate kernels and the encoders.
    pub(crate) fn vector_mut(&mut self) -> &mut [ComplexAmplitude] {
        &mut self.amplitudes
    }

    /// `|a_i|^2` for every basis index.
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(|c| c.norm_sqr()).collect()
    }

    /// `sum(|a_i|^2)`.
    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(|c| c.norm_sqr()).sum()
    }

    /// Rescales the vector to unit norm. A zero vector is left untouched and
    /// `false` is returned.
    pub fn normalize(&mut self) -> bool {
        let norm = self.norm_sqr().sqrt();
        if norm <= f64::EPSILON {
            return false;
        }
        for amp in self.amplitudes.iter_mut() {
            *amp /= norm;
        }
        true
    }

    /// Formats basis index `index` as a bitstring, most significant qubit first.
    pub fn bitstring(&self, index: usize) -> String {
        format!("{:0width$b}", index, width = self.num_qubits)
    }
}

impl fmt::Display for QuantumState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "State[")?;
        for (i, c) in self.amplitudes.iter().enumerate() {
            write!(f, "{}{:.4}", if i > 0 { ", " } else { "" }, c)?;
        }
        write!(f, "]")
    }
}
