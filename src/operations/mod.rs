// src/operations/mod.rs

//! Gate operations and classical-data encodings understood by the quantum engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::{FlowError, Result, DEFAULT_ROTATION_ANGLE};

/// The gate set of the simulator.
///
/// Single-qubit gates address one qubit index; `CNOT` addresses
/// `(control, target)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gate {
    /// Hadamard
    H,
    /// Pauli-X (NOT)
    X,
    /// Pauli-Y
    Y,
    /// Pauli-Z
    Z,
    /// Controlled-NOT
    #[serde(rename = "CNOT")]
    Cnot,
    /// Rotation about X by `angle`
    #[serde(rename = "RX")]
    Rx,
    /// Rotation about Y by `angle`
    #[serde(rename = "RY")]
    Ry,
    /// Rotation about Z by `angle`
    #[serde(rename = "RZ")]
    Rz,
}

impl Gate {
    /// Number of qubit indices the gate addresses.
    pub fn arity(&self) -> usize {
        match self {
            Gate::Cnot => 2,
            _ => 1,
        }
    }

    /// Whether the gate reads the `angle` parameter.
    pub fn is_rotation(&self) -> bool {
        matches!(self, Gate::Rx | Gate::Ry | Gate::Rz)
    }

    /// Short symbol used by the circuit renderer and logs.
    pub fn symbol(&self) -> &'static str {
        match self {
            Gate::H => "H",
            Gate::X => "X",
            Gate::Y => "Y",
            Gate::Z => "Z",
            Gate::Cnot => "CNOT",
            Gate::Rx => "RX",
            Gate::Ry => "RY",
            Gate::Rz => "RZ",
        }
    }
}

impl FromStr for Gate {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "H" => Ok(Gate::H),
            "X" => Ok(Gate::X),
            "Y" => Ok(Gate::Y),
            "Z" => Ok(Gate::Z),
            "CNOT" | "CX" => Ok(Gate::Cnot),
            "RX" => Ok(Gate::Rx),
            "RY" => Ok(Gate::Ry),
            "RZ" => Ok(Gate::Rz),
            _ => Err(FlowError::UnknownGate(s.to_string())),
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One gate application inside a circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateOp {
    pub gate: Gate,
    /// Target index for single-qubit gates, `[control, target]` for CNOT.
    pub qubits: Vec<usize>,
    /// Rotation angle in radians. Ignored by non-rotation gates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
}

impl GateOp {
    pub fn new(gate: Gate, qubits: Vec<usize>, angle: Option<f64>) -> Result<Self> {
        let op = Self { gate, qubits, angle };
        op.check_arity()?;
        Ok(op)
    }

    pub fn h(target: usize) -> Self {
        Self { gate: Gate::H, qubits: vec![target], angle: None }
    }

    pub fn x(target: usize) -> Self {
        Self { gate: Gate::X, qubits: vec![target], angle: None }
    }

    pub fn y(target: usize) -> Self {
        Self { gate: Gate::Y, qubits: vec![target], angle: None }
    }

    pub fn z(target: usize) -> Self {
        Self { gate: Gate::Z, qubits: vec![target], angle: None }
    }

    pub fn cnot(control: usize, target: usize) -> Self {
        Self { gate: Gate::Cnot, qubits: vec![control, target], angle: None }
    }

    pub fn rx(target: usize, angle: f64) -> Self {
        Self { gate: Gate::Rx, qubits: vec![target], angle: Some(angle) }
    }

    pub fn ry(target: usize, angle: f64) -> Self {
        Self { gate: Gate::Ry, qubits: vec![target], angle: Some(angle) }
    }

    pub fn rz(target: usize, angle: f64) -> Self {
        Self { gate: Gate::Rz, qubits: vec![target], angle: Some(angle) }
    }

    /// The rotation angle, falling back to pi/4 when none was configured.
    pub fn effective_angle(&self) -> f64 {
        self.angle.unwrap_or(DEFAULT_ROTATION_ANGLE)
    }

    /// Verifies the number of qubit indices and, for CNOT, that control and
    /// target differ.
    pub fn check_arity(&self) -> Result<()> {
        if self.qubits.len() != self.gate.arity() {
            return Err(FlowError::invalid_operation(format!(
                "Gate '{}' requires {} qubit(s), but {} were provided",
                self.gate,
                self.gate.arity(),
                self.qubits.len()
            )));
        }
        if self.gate == Gate::Cnot && self.qubits[0] == self.qubits[1] {
            return Err(FlowError::invalid_operation(
                "Control and target qubits cannot be the same for CNOT",
            ));
        }
        Ok(())
    }

    /// Qubit indices touched by this operation.
    pub fn involved_qubits(&self) -> &[usize] {
        &self.qubits
    }
}

/// Gate entry as written in a quantum node's `circuit` config. The gate name
/// is kept as text so that an unknown gate surfaces as `UnknownGate` when the
/// node runs instead of failing graph deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateSpec {
    pub gate: String,
    #[serde(default)]
    pub qubits: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
}

impl TryFrom<&GateSpec> for GateOp {
    type Error = FlowError;

    fn try_from(spec: &GateSpec) -> Result<Self> {
        GateOp::new(spec.gate.parse()?, spec.qubits.clone(), spec.angle)
    }
}

impl From<&GateOp> for GateSpec {
    fn from(op: &GateOp) -> Self {
        Self {
            gate: op.gate.symbol().to_string(),
            qubits: op.qubits.clone(),
            angle: op.angle,
        }
    }
}

/// How classical data is loaded into a fresh register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMethod {
    /// Threshold at 0.5 and flip matching qubits with X.
    Basis,
    /// RY(value * pi) per qubit.
    #[default]
    Angle,
    /// Write the normalized vector into the amplitudes.
    Amplitude,
}

impl FromStr for EncodingMethod {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basis" => Ok(EncodingMethod::Basis),
            "angle" => Ok(EncodingMethod::Angle),
            "amplitude" => Ok(EncodingMethod::Amplitude),
            _ => Err(FlowError::UnknownEncoding(s.to_string())),
        }
    }
}

impl fmt::Display for EncodingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EncodingMethod::Basis => "basis",
            EncodingMethod::Angle => "angle",
            EncodingMethod::Amplitude => "amplitude",
        };
        f.write_str(name)
    }
}
