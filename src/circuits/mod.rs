// src/circuits/mod.rs

//! Ordered sequences of gate operations (`hybridflow::operations::GateOp`).
//!
//! A `Circuit` is what a quantum node runs after (optionally) encoding a data
//! sample into a fresh register.

use crate::core::{FlowError, Result};
use crate::operations::{Gate, GateOp, GateSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// An ordered list of gate operations.
///
/// The order is significant: operations are applied exactly as listed.
#[derive(Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Circuit {
    operations: Vec<GateOp>,
}

impl Circuit {
    /// Creates a new, empty circuit.
    pub fn new() -> Self {
        Self::default()
    }

    /// The two-qubit Bell preparation `H(0); CNOT(0, 1)`, used when a quantum
    /// node has no circuit configured.
    pub fn bell() -> Self {
        CircuitBuilder::new()
            .add_op(GateOp::h(0))
            .add_op(GateOp::cnot(0, 1))
            .build()
    }

    /// Parses gate entries from a node config, failing on the first unknown
    /// gate or malformed entry.
    pub fn from_specs(specs: &[GateSpec]) -> Result<Self> {
        let operations = specs.iter().map(GateOp::try_from).collect::<Result<Vec<_>>>()?;
        Ok(Self { operations })
    }

    /// Adds a single operation to the end of the circuit's sequence.
    pub fn add_operation(&mut self, op: GateOp) {
        self.operations.push(op);
    }

    /// Adds multiple operations from an iterator to the end of the circuit's sequence.
    pub fn add_operations<I>(&mut self, ops: I)
    where
        I: IntoIterator<Item = GateOp>,
    {
        self.operations.extend(ops);
    }

    /// Returns a slice containing the ordered sequence of operations in this circuit.
    pub fn operations(&self) -> &[GateOp] {
        &self.operations
    }

    /// The distinct qubit indices used by the circuit, ascending.
    pub fn qubits(&self) -> BTreeSet<usize> {
        self.operations
            .iter()
            .flat_map(|op| op.involved_qubits().iter().copied())
            .collect()
    }

    /// Smallest register size able to run this circuit.
    pub fn min_qubits(&self) -> usize {
        self.qubits().last().map_or(0, |q| q + 1)
    }

    /// Checks every operation's arity and that all indices fit in a register
    /// of `num_qubits` qubits.
    pub fn validate(&self, num_qubits: usize) -> Result<()> {
        for (pos, op) in self.operations.iter().enumerate() {
            op.check_arity()?;
            if let Some(&bad) = op.involved_qubits().iter().find(|&&q| q >= num_qubits) {
                return Err(FlowError::invalid_operation(format!(
                    "Operation {} ({}) addresses qubit {} but the register has only {} qubit(s)",
                    pos, op.gate, bad, num_qubits
                )));
            }
        }
        Ok(())
    }

    /// Returns the total number of operations defined in the circuit.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns `true` if the circuit contains no operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Number of layers when gates on disjoint qubits share a layer.
    pub fn depth(&self) -> usize {
        let width = self.min_qubits();
        let mut frontier = vec![0usize; width];
        for op in &self.operations {
            let layer = op.involved_qubits().iter().map(|&q| frontier[q]).max().unwrap_or(0) + 1;
            for &q in op.involved_qubits() {
                frontier[q] = layer;
            }
        }
        frontier.into_iter().max().unwrap_or(0)
    }
}

//-------------------------------------------------------------------------
// Circuit Builder
//-------------------------------------------------------------------------

/// A helper struct for programmatically constructing `Circuit` instances using method chaining.
#[derive(Default)]
pub struct CircuitBuilder {
    circuit: Circuit,
}

impl CircuitBuilder {
    /// Creates a new, empty CircuitBuilder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a single operation to the circuit being built.
    pub fn add_op(mut self, op: GateOp) -> Self {
        self.circuit.add_operation(op);
        self
    }

    /// Adds multiple operations from an iterator to the circuit being built.
    pub fn add_ops<I>(mut self, ops: I) -> Self
    where
        I: IntoIterator<Item = GateOp>,
    {
        self.circuit.add_operations(ops);
        self
    }

    /// Finalizes the construction process and returns the built `Circuit`.
    pub fn build(self) -> Circuit {
        self.circuit
    }
}

/// Draws one wire per qubit and one column per operation. CNOT is drawn as
/// `●` on the control and `⊕` on the target, joined by `│`; rotations carry
/// their angle.
impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self.min_qubits();
        writeln!(f, "Circuit: {} gate(s) on {} qubit(s)", self.operations.len(), rows)?;
        if rows == 0 {
            return Ok(());
        }

        let columns: Vec<Column> = self.operations.iter().map(|op| Column::new(op, rows)).collect();
        let label_width = format!("q{}", rows - 1).len();

        for row in 0..rows {
            write!(f, "{:<width$}: ", format!("q{}", row), width = label_width)?;
            for column in &columns {
                f.write_str(&column.wire(row))?;
            }
            writeln!(f)?;
            if row + 1 < rows {
                write!(f, "{:width$}  ", "", width = label_width)?;
                for column in &columns {
                    f.write_str(&column.gap(row))?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// One time step of the wire diagram.
struct Column {
    width: usize,
    labels: Vec<Option<String>>,
    /// Rows `lo..hi` get a connector below them.
    span: Option<(usize, usize)>,
}

impl Column {
    fn new(op: &GateOp, rows: usize) -> Self {
        let mut labels = vec![None; rows];
        let mut span = None;
        match (op.gate, op.qubits.as_slice()) {
            (Gate::Cnot, &[control, target]) => {
                labels[control] = Some("●".to_string());
                labels[target] = Some("⊕".to_string());
                span = Some((control.min(target), control.max(target)));
            }
            (gate, &[target, ..]) => {
                labels[target] = Some(match (gate, op.angle) {
                    (Gate::Rx | Gate::Ry | Gate::Rz, Some(theta)) => format!("{}({:.2})", gate, theta),
                    _ => gate.to_string(),
                });
            }
            _ => {}
        }
        let widest = labels.iter().flatten().map(|l| l.chars().count()).max().unwrap_or(1);
        Self { width: widest + 2, labels, span }
    }

    fn crosses(&self, row: usize) -> bool {
        self.span.is_some_and(|(lo, hi)| lo < row && row < hi)
    }

    fn wire(&self, row: usize) -> String {
        match &self.labels[row] {
            Some(label) => centered(label, self.width, '─'),
            None if self.crosses(row) => centered("┼", self.width, '─'),
            None => "─".repeat(self.width),
        }
    }

    fn gap(&self, row: usize) -> String {
        match self.span {
            Some((lo, hi)) if lo <= row && row < hi => centered("│", self.width, ' '),
            _ => " ".repeat(self.width),
        }
    }
}

fn centered(symbol: &str, width: usize, fill: char) -> String {
    let len = symbol.chars().count();
    let left = width.saturating_sub(len) / 2;
    let right = width.saturating_sub(len + left);
    let fill = fill.to_string();
    format!("{}{}{}", fill.repeat(left), symbol, fill.repeat(right))
}

// Keep the Debug impl delegating to Display
impl fmt::Debug for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
