// tests/quantum_tests.rs

use approx::assert_abs_diff_eq;
use hybridflow::simulation::engine::{apply_gate, gate_matrix};
use hybridflow::validation::{bloch_coordinates, concurrence, state_fidelity, trace_distance};
use hybridflow::{
    check_normalization, Circuit, CircuitBuilder, EncodingMethod, FlowError, Gate, GateOp, QuantumEngine,
    QuantumState,
};
use std::f64::consts::PI;

// Helper: probability of basis index `idx`
fn prob(state: &QuantumState, idx: usize) -> f64 {
    state.vector()[idx].norm_sqr()
}

#[test]
fn test_norm_preserved_after_every_gate() -> Result<(), FlowError> {
    let ops = [
        GateOp::h(0),
        GateOp::rx(1, 0.7),
        GateOp::cnot(0, 2),
        GateOp::y(2),
        GateOp::ry(0, 1.3),
        GateOp::rz(1, -2.1),
        GateOp::cnot(2, 1),
        GateOp::z(0),
        GateOp::x(1),
        GateOp::h(2),
    ];
    let mut state = QuantumState::zero(3)?;
    for op in &ops {
        apply_gate(&mut state, op)?;
        check_normalization(&state, Some(1e-9))?;
    }
    Ok(())
}

#[test]
fn test_bell_statistics_at_2000_shots() -> Result<(), FlowError> {
    let mut engine = QuantumEngine::new(Some(2000));
    let run = engine.run_workflow(2, &Circuit::bell(), 2000, None, None)?;

    let counts = run.measurements.counts();
    assert!(counts.keys().all(|k| k == "00" || k == "11"), "{:?}", counts);
    for outcome in ["00", "11"] {
        let share = run.measurements.count(outcome) as f64 / 2000.0;
        assert!((share - 0.5).abs() < 0.05, "{} share {}", outcome, share);
    }
    assert_abs_diff_eq!(run.fidelity, 0.5, epsilon = 0.01);
    assert_eq!(run.gates_applied, 2);
    Ok(())
}

#[test]
fn test_rx_is_unitary_and_flips_at_pi() -> Result<(), FlowError> {
    let m = gate_matrix(Gate::Rx, 0.9)?;
    // columns of a unitary are orthonormal
    let col0 = m[0][0].norm_sqr() + m[1][0].norm_sqr();
    let col1 = m[0][1].norm_sqr() + m[1][1].norm_sqr();
    let cross = m[0][0].conj() * m[0][1] + m[1][0].conj() * m[1][1];
    assert_abs_diff_eq!(col0, 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(col1, 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(cross.norm(), 0.0, epsilon = 1e-12);

    let mut state = QuantumState::zero(1)?;
    apply_gate(&mut state, &GateOp::rx(0, PI))?;
    assert_abs_diff_eq!(prob(&state, 1), 1.0, epsilon = 1e-12);
    Ok(())
}

#[test]
fn test_ghz_features() -> Result<(), FlowError> {
    let circuit = CircuitBuilder::new()
        .add_ops([GateOp::h(0), GateOp::cnot(0, 1), GateOp::cnot(1, 2)])
        .build();
    let mut engine = QuantumEngine::new(Some(8));
    let run = engine.run_workflow(3, &circuit, 4000, None, None)?;

    assert_eq!(run.measurements.counts().len(), 2);
    // 2 outcome probabilities + 3 positions + entropy
    assert_eq!(run.quantum_features.len(), 6);
    let positions = &run.quantum_features[2..5];
    assert!(positions.windows(2).all(|w| (w[0] - w[1]).abs() < 1e-12));
    assert_abs_diff_eq!(run.quantum_features[5], 1.0, epsilon = 0.01);
    Ok(())
}

#[test]
fn test_encodings() -> Result<(), FlowError> {
    let engine = QuantumEngine::new(Some(0));

    let mut basis = engine.create_state(3)?;
    engine.encode(&mut basis, &[0.9, 0.2, 0.6], EncodingMethod::Basis)?;
    // qubits 0 and 2 set -> index 0b101
    assert_abs_diff_eq!(prob(&basis, 5), 1.0, epsilon = 1e-12);

    let mut angle = engine.create_state(1)?;
    engine.encode(&mut angle, &[0.5], EncodingMethod::Angle)?;
    assert_abs_diff_eq!(prob(&angle, 0), 0.5, epsilon = 1e-12);

    let mut truncated = engine.create_state(1)?;
    engine.encode(&mut truncated, &[3.0, 4.0, 12.0], EncodingMethod::Amplitude)?;
    assert_abs_diff_eq!(prob(&truncated, 0), 0.36, epsilon = 1e-12);
    assert_abs_diff_eq!(prob(&truncated, 1), 0.64, epsilon = 1e-12);

    let mut padded = engine.create_state(2)?;
    engine.encode(&mut padded, &[1.0, 1.0], EncodingMethod::Amplitude)?;
    assert_abs_diff_eq!(prob(&padded, 0) + prob(&padded, 1), 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(prob(&padded, 3), 0.0, epsilon = 1e-12);

    let mut zeros = engine.create_state(1)?;
    engine.encode(&mut zeros, &[0.0, 0.0], EncodingMethod::Amplitude)?;
    assert_abs_diff_eq!(prob(&zeros, 0), 1.0, epsilon = 1e-12);
    Ok(())
}

#[test]
fn test_state_metrics() -> Result<(), FlowError> {
    let engine = QuantumEngine::default();
    let mut bell = engine.create_state(2)?;
    engine.apply_circuit(&mut bell, &Circuit::bell())?;
    assert_abs_diff_eq!(concurrence(&bell)?, 1.0, epsilon = 1e-12);

    let zero = engine.create_state(2)?;
    assert_abs_diff_eq!(concurrence(&zero)?, 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(state_fidelity(&bell, &zero)?, 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(trace_distance(&zero, &zero)?, 0.0, epsilon = 1e-12);

    let mut plus = engine.create_state(1)?;
    engine.apply_gate(&mut plus, &GateOp::h(0))?;
    let (x, y, z) = bloch_coordinates(&plus)?;
    assert_abs_diff_eq!(x, 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(y, 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(z, 0.0, epsilon = 1e-12);
    Ok(())
}

#[test]
fn test_out_of_range_qubit_rejected() -> Result<(), FlowError> {
    let mut state = QuantumState::zero(2)?;
    let err = apply_gate(&mut state, &GateOp::x(2)).unwrap_err();
    assert!(matches!(err, FlowError::InvalidOperation { .. }));
    assert!(gate_matrix(Gate::Cnot, 0.0).is_err());
    Ok(())
}
