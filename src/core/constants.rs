//! Default values used when a node configuration leaves a field out.

/// Engine-wide defaults
pub mod flow_constants {
    /// Qubit count of a quantum node without `numQubits`.
    pub const DEFAULT_NUM_QUBITS: usize = 2;
    /// Measurement shots of a quantum node without `shots`.
    pub const DEFAULT_SHOTS: usize = 1000;
    /// Rotation angle used by RX/RY/RZ when the gate carries no angle.
    pub const DEFAULT_ROTATION_ANGLE: f64 = std::f64::consts::FRAC_PI_4;
    /// Largest register the dense simulator accepts.
    pub const MAX_QUBITS: usize = 24;
    /// Training epochs for the gradient-descent classifiers.
    pub const DEFAULT_EPOCHS: usize = 50;
    pub const DEFAULT_LEARNING_RATE: f64 = 0.01;
    /// Neighbour count for k-NN and cluster count for k-means.
    pub const DEFAULT_K: usize = 3;
    pub const DEFAULT_MAX_ITERATIONS: usize = 100;
    /// Built-in dataset loaded by an input node without inline data.
    pub const DEFAULT_DATASET: &str = "xor";
    /// Allowed deviation of `sum(|a_i|^2)` from 1.
    pub const NORM_TOLERANCE: f64 = 1e-9;
    /// Number of highest-probability outcomes carried into the quantum feature vector.
    pub const TOP_PROBABILITY_FEATURES: usize = 4;
}
