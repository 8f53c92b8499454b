// src/core/mod.rs

//! Core data structures and types

pub mod error;
pub mod state;
pub mod dataset;
pub mod rng;

pub use error::{FlowError, NodeId, Result};
pub use state::{ComplexAmplitude, QuantumState};
pub use dataset::{Dataset, DatasetRecord};

pub mod constants;
pub use constants::flow_constants::*;
