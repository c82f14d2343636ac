/**
 * @file zen-hamiltonian/src/hnn/mod.rs
 * @brief Hamiltonian Neural Network (HNN) Module
 *
 * Learns the two scalar energy functions of a separable Hamiltonian
 * H(q, p) = T(p) + V(q) from sampled trajectory data and reuses the trained
 * networks as gradient oracles for a symplectic integrator.
 *
 * ## Architecture Overview
 *
 * ### Core Components:
 * - **ParameterContainer**: per-layer weights/biases plus tagged optimizer state
 * - **HamiltonianNetwork**: residual recursion `Z_{k+1} = Z_k + h·σ(W_k Z_k + b_k)`
 *   with a linear output projection, explicit reverse-mode backward pass and
 *   input gradients
 * - **BatchSampler**: seedable without-replacement mini-batches with epoch cycling
 * - **NetworkTrainer**: fixed-budget stochastic training loop
 * - **Evaluation**: tolerance-based agreement ratios and trajectory metrics
 * - **StormerVerlet**: leapfrog integrator over any `EnergyGradient` pair
 *
 * ### Data Layout
 *
 * Samples are stored column-wise: a batch of `n` samples of a `d`-dimensional
 * state is a `d × n` matrix. Physical inputs of dimension `d0 < d` are zero-padded
 * with [`embed_input`] before they reach a network.
 */

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// === MODULE DECLARATIONS ===

/// Activation functions and their derivatives
pub mod activations;

/// Network and training configuration with builders
pub mod config;

/// Input padding and trajectory data containers
pub mod data;

/// Tolerance-based agreement ratios and trajectory metrics
pub mod evaluation;

/// Symplectic Störmer–Verlet integration driven by learned gradients
pub mod integrator;

/// Residual network forward/backward engine
pub mod network;

/// Parameter container and optimizer update rules
pub mod params;

/// Without-replacement mini-batch sampling with epoch cycling
pub mod sampler;

/// Stochastic mini-batch training loop
pub mod training;

// === RE-EXPORTS ===

pub use activations::ActivationFunctions;
pub use config::{AdamConfig, NetworkConfig, NetworkConfigBuilder, TrainingConfig, TrainingConfigBuilder};
pub use data::{embed_input, EnergyComponent, TrajectoryData};
pub use evaluation::{agreement_ratio, find_ratio, frobenius_distance, network_hamiltonian, trajectory_distance};
pub use integrator::{max_energy_drift, EnergyGradient, PhasePoint, QuadraticEnergy, StormerVerlet, Trajectory};
pub use network::HamiltonianNetwork;
pub use params::{AdamState, OptimizerMethod, OptimizerState, ParameterContainer, Parameters};
pub use sampler::{get_random_sample, BatchSampler, SampledBatch};
pub use training::{train_energy_pair, EnergyNetworkPair, NetworkTrainer, TrainingResults};

// === SHARED TYPES ===

/// Activation function applied inside every residual layer
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivationType {
    /// Hyperbolic tangent (smooth, zero-centred; the default)
    Tanh,
    /// Logistic sigmoid
    Sigmoid,
    /// Rectified linear unit
    ReLU,
    /// Swish activation (x * sigmoid(x))
    Swish,
    /// Identity
    Linear,
}

impl fmt::Display for ActivationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivationType::Tanh => "tanh",
            ActivationType::Sigmoid => "sigmoid",
            ActivationType::ReLU => "relu",
            ActivationType::Swish => "swish",
            ActivationType::Linear => "linear",
        };
        f.write_str(name)
    }
}

/// Weight initialization strategies for the residual layers and output projection
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightInitialization {
    /// Xavier/Glorot normal: std = sqrt(2 / (fan_in + fan_out))
    Xavier,
    /// He normal: std = sqrt(2 / fan_in)
    He,
    /// Standard normal draws scaled by `std` around `mean`
    Normal { mean: f64, std: f64 },
    /// Uniform draws on `[min, max)`
    Uniform { min: f64, max: f64 },
}

/// HNN-specific error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HnnError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Stale activations: {0}")]
    StaleActivations(String),

    #[error("Invalid time grid: {0}")]
    InvalidTimeGrid(String),

    #[error("Serialization error: {0}")]
    #[cfg(feature = "serde")]
    Serialization(String),
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for HnnError {
    fn from(err: serde_json::Error) -> Self {
        HnnError::Serialization(err.to_string())
    }
}

/// Result alias used throughout the HNN module
pub type HnnResult<T> = Result<T, HnnError>;

// === TESTS ===
