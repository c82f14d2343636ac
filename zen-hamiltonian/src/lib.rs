//! Hamiltonian neural networks in pure Rust
//!
//! Learns the kinetic energy T(p) and potential energy V(q) of a separable
//! Hamiltonian H(q, p) = T(p) + V(q) from sampled trajectory data. Each energy is
//! fitted by a residual feed-forward network trained with stochastic mini-batch
//! gradient descent (vanilla or Adam). The trained networks then act as gradient
//! oracles for a symplectic Störmer–Verlet integrator.
//!
//! ### Quick Start:
//!
//! ```rust,no_run
//! use zen_hamiltonian::hnn_api::*;
//!
//! # fn example(data: TrajectoryData) -> Result<(), HnnError> {
//! let network_config = NetworkConfig::builder()
//!     .input_dim(data.physical_dim())
//!     .hidden_dim(4)
//!     .num_layers(30)
//!     .step_size(0.1)
//!     .build()?;
//!
//! let training_config = TrainingConfig::builder()
//!     .method_name("adams")?
//!     .iterations(3000)
//!     .tau(0.1)
//!     .chunk(TrainingConfig::chunk_for_dataset(data.len(), 256))
//!     .build()?;
//!
//! let pair = train_energy_pair(&data, network_config, training_config)?;
//! let trajectory = pair.integrator().integrate(
//!     data.positions.column(0),
//!     data.momenta.column(0),
//!     data.times.view(),
//! )?;
//! println!("distance to data: {}", trajectory_distance(&trajectory, &data)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `serde` (default): serialization of configurations, data and parameter
//!   snapshots through `serde_json`
//! - `parallel`: train the kinetic and potential networks concurrently with `rayon`

pub mod hnn;

pub use hnn::{HamiltonianNetwork, HnnError, HnnResult};

/// Convenience re-exports of the whole HNN surface.
pub mod hnn_api {
    pub use crate::hnn::{
        agreement_ratio, embed_input, find_ratio, frobenius_distance, get_random_sample,
        max_energy_drift, network_hamiltonian, train_energy_pair, trajectory_distance,
        ActivationFunctions, ActivationType, AdamConfig, AdamState, BatchSampler, EnergyComponent,
        EnergyGradient, EnergyNetworkPair, HamiltonianNetwork, HnnError, HnnResult,
        NetworkConfig, NetworkConfigBuilder, NetworkTrainer, OptimizerMethod, OptimizerState,
        ParameterContainer, Parameters, PhasePoint, QuadraticEnergy, SampledBatch, StormerVerlet,
        TrainingConfig, TrainingConfigBuilder, TrainingResults, Trajectory, TrajectoryData,
        WeightInitialization,
    };
}
