/**
 * @file zen-hamiltonian/src/hnn/training.rs
 * @brief Stochastic mini-batch training of energy networks
 *
 * One iteration is forward → backward → update → record J → draw next batch.
 * The iteration budget is the only termination condition; a non-finite
 * objective is logged but does not stop training.
 *
 * [`train_energy_pair`] trains the potential network on (Q, V) and the kinetic
 * network on (P, T). The two runs share nothing, so under the `parallel`
 * feature they run concurrently through `rayon::join`.
 */

use ndarray::{Array2, ArrayView2};

use super::config::{NetworkConfig, TrainingConfig};
use super::data::{EnergyComponent, TrajectoryData};
use super::integrator::StormerVerlet;
use super::network::HamiltonianNetwork;
use super::sampler::BatchSampler;
use super::{HnnError, HnnResult};

/// Outcome of one training run.
#[derive(Debug, Clone)]
pub struct TrainingResults {
    /// Trained network; its stored prediction belongs to the last batch under the final Θ
    pub network: HamiltonianNetwork,

    /// Objective J recorded at every iteration (length = iteration budget)
    pub objectives: Vec<f64>,

    /// Epochs whose samples were fully drawn
    pub epochs_completed: usize,
}

impl TrainingResults {
    /// J of the last recorded iteration
    pub fn final_objective(&self) -> Option<f64> {
        self.objectives.last().copied()
    }
}

/// Drives the training loop for a single network.
#[derive(Debug, Clone, Default)]
pub struct NetworkTrainer {
    config: TrainingConfig,
}

impl NetworkTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /**
     * Train a fresh network on `input` (`d0 × I` or `d × I`) against
     * `solution` (`output_dim × I`).
     *
     * The training chunk overrides `network_config.chunk`.
     */
    pub fn train(
        &self,
        input: ArrayView2<'_, f64>,
        solution: ArrayView2<'_, f64>,
        mut network_config: NetworkConfig,
    ) -> HnnResult<TrainingResults> {
        let cfg = &self.config;
        cfg.validate()?;

        let total = input.ncols();
        if solution.ncols() != total {
            return Err(HnnError::DimensionMismatch(format!(
                "Input has {} samples but solution has {}",
                total,
                solution.ncols()
            )));
        }
        if input.nrows() != network_config.input_dim && input.nrows() != network_config.hidden_dim {
            return Err(HnnError::DimensionMismatch(format!(
                "Input has {} rows but network expects {} (raw) or {} (padded)",
                input.nrows(),
                network_config.input_dim,
                network_config.hidden_dim
            )));
        }
        if solution.nrows() != network_config.output_dim {
            return Err(HnnError::DimensionMismatch(format!(
                "Solution has {} rows but network outputs {}",
                solution.nrows(),
                network_config.output_dim
            )));
        }
        if cfg.chunk > total {
            return Err(HnnError::InvalidConfiguration(format!(
                "Chunk {} exceeds dataset size {}",
                cfg.chunk, total
            )));
        }

        network_config.chunk = cfg.chunk;
        network_config.validate()?;
        let d = network_config.hidden_dim;

        log::info!(
            "Training energy network: I={}, d={}, K={}, h={}, method={}, tau={}, chunk={}, iterations={}",
            total,
            d,
            network_config.num_layers,
            network_config.step_size,
            cfg.method,
            cfg.tau,
            cfg.chunk,
            cfg.iterations
        );

        let mut sampler = BatchSampler::new(total, cfg.chunk, cfg.sampler_seed)?;
        let first = sampler.next_batch(input, solution, d)?;
        let mut network =
            HamiltonianNetwork::with_adam_config(network_config, cfg.adam, first.input, first.target)?;

        let mut objectives = Vec::with_capacity(cfg.iterations);
        for j in 1..=cfg.iterations {
            network.forward_function();
            let gradient = network.back_propagation()?;
            network.update_parameters(&gradient, cfg.method, cfg.tau, j as u64)?;

            let objective = network.objective().unwrap_or(f64::NAN);
            if !objective.is_finite() {
                log::warn!("Non-finite objective {} at iteration {}", objective, j);
            }
            objectives.push(objective);

            if cfg.log_every > 0 && j % cfg.log_every == 0 {
                log::info!("Iteration {}/{}: J = {:.6e}", j, cfg.iterations, objective);
            }

            if j < cfg.iterations {
                let batch = sampler.next_batch(input, solution, d)?;
                network.set_batch(batch.input, batch.target)?;
            }
        }

        // Leave a prediction under the final parameters for evaluation
        network.forward_function();

        let epochs_completed = sampler.epochs_completed();
        log::info!(
            "Training finished: final J = {:?}, epochs completed = {}, |Θ| = {:.4}",
            objectives.last(),
            epochs_completed,
            network.parameters().theta().l2_norm()
        );

        Ok(TrainingResults {
            network,
            objectives,
            epochs_completed,
        })
    }

    /// Train on the padded (input, solution) pair of one energy component
    pub fn train_component(
        &self,
        data: &TrajectoryData,
        component: EnergyComponent,
        network_config: NetworkConfig,
    ) -> HnnResult<TrainingResults> {
        if data.physical_dim() != network_config.input_dim {
            return Err(HnnError::DimensionMismatch(format!(
                "Data has physical dimension {} but network expects {}",
                data.physical_dim(),
                network_config.input_dim
            )));
        }
        let (input, solution): (Array2<f64>, Array2<f64>) =
            data.training_pair(component, network_config.hidden_dim)?;
        self.train(input.view(), solution.view(), network_config)
    }
}

/// Independently trained kinetic (T) and potential (V) networks.
#[derive(Debug, Clone)]
pub struct EnergyNetworkPair {
    pub kinetic: TrainingResults,
    pub potential: TrainingResults,
}

impl EnergyNetworkPair {
    pub fn kinetic_network(&self) -> &HamiltonianNetwork {
        &self.kinetic.network
    }

    pub fn potential_network(&self) -> &HamiltonianNetwork {
        &self.potential.network
    }

    /// Störmer–Verlet integrator driven by the trained pair
    pub fn integrator(&self) -> StormerVerlet<'_, HamiltonianNetwork, HamiltonianNetwork> {
        StormerVerlet::new(self.kinetic_network(), self.potential_network())
    }
}

/// Configs for the T-net: explicit seeds are offset by one so the two
/// networks neither start from the same Θ nor draw the same batches.
fn kinetic_configs(
    network_config: &NetworkConfig,
    training_config: &TrainingConfig,
) -> (NetworkConfig, TrainingConfig) {
    let mut network = network_config.clone();
    network.seed = network.seed.map(|s| s.wrapping_add(1));
    let mut training = training_config.clone();
    training.sampler_seed = training.sampler_seed.map(|s| s.wrapping_add(1));
    (network, training)
}

/// Train the V-net on (Q, V) and the T-net on (P, T).
pub fn train_energy_pair(
    data: &TrajectoryData,
    network_config: NetworkConfig,
    training_config: TrainingConfig,
) -> HnnResult<EnergyNetworkPair> {
    let (kinetic_network, kinetic_training) = kinetic_configs(&network_config, &training_config);
    let potential_trainer = NetworkTrainer::new(training_config);
    let kinetic_trainer = NetworkTrainer::new(kinetic_training);

    #[cfg(feature = "parallel")]
    let (potential, kinetic) = rayon::join(
        || potential_trainer.train_component(data, EnergyComponent::Potential, network_config),
        || kinetic_trainer.train_component(data, EnergyComponent::Kinetic, kinetic_network),
    );

    #[cfg(not(feature = "parallel"))]
    let (potential, kinetic) = (
        potential_trainer.train_component(data, EnergyComponent::Potential, network_config),
        kinetic_trainer.train_component(data, EnergyComponent::Kinetic, kinetic_network),
    );

    Ok(EnergyNetworkPair {
        kinetic: kinetic?,
        potential: potential?,
    })
}

// === TESTS ===
