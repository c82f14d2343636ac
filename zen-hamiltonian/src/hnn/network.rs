/**
 * @file zen-hamiltonian/src/hnn/network.rs
 * @brief Residual energy network: forward, backward and input gradients
 *
 * ## Forward recursion
 *
 * ```text
 * Z_{k+1} = Z_k + h · σ(W_k Z_k + b_k),   k = 0..K-1
 * Y       = W_out Z_K + b_out
 * J       = mean((Y − c)²)
 * ```
 *
 * Each residual layer is one explicit-Euler step of an ODE in the hidden state,
 * so the backward pass carries `P_k = ∂J/∂Z_k` from the output projection down
 * through the layers:
 *
 * ```text
 * P_K = W_outᵀ ∂J/∂Y
 * S_k = h · σ'(A_k) ⊙ P_{k+1}          (A_k = W_k Z_k + b_k, cached)
 * ∂J/∂W_k = S_k Z_kᵀ,  ∂J/∂b_k = Σ_cols S_k
 * P_k = P_{k+1} + W_kᵀ S_k
 * ```
 *
 * The same reverse recursion seeded with `W_outᵀ` yields the gradient of a
 * scalar output with respect to the network input, which is what the
 * integrator consumes as ∂T/∂p or ∂V/∂q.
 */

use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::activations::ActivationFunctions;
use super::config::{AdamConfig, NetworkConfig};
use super::params::{OptimizerMethod, ParameterContainer, Parameters};
use super::{HnnError, HnnResult};

/// Residual feed-forward network that owns its parameters and current batch.
#[derive(Debug, Clone)]
pub struct HamiltonianNetwork {
    config: NetworkConfig,

    /// Θ and optimizer state (exclusively owned)
    params: ParameterContainer,

    /// Layer states `Z_0..Z_K`, each `d × width`; `Z_0` is the current batch
    layers: Vec<Array2<f64>>,

    /// Pre-activations `A_0..A_{K-1}` from the last forward pass
    pre_activations: Vec<Array2<f64>>,

    /// Targets of the current batch, `output_dim × width`
    target: Array2<f64>,

    /// Prediction `Y` from the last forward pass
    output: Array2<f64>,

    /// Objective from the last forward pass
    objective: Option<f64>,

    /// Whether activations match the current batch and Θ
    fresh: bool,
}

impl HamiltonianNetwork {
    /// Build a network with randomly initialised Θ and a first mini-batch
    pub fn new(config: NetworkConfig, z0: Array2<f64>, target: Array2<f64>) -> HnnResult<Self> {
        Self::with_adam_config(config, AdamConfig::default(), z0, target)
    }

    /// Same as [`new`](Self::new) with explicit Adam constants
    pub fn with_adam_config(
        config: NetworkConfig,
        adam_config: AdamConfig,
        z0: Array2<f64>,
        target: Array2<f64>,
    ) -> HnnResult<Self> {
        config.validate()?;
        adam_config.validate()?;

        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let params = ParameterContainer::initialize(&config, adam_config, &mut rng)?;

        Self::from_parameters(config, params, z0, target)
    }

    /// Build a network around an existing parameter container (e.g. a restored snapshot)
    pub fn from_parameters(
        config: NetworkConfig,
        params: ParameterContainer,
        z0: Array2<f64>,
        target: Array2<f64>,
    ) -> HnnResult<Self> {
        config.validate()?;
        if !params.theta().same_shape(&Parameters::zeros(&config)) {
            return Err(HnnError::DimensionMismatch(format!(
                "Parameter shapes do not match config (K={}, d={}, outputs={})",
                config.num_layers, config.hidden_dim, config.output_dim
            )));
        }
        Self::validate_batch(&config, &z0, &target)?;

        let width = z0.ncols();
        let d = config.hidden_dim;
        let k = config.num_layers;

        let mut layers = Vec::with_capacity(k + 1);
        layers.push(z0);
        layers.extend((0..k).map(|_| Array2::zeros((d, width))));

        Ok(Self {
            pre_activations: vec![Array2::zeros((d, width)); k],
            output: Array2::zeros((config.output_dim, width)),
            config,
            params,
            layers,
            target,
            objective: None,
            fresh: false,
        })
    }

    fn validate_batch(config: &NetworkConfig, z0: &Array2<f64>, target: &Array2<f64>) -> HnnResult<()> {
        let (rows, width) = z0.dim();
        if rows != config.hidden_dim {
            return Err(HnnError::DimensionMismatch(format!(
                "Input batch has {} rows but hidden dimension is {}; zero-pad with embed_input first",
                rows, config.hidden_dim
            )));
        }
        if width == 0 || width > config.chunk {
            return Err(HnnError::DimensionMismatch(format!(
                "Batch width {} must be between 1 and chunk {}",
                width, config.chunk
            )));
        }
        if target.dim() != (config.output_dim, width) {
            return Err(HnnError::DimensionMismatch(format!(
                "Target shape {:?} does not match expected ({}, {})",
                target.dim(),
                config.output_dim,
                width
            )));
        }
        Ok(())
    }

    /// Install the next mini-batch; activations become stale.
    pub fn set_batch(&mut self, z0: Array2<f64>, target: Array2<f64>) -> HnnResult<()> {
        Self::validate_batch(&self.config, &z0, &target)?;
        self.layers[0] = z0;
        self.target = target;
        self.fresh = false;
        Ok(())
    }

    // === FORWARD ===

    /// Recompute all layer states, the prediction and the objective for the current batch.
    pub fn forward_function(&mut self) {
        let (layers, pre_activations) =
            forward_states(&self.config, self.params.theta(), self.layers[0].clone());
        let output = project(self.params.theta(), &layers[self.config.num_layers]);

        let residual = &output - &self.target;
        let objective = residual.mapv(|r| r * r).sum() / residual.len() as f64;

        self.layers = layers;
        self.pre_activations = pre_activations;
        self.output = output;
        self.objective = Some(objective);
        self.fresh = true;
    }

    /**
     * Gradient of J with respect to every tensor in Θ.
     *
     * Requires a forward pass on the current batch and parameters; a parameter
     * update or a new batch since the last forward pass is rejected.
     */
    pub fn back_propagation(&self) -> HnnResult<Parameters> {
        if !self.fresh {
            return Err(HnnError::StaleActivations(
                "forward_function() must run after the last batch or parameter change".to_string(),
            ));
        }

        let theta = self.params.theta();
        let k = self.config.num_layers;

        // ∂J/∂Y for the mean squared error
        let g_y = (&self.output - &self.target) * (2.0 / self.output.len() as f64);

        let mut gradient = theta.zeros_like();
        gradient.output_weights = g_y.dot(&self.layers[k].t());
        gradient.output_bias = g_y.sum_axis(Axis(1));

        let seed = theta.output_weights.t().dot(&g_y);
        reverse_pass(
            &self.config,
            theta,
            &self.layers,
            &self.pre_activations,
            seed,
            Some(&mut gradient),
        );

        Ok(gradient)
    }

    /// Evaluate the network on an arbitrary `d × n` batch without touching stored state.
    pub fn calculate_output(&self, x: ArrayView2<'_, f64>) -> HnnResult<Array2<f64>> {
        self.check_input_rows(&x)?;
        let (layers, _) = forward_states(&self.config, self.params.theta(), x.to_owned());
        Ok(project(self.params.theta(), &layers[self.config.num_layers]))
    }

    /// Gradient of the scalar output with respect to each input column (`d × n`).
    pub fn input_gradient(&self, x: ArrayView2<'_, f64>) -> HnnResult<Array2<f64>> {
        self.check_input_rows(&x)?;
        if self.config.output_dim != 1 {
            return Err(HnnError::DimensionMismatch(format!(
                "Input gradients need a scalar output, network has {} outputs",
                self.config.output_dim
            )));
        }

        let theta = self.params.theta();
        let (layers, pre_activations) = forward_states(&self.config, theta, x.to_owned());

        let w_out = theta.output_weights.row(0);
        let seed = Array2::from_shape_fn((self.config.hidden_dim, x.ncols()), |(i, _)| w_out[i]);

        Ok(reverse_pass(&self.config, theta, &layers, &pre_activations, seed, None))
    }

    fn check_input_rows(&self, x: &ArrayView2<'_, f64>) -> HnnResult<()> {
        if x.nrows() != self.config.hidden_dim {
            return Err(HnnError::DimensionMismatch(format!(
                "Input has {} rows but hidden dimension is {}; zero-pad with embed_input first",
                x.nrows(),
                self.config.hidden_dim
            )));
        }
        Ok(())
    }

    // === UPDATES ===

    /// Apply one optimizer step to Θ; activations become stale.
    pub fn update_parameters(
        &mut self,
        gradient: &Parameters,
        method: OptimizerMethod,
        tau: f64,
        iteration: u64,
    ) -> HnnResult<()> {
        self.fresh = false;
        self.params.update_parameters(gradient, method, tau, iteration)
    }

    #[cfg(test)]
    pub(crate) fn theta_mut(&mut self) -> &mut Parameters {
        self.fresh = false;
        self.params.theta_mut()
    }

    // === ACCESSORS ===

    /// J from the last forward pass
    pub fn objective(&self) -> Option<f64> {
        self.objective
    }

    /// Prediction `Y` from the last forward pass
    pub fn output(&self) -> &Array2<f64> {
        &self.output
    }

    /// Targets of the current batch
    pub fn target(&self) -> &Array2<f64> {
        &self.target
    }

    /// Layer states `Z_0..Z_K`
    pub fn layer_states(&self) -> &[Array2<f64>] {
        &self.layers
    }

    /// True when the stored prediction belongs to the current batch and Θ
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub fn parameters(&self) -> &ParameterContainer {
        &self.params
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn chunk(&self) -> usize {
        self.config.chunk
    }

    /// Width of the batch currently installed
    pub fn batch_width(&self) -> usize {
        self.layers[0].ncols()
    }
}

/// Run the residual recursion from `z0`, returning `Z_0..Z_K` and `A_0..A_{K-1}`.
fn forward_states(
    config: &NetworkConfig,
    theta: &Parameters,
    z0: Array2<f64>,
) -> (Vec<Array2<f64>>, Vec<Array2<f64>>) {
    let h = config.step_size;
    let mut layers = Vec::with_capacity(config.num_layers + 1);
    let mut pre_activations = Vec::with_capacity(config.num_layers);
    layers.push(z0);

    for (w, b) in theta.weights.iter().zip(&theta.biases) {
        let z = &layers[layers.len() - 1];
        let a = affine(w, b, z);
        let next = z + &(ActivationFunctions::apply(config.activation, &a) * h);
        pre_activations.push(a);
        layers.push(next);
    }

    (layers, pre_activations)
}

/// Output projection `W_out Z_K + b_out`
fn project(theta: &Parameters, z_k: &Array2<f64>) -> Array2<f64> {
    affine(&theta.output_weights, &theta.output_bias, z_k)
}

fn affine(w: &Array2<f64>, b: &Array1<f64>, z: &Array2<f64>) -> Array2<f64> {
    w.dot(z) + &b.view().insert_axis(Axis(1))
}

/// Carry `P = ∂(·)/∂Z_K` back to `∂(·)/∂Z_0`, filling layer gradients when requested.
fn reverse_pass(
    config: &NetworkConfig,
    theta: &Parameters,
    layers: &[Array2<f64>],
    pre_activations: &[Array2<f64>],
    seed: Array2<f64>,
    mut gradient: Option<&mut Parameters>,
) -> Array2<f64> {
    let h = config.step_size;
    let mut p = seed;

    for k in (0..config.num_layers).rev() {
        let s = ActivationFunctions::apply_derivative(config.activation, &pre_activations[k]) * h * &p;

        if let Some(grad) = gradient.as_deref_mut() {
            grad.weights[k] = s.dot(&layers[k].t());
            grad.biases[k] = s.sum_axis(Axis(1));
        }

        p = p + theta.weights[k].t().dot(&s);
    }

    p
}

// === TESTS ===
