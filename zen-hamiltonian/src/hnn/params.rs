/**
 * @file zen-hamiltonian/src/hnn/params.rs
 * @brief Parameter container and optimizer update rules
 *
 * Θ consists of K residual weight matrices `W_k` (d×d) with biases `b_k` (d),
 * plus one output projection `W_out` (output_dim×d) with bias `b_out`. Gradients
 * share the same [`Parameters`] type, so shape agreement is a single check.
 *
 * Two update rules are supported and selected per call:
 * - **Vanilla**: `Θ ← Θ − τ·g`
 * - **Adam**: bias-corrected first/second moment estimates,
 *   `Θ ← Θ − τ·m̂ / (√v̂ + ε)`
 *
 * The optimizer state is a tagged variant: nothing is stored for the vanilla
 * rule, while Adam keeps moment accumulators that mirror Θ's shapes and the last
 * 1-based step applied.
 */

use std::fmt;
use std::str::FromStr;

use ndarray::{Array, Array1, Array2, Dimension, Zip};
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::{Normal, Uniform};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::config::{AdamConfig, NetworkConfig};
use super::{HnnError, HnnResult, WeightInitialization};

// === OPTIMIZER SELECTION ===

/// Parameter update rule
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptimizerMethod {
    /// Plain gradient descent
    Vanilla,
    /// Adam-style adaptive moments
    Adam,
}

impl FromStr for OptimizerMethod {
    type Err = HnnError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_lowercase().as_str() {
            "vanilla" | "sgd" => Ok(OptimizerMethod::Vanilla),
            "adams" | "adam" => Ok(OptimizerMethod::Adam),
            _ => Err(HnnError::InvalidConfiguration(format!(
                "Unknown optimizer method: {}",
                name
            ))),
        }
    }
}

impl fmt::Display for OptimizerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizerMethod::Vanilla => f.write_str("vanilla"),
            OptimizerMethod::Adam => f.write_str("adams"),
        }
    }
}

// === PARAMETER TENSORS ===

/// Weights and biases of one network (also used for gradients).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    /// Residual weights `W_k`, each `d × d`
    pub weights: Vec<Array2<f64>>,
    /// Residual biases `b_k`, each of length `d`
    pub biases: Vec<Array1<f64>>,
    /// Output projection `W_out`, `output_dim × d`
    pub output_weights: Array2<f64>,
    /// Output bias `b_out`, length `output_dim`
    pub output_bias: Array1<f64>,
}

impl Parameters {
    /// All-zero tensors shaped for `config`
    pub fn zeros(config: &NetworkConfig) -> Self {
        let d = config.hidden_dim;
        Self {
            weights: vec![Array2::zeros((d, d)); config.num_layers],
            biases: vec![Array1::zeros(d); config.num_layers],
            output_weights: Array2::zeros((config.output_dim, d)),
            output_bias: Array1::zeros(config.output_dim),
        }
    }

    /// All-zero tensors with the same shapes as `self`
    pub fn zeros_like(&self) -> Self {
        Self {
            weights: self.weights.iter().map(|w| Array2::zeros(w.raw_dim())).collect(),
            biases: self.biases.iter().map(|b| Array1::zeros(b.raw_dim())).collect(),
            output_weights: Array2::zeros(self.output_weights.raw_dim()),
            output_bias: Array1::zeros(self.output_bias.raw_dim()),
        }
    }

    /// Random weights drawn per `config.weight_init`; biases start at zero.
    pub fn initialize<R: Rng + ?Sized>(config: &NetworkConfig, rng: &mut R) -> HnnResult<Self> {
        let d = config.hidden_dim;
        let mut weights = Vec::with_capacity(config.num_layers);
        for _ in 0..config.num_layers {
            weights.push(random_matrix((d, d), config.weight_init, rng)?);
        }

        Ok(Self {
            weights,
            biases: vec![Array1::zeros(d); config.num_layers],
            output_weights: random_matrix((config.output_dim, d), config.weight_init, rng)?,
            output_bias: Array1::zeros(config.output_dim),
        })
    }

    /// Number of residual layers `K`
    pub fn num_layers(&self) -> usize {
        self.weights.len()
    }

    /// Hidden width `d`
    pub fn hidden_dim(&self) -> usize {
        self.output_weights.ncols()
    }

    pub fn output_dim(&self) -> usize {
        self.output_weights.nrows()
    }

    /// Total number of scalars across all tensors
    pub fn parameter_count(&self) -> usize {
        self.weights.iter().map(|w| w.len()).sum::<usize>()
            + self.biases.iter().map(|b| b.len()).sum::<usize>()
            + self.output_weights.len()
            + self.output_bias.len()
    }

    /// Euclidean norm over every tensor
    pub fn l2_norm(&self) -> f64 {
        let mut total = 0.0;
        self.for_each_value(|x| total += x * x);
        total.sqrt()
    }

    /// True when every tensor of `other` has the matching shape
    pub fn same_shape(&self, other: &Parameters) -> bool {
        self.weights.len() == other.weights.len()
            && self.biases.len() == other.biases.len()
            && self
                .weights
                .iter()
                .zip(&other.weights)
                .all(|(a, b)| a.dim() == b.dim())
            && self
                .biases
                .iter()
                .zip(&other.biases)
                .all(|(a, b)| a.dim() == b.dim())
            && self.output_weights.dim() == other.output_weights.dim()
            && self.output_bias.dim() == other.output_bias.dim()
    }

    fn ensure_same_shape(&self, other: &Parameters) -> HnnResult<()> {
        if self.same_shape(other) {
            Ok(())
        } else {
            Err(HnnError::DimensionMismatch(format!(
                "Gradient shapes do not mirror parameters ({} layers, width {}, {} outputs)",
                self.num_layers(),
                self.hidden_dim(),
                self.output_dim()
            )))
        }
    }

    fn for_each_value(&self, mut f: impl FnMut(f64)) {
        for w in &self.weights {
            w.iter().for_each(|&x| f(x));
        }
        for b in &self.biases {
            b.iter().for_each(|&x| f(x));
        }
        self.output_weights.iter().for_each(|&x| f(x));
        self.output_bias.iter().for_each(|&x| f(x));
    }
}

fn random_matrix<R: Rng + ?Sized>(
    shape: (usize, usize),
    init: WeightInitialization,
    rng: &mut R,
) -> HnnResult<Array2<f64>> {
    let (fan_out, fan_in) = shape;
    let normal = |mean: f64, std: f64| {
        Normal::new(mean, std).map_err(|e| {
            HnnError::InvalidConfiguration(format!("Invalid normal distribution: {}", e))
        })
    };

    let matrix = match init {
        WeightInitialization::Xavier => {
            let std = (2.0 / (fan_in + fan_out) as f64).sqrt();
            Array2::random_using(shape, normal(0.0, std)?, rng)
        }
        WeightInitialization::He => {
            let std = (2.0 / fan_in as f64).sqrt();
            Array2::random_using(shape, normal(0.0, std)?, rng)
        }
        WeightInitialization::Normal { mean, std } => {
            Array2::random_using(shape, normal(mean, std)?, rng)
        }
        WeightInitialization::Uniform { min, max } => {
            if !(min < max) {
                return Err(HnnError::InvalidConfiguration(format!(
                    "Uniform initialization needs min < max, got [{}, {})",
                    min, max
                )));
            }
            Array2::random_using(shape, Uniform::new(min, max), rng)
        }
    };
    Ok(matrix)
}

// === OPTIMIZER STATE ===

/// Moment accumulators of the Adam rule.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct AdamState {
    /// First moment estimate `m`
    pub first_moment: Parameters,
    /// Second moment estimate `v`
    pub second_moment: Parameters,
    /// Last 1-based iteration applied (0 before the first update)
    pub step: u64,
}

impl AdamState {
    /// Zeroed moments shaped like `theta`
    pub fn new(theta: &Parameters) -> Self {
        Self {
            first_moment: theta.zeros_like(),
            second_moment: theta.zeros_like(),
            step: 0,
        }
    }
}

/// Tagged optimizer state
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum OptimizerState {
    Vanilla,
    Adam(AdamState),
}

/// Per-step scalars shared by every tensor in one Adam update
struct AdamStep {
    tau: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    bias_correction1: f64,
    bias_correction2: f64,
}

fn adam_tensor<D: Dimension>(
    theta: &mut Array<f64, D>,
    m: &mut Array<f64, D>,
    v: &mut Array<f64, D>,
    g: &Array<f64, D>,
    c: &AdamStep,
) {
    Zip::from(theta)
        .and(m)
        .and(v)
        .and(g)
        .for_each(|theta, m, v, &g| {
            *m = c.beta1 * *m + (1.0 - c.beta1) * g;
            *v = c.beta2 * *v + (1.0 - c.beta2) * g * g;
            let m_hat = *m / c.bias_correction1;
            let v_hat = *v / c.bias_correction2;
            *theta -= c.tau * m_hat / (v_hat.sqrt() + c.epsilon);
        });
}

fn vanilla_tensor<D: Dimension>(theta: &mut Array<f64, D>, g: &Array<f64, D>, tau: f64) {
    theta.zip_mut_with(g, |theta, &g| *theta -= tau * g);
}

// === CONTAINER ===

/// Θ together with the optimizer state that updates it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterContainer {
    theta: Parameters,
    optimizer: OptimizerState,
    adam_config: AdamConfig,
}

impl ParameterContainer {
    /// Wrap existing parameters; no optimizer state until the first Adam update
    pub fn new(theta: Parameters, adam_config: AdamConfig) -> Self {
        Self {
            theta,
            optimizer: OptimizerState::Vanilla,
            adam_config,
        }
    }

    /// Randomly initialised parameters for `config`
    pub fn initialize<R: Rng + ?Sized>(
        config: &NetworkConfig,
        adam_config: AdamConfig,
        rng: &mut R,
    ) -> HnnResult<Self> {
        Ok(Self::new(Parameters::initialize(config, rng)?, adam_config))
    }

    pub fn theta(&self) -> &Parameters {
        &self.theta
    }

    pub fn optimizer_state(&self) -> &OptimizerState {
        &self.optimizer
    }

    pub fn adam_config(&self) -> AdamConfig {
        self.adam_config
    }

    /// Last Adam step applied, if the Adam rule has been used
    pub fn adam_step(&self) -> Option<u64> {
        match &self.optimizer {
            OptimizerState::Adam(state) => Some(state.step),
            OptimizerState::Vanilla => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn theta_mut(&mut self) -> &mut Parameters {
        &mut self.theta
    }

    /**
     * Apply one update step in place.
     *
     * `iteration` is the 1-based global step count and drives Adam's bias
     * correction; it must be strictly greater than the previous Adam step. The
     * vanilla rule ignores it.
     */
    pub fn update_parameters(
        &mut self,
        gradient: &Parameters,
        method: OptimizerMethod,
        tau: f64,
        iteration: u64,
    ) -> HnnResult<()> {
        self.theta.ensure_same_shape(gradient)?;

        match method {
            OptimizerMethod::Vanilla => {
                let theta = &mut self.theta;
                for (w, g) in theta.weights.iter_mut().zip(&gradient.weights) {
                    vanilla_tensor(w, g, tau);
                }
                for (b, g) in theta.biases.iter_mut().zip(&gradient.biases) {
                    vanilla_tensor(b, g, tau);
                }
                vanilla_tensor(&mut theta.output_weights, &gradient.output_weights, tau);
                vanilla_tensor(&mut theta.output_bias, &gradient.output_bias, tau);
                Ok(())
            }
            OptimizerMethod::Adam => self.adam_update(gradient, tau, iteration),
        }
    }

    /// Same as [`update_parameters`](Self::update_parameters) with the method given by name
    pub fn update_parameters_by_name(
        &mut self,
        gradient: &Parameters,
        method: &str,
        tau: f64,
        iteration: u64,
    ) -> HnnResult<()> {
        let method: OptimizerMethod = method.parse()?;
        self.update_parameters(gradient, method, tau, iteration)
    }

    fn adam_update(&mut self, gradient: &Parameters, tau: f64, iteration: u64) -> HnnResult<()> {
        if iteration == 0 {
            return Err(HnnError::InvalidConfiguration(
                "Adam iteration counter is 1-based; got 0".to_string(),
            ));
        }

        let mut state = match std::mem::replace(&mut self.optimizer, OptimizerState::Vanilla) {
            OptimizerState::Adam(state) => state,
            OptimizerState::Vanilla => AdamState::new(&self.theta),
        };

        if iteration <= state.step {
            let last = state.step;
            self.optimizer = OptimizerState::Adam(state);
            return Err(HnnError::InvalidConfiguration(format!(
                "Adam step counter must increase: last step {}, got {}",
                last, iteration
            )));
        }

        let cfg = self.adam_config;
        let exponent = i32::try_from(iteration).unwrap_or(i32::MAX);
        let step = AdamStep {
            tau,
            beta1: cfg.beta1,
            beta2: cfg.beta2,
            epsilon: cfg.epsilon,
            bias_correction1: 1.0 - cfg.beta1.powi(exponent),
            bias_correction2: 1.0 - cfg.beta2.powi(exponent),
        };

        let theta = &mut self.theta;
        let (m, v) = (&mut state.first_moment, &mut state.second_moment);
        for k in 0..theta.weights.len() {
            adam_tensor(
                &mut theta.weights[k],
                &mut m.weights[k],
                &mut v.weights[k],
                &gradient.weights[k],
                &step,
            );
            adam_tensor(
                &mut theta.biases[k],
                &mut m.biases[k],
                &mut v.biases[k],
                &gradient.biases[k],
                &step,
            );
        }
        adam_tensor(
            &mut theta.output_weights,
            &mut m.output_weights,
            &mut v.output_weights,
            &gradient.output_weights,
            &step,
        );
        adam_tensor(
            &mut theta.output_bias,
            &mut m.output_bias,
            &mut v.output_bias,
            &gradient.output_bias,
            &step,
        );

        state.step = iteration;
        self.optimizer = OptimizerState::Adam(state);
        Ok(())
    }

    /// Serialize Θ, the moment accumulators and the step counter
    #[cfg(feature = "serde")]
    pub fn snapshot_json(&self) -> HnnResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restore a container produced by [`snapshot_json`](Self::snapshot_json)
    #[cfg(feature = "serde")]
    pub fn restore_json(json: &str) -> HnnResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// === TESTS ===
