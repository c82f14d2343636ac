//! Network and training configuration, builders and validation.
//!
//! Defaults reproduce the reference experiment: a 4-wide residual network with
//! 30 layers and step 0.1, trained for 3000 Adam iterations with `tau = 0.1` on
//! three-dimensional positions or momenta.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::params::OptimizerMethod;
use super::{ActivationType, HnnError, HnnResult, WeightInitialization};

/// Architecture hyperparameters of one energy network.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    /// Physical input dimension `d0` (before zero-padding)
    pub input_dim: usize,

    /// Hidden width `d`; every residual layer maps `d → d`
    pub hidden_dim: usize,

    /// Rows of the output projection (1 for a scalar energy)
    pub output_dim: usize,

    /// Number of residual layers `K`
    pub num_layers: usize,

    /// Residual step `h` (architecture constant, not a learning rate)
    pub step_size: f64,

    /// Maximum mini-batch width, fixed for the network's lifetime
    pub chunk: usize,

    /// Activation σ inside every residual layer
    pub activation: ActivationType,

    /// Weight initialization strategy
    pub weight_init: WeightInitialization,

    /// Random seed for reproducible initialization
    pub seed: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            input_dim: 3,
            hidden_dim: 4,
            output_dim: 1,
            num_layers: 30,
            step_size: 0.1,
            chunk: 32,
            activation: ActivationType::Tanh,
            weight_init: WeightInitialization::Xavier,
            seed: None,
        }
    }
}

impl NetworkConfig {
    /// Start a fluent builder from the defaults
    pub fn builder() -> NetworkConfigBuilder {
        NetworkConfigBuilder::default()
    }

    /// Reject configurations the network cannot be built from
    pub fn validate(&self) -> HnnResult<()> {
        if self.hidden_dim == 0 {
            return Err(HnnError::InvalidConfiguration(
                "Hidden dimension must be greater than 0".to_string(),
            ));
        }
        if self.num_layers == 0 {
            return Err(HnnError::InvalidConfiguration(
                "Number of residual layers must be greater than 0".to_string(),
            ));
        }
        if self.input_dim == 0 {
            return Err(HnnError::InvalidConfiguration(
                "Input dimension must be greater than 0".to_string(),
            ));
        }
        if self.input_dim > self.hidden_dim {
            return Err(HnnError::InvalidConfiguration(format!(
                "Input dimension {} exceeds hidden dimension {}",
                self.input_dim, self.hidden_dim
            )));
        }
        if self.output_dim == 0 {
            return Err(HnnError::InvalidConfiguration(
                "Output dimension must be greater than 0".to_string(),
            ));
        }
        if self.chunk == 0 {
            return Err(HnnError::InvalidConfiguration(
                "Chunk size must be greater than 0".to_string(),
            ));
        }
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(HnnError::InvalidConfiguration(format!(
                "Residual step size must be positive and finite, got {}",
                self.step_size
            )));
        }
        match self.weight_init {
            WeightInitialization::Normal { std, .. } if !(std >= 0.0) => {
                Err(HnnError::InvalidConfiguration(format!(
                    "Normal initialization needs a non-negative std, got {}",
                    std
                )))
            }
            WeightInitialization::Uniform { min, max } if !(min < max) => {
                Err(HnnError::InvalidConfiguration(format!(
                    "Uniform initialization needs min < max, got [{}, {})",
                    min, max
                )))
            }
            _ => Ok(()),
        }
    }

    /// Total number of trainable scalars in Θ
    pub fn parameter_count(&self) -> usize {
        let d = self.hidden_dim;
        self.num_layers * (d * d + d) + self.output_dim * d + self.output_dim
    }
}

/// Fluent builder for [`NetworkConfig`]
#[derive(Debug, Default)]
pub struct NetworkConfigBuilder {
    config: NetworkConfig,
}

impl NetworkConfigBuilder {
    pub fn input_dim(mut self, d0: usize) -> Self {
        self.config.input_dim = d0;
        self
    }

    pub fn hidden_dim(mut self, d: usize) -> Self {
        self.config.hidden_dim = d;
        self
    }

    pub fn output_dim(mut self, dim: usize) -> Self {
        self.config.output_dim = dim;
        self
    }

    pub fn num_layers(mut self, k: usize) -> Self {
        self.config.num_layers = k;
        self
    }

    pub fn step_size(mut self, h: f64) -> Self {
        self.config.step_size = h;
        self
    }

    pub fn chunk(mut self, chunk: usize) -> Self {
        self.config.chunk = chunk;
        self
    }

    pub fn activation(mut self, activation: ActivationType) -> Self {
        self.config.activation = activation;
        self
    }

    pub fn weight_init(mut self, init: WeightInitialization) -> Self {
        self.config.weight_init = init;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> HnnResult<NetworkConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Decay and stability constants of the Adam-style update.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdamConfig {
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

impl AdamConfig {
    pub fn validate(&self) -> HnnResult<()> {
        let in_unit = |b: f64| (0.0..1.0).contains(&b);
        if !in_unit(self.beta1) || !in_unit(self.beta2) {
            return Err(HnnError::InvalidConfiguration(format!(
                "Adam decay constants must lie in [0, 1), got beta1={} beta2={}",
                self.beta1, self.beta2
            )));
        }
        if !(self.epsilon > 0.0) {
            return Err(HnnError::InvalidConfiguration(format!(
                "Adam epsilon must be positive, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}

/// Training loop settings.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    /// Parameter update rule
    pub method: OptimizerMethod,

    /// Fixed iteration budget (the only termination condition)
    pub iterations: usize,

    /// Learning rate
    pub tau: f64,

    /// Mini-batch width
    pub chunk: usize,

    /// Adam constants (ignored by the vanilla rule)
    pub adam: AdamConfig,

    /// Seed for the batch sampler
    pub sampler_seed: Option<u64>,

    /// Log the objective every N iterations (0 disables progress logging)
    pub log_every: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            method: OptimizerMethod::Adam,
            iterations: 3000,
            tau: 0.1,
            chunk: 32,
            adam: AdamConfig::default(),
            sampler_seed: None,
            log_every: 100,
        }
    }
}

impl TrainingConfig {
    pub fn builder() -> TrainingConfigBuilder {
        TrainingConfigBuilder::default()
    }

    /// Chunk size that splits `total` samples into `divisions` mini-batches,
    /// never smaller than one sample.
    pub fn chunk_for_dataset(total: usize, divisions: usize) -> usize {
        if divisions == 0 {
            return total.max(1);
        }
        (total / divisions).max(1)
    }

    pub fn validate(&self) -> HnnResult<()> {
        if self.chunk == 0 {
            return Err(HnnError::InvalidConfiguration(
                "Chunk size must be greater than 0".to_string(),
            ));
        }
        if !self.tau.is_finite() || self.tau <= 0.0 {
            return Err(HnnError::InvalidConfiguration(format!(
                "Learning rate tau must be positive and finite, got {}",
                self.tau
            )));
        }
        if self.method == OptimizerMethod::Adam {
            self.adam.validate()?;
        }
        Ok(())
    }
}

/// Fluent builder for [`TrainingConfig`]
#[derive(Debug, Default)]
pub struct TrainingConfigBuilder {
    config: TrainingConfig,
}

impl TrainingConfigBuilder {
    pub fn method(mut self, method: OptimizerMethod) -> Self {
        self.config.method = method;
        self
    }

    /// Set the method by name ("vanilla" or "adams")
    pub fn method_name(mut self, name: &str) -> HnnResult<Self> {
        self.config.method = name.parse()?;
        Ok(self)
    }

    pub fn iterations(mut self, iterations: usize) -> Self {
        self.config.iterations = iterations;
        self
    }

    pub fn tau(mut self, tau: f64) -> Self {
        self.config.tau = tau;
        self
    }

    pub fn chunk(mut self, chunk: usize) -> Self {
        self.config.chunk = chunk;
        self
    }

    pub fn adam(mut self, adam: AdamConfig) -> Self {
        self.config.adam = adam;
        self
    }

    pub fn sampler_seed(mut self, seed: u64) -> Self {
        self.config.sampler_seed = Some(seed);
        self
    }

    pub fn log_every(mut self, every: usize) -> Self {
        self.config.log_every = every;
        self
    }

    pub fn build(self) -> HnnResult<TrainingConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// === TESTS ===

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_config_default() {
        let config = NetworkConfig::default();
        assert_eq!(config.input_dim, 3);
        assert_eq!(config.hidden_dim, 4);
        assert_eq!(config.num_layers, 30);
        assert_eq!(config.activation, ActivationType::Tanh);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_rejects_input_wider_than_hidden() {
        let result = NetworkConfig::builder().input_dim(5).hidden_dim(4).build();
        assert!(matches!(result, Err(HnnError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_builder_rejects_zero_layers() {
        let result = NetworkConfig::builder().input_dim(1).hidden_dim(2).num_layers(0).build();
        assert!(matches!(result, Err(HnnError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_builder_rejects_zero_chunk() {
        let result = NetworkConfig::builder().chunk(0).build();
        assert!(matches!(result, Err(HnnError::InvalidConfiguration(_))));

        let result = TrainingConfig::builder().chunk(0).build();
        assert!(matches!(result, Err(HnnError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_parameter_count() {
        let config = NetworkConfig::builder()
            .input_dim(2)
            .hidden_dim(4)
            .num_layers(3)
            .build()
            .unwrap();
        // 3 * (16 + 4) + 4 + 1
        assert_eq!(config.parameter_count(), 65);
    }

    #[test]
    fn test_training_config_method_name() {
        let config = TrainingConfig::builder()
            .method_name("vanilla")
            .unwrap()
            .tau(0.05)
            .build()
            .unwrap();
        assert_eq!(config.method, OptimizerMethod::Vanilla);

        let err = TrainingConfig::builder().method_name("rmsprop").unwrap_err();
        assert!(matches!(err, HnnError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_chunk_for_dataset() {
        assert_eq!(TrainingConfig::chunk_for_dataset(2560, 256), 10);
        assert_eq!(TrainingConfig::chunk_for_dataset(100, 256), 1);
        assert_eq!(TrainingConfig::chunk_for_dataset(7, 0), 7);
    }

    #[test]
    fn test_adam_config_validation() {
        assert!(AdamConfig::default().validate().is_ok());
        let bad = AdamConfig {
            beta1: 1.0,
            ..AdamConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
