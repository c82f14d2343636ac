/**
 * @file zen-hamiltonian/src/hnn/activations.rs
 * @brief Activation functions for the residual layers
 *
 * Every activation is applied element-wise through `ndarray::mapv`. The
 * derivative routines take the *pre-activation* `A = W Z + b`, which is what the
 * backward pass caches, so no inverse of the activation is ever needed.
 */

use ndarray::Array2;

use super::{ActivationType, HnnError, HnnResult};

/// Collection of activation function implementations.
pub struct ActivationFunctions;

impl ActivationFunctions {
    /// σ(x) for a single value
    #[inline]
    pub fn value(activation: ActivationType, x: f64) -> f64 {
        match activation {
            ActivationType::Tanh => x.tanh(),
            ActivationType::Sigmoid => sigmoid(x),
            ActivationType::ReLU => x.max(0.0),
            ActivationType::Swish => x * sigmoid(x),
            ActivationType::Linear => x,
        }
    }

    /// σ'(x) for a single value
    #[inline]
    pub fn derivative(activation: ActivationType, x: f64) -> f64 {
        match activation {
            ActivationType::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            ActivationType::Sigmoid => {
                let s = sigmoid(x);
                s * (1.0 - s)
            }
            // Subgradient 0 at the kink
            ActivationType::ReLU => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            ActivationType::Swish => {
                let s = sigmoid(x);
                s + x * s * (1.0 - s)
            }
            ActivationType::Linear => 1.0,
        }
    }

    /// Element-wise σ(A)
    pub fn apply(activation: ActivationType, input: &Array2<f64>) -> Array2<f64> {
        input.mapv(|x| Self::value(activation, x))
    }

    /// Element-wise σ'(A)
    pub fn apply_derivative(activation: ActivationType, input: &Array2<f64>) -> Array2<f64> {
        input.mapv(|x| Self::derivative(activation, x))
    }

    /// Parse an activation name (for configuration files)
    pub fn from_string(name: &str) -> HnnResult<ActivationType> {
        match name.to_lowercase().as_str() {
            "tanh" => Ok(ActivationType::Tanh),
            "sigmoid" => Ok(ActivationType::Sigmoid),
            "relu" => Ok(ActivationType::ReLU),
            "swish" | "silu" => Ok(ActivationType::Swish),
            "linear" | "identity" => Ok(ActivationType::Linear),
            _ => Err(HnnError::InvalidConfiguration(format!(
                "Unknown activation function: {}",
                name
            ))),
        }
    }
}

#[inline]
fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

// === TESTS ===

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    const ALL: [ActivationType; 5] = [
        ActivationType::Tanh,
        ActivationType::Sigmoid,
        ActivationType::ReLU,
        ActivationType::Swish,
        ActivationType::Linear,
    ];

    #[test]
    fn test_values() {
        assert_relative_eq!(ActivationFunctions::value(ActivationType::Tanh, 0.5), 0.5f64.tanh());
        assert_relative_eq!(ActivationFunctions::value(ActivationType::Sigmoid, 0.0), 0.5);
        assert_eq!(ActivationFunctions::value(ActivationType::ReLU, -3.0), 0.0);
        assert_eq!(ActivationFunctions::value(ActivationType::Linear, -3.0), -3.0);
    }

    #[test]
    fn test_derivatives_match_finite_differences() {
        let eps = 1e-6;
        for activation in ALL {
            for &x in &[-2.3, -0.4, 0.3, 1.7] {
                let numeric = (ActivationFunctions::value(activation, x + eps)
                    - ActivationFunctions::value(activation, x - eps))
                    / (2.0 * eps);
                assert_relative_eq!(
                    ActivationFunctions::derivative(activation, x),
                    numeric,
                    epsilon = 1e-7
                );
            }
        }
    }

    #[test]
    fn test_sigmoid_is_stable_for_large_inputs() {
        let out = ActivationFunctions::apply(ActivationType::Sigmoid, &array![[-800.0, 800.0]]);
        assert!(out.iter().all(|v| v.is_finite()));
        assert_relative_eq!(out[[0, 0]], 0.0);
        assert_relative_eq!(out[[0, 1]], 1.0);
    }

    #[test]
    fn test_from_string() {
        assert_eq!(ActivationFunctions::from_string("TANH").unwrap(), ActivationType::Tanh);
        assert_eq!(ActivationFunctions::from_string("identity").unwrap(), ActivationType::Linear);
        assert!(matches!(
            ActivationFunctions::from_string("softmax"),
            Err(HnnError::InvalidConfiguration(_))
        ));
    }
}
