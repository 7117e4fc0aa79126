use ndarray::{Array, ArrayBase, Data, Dimension};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RlPackError};

/// An enumeration of the activation functions available to network layers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum Activation {
    #[default]
    Relu,
    Linear,
    Sigmoid,
    Tanh,
    LeakyRelu { alpha: f64 },
    Elu { alpha: f64 },
}

impl Activation {
    /// Parse an activation from the name used in `model_args`.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "relu" => Ok(Activation::Relu),
            "linear" | "identity" => Ok(Activation::Linear),
            "sigmoid" => Ok(Activation::Sigmoid),
            "tanh" => Ok(Activation::Tanh),
            "leaky_relu" | "leakyrelu" => Ok(Activation::LeakyRelu { alpha: 0.01 }),
            "elu" => Ok(Activation::Elu { alpha: 1.0 }),
            other => Err(RlPackError::configuration(
                "activation".to_string(),
                format!("Unknown activation '{}'", other),
            )),
        }
    }

    /// Activation value for a single scalar
    #[inline]
    pub fn value(&self, v: f64) -> f64 {
        match *self {
            Activation::Relu => v.max(0.0),
            Activation::Linear => v,
            Activation::Sigmoid => 1.0 / (1.0 + (-v).exp()),
            Activation::Tanh => v.tanh(),
            Activation::LeakyRelu { alpha } => {
                if v > 0.0 {
                    v
                } else {
                    alpha * v
                }
            }
            Activation::Elu { alpha } => {
                if v > 0.0 {
                    v
                } else {
                    alpha * (v.exp() - 1.0)
                }
            }
        }
    }

    /// Derivative with respect to the pre-activation input
    #[inline]
    pub fn gradient(&self, v: f64) -> f64 {
        match *self {
            Activation::Relu => {
                if v > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Linear => 1.0,
            Activation::Sigmoid => {
                let sigmoid = 1.0 / (1.0 + (-v).exp());
                sigmoid * (1.0 - sigmoid)
            }
            Activation::Tanh => {
                let tanh_v = v.tanh();
                1.0 - tanh_v * tanh_v
            }
            Activation::LeakyRelu { alpha } => {
                if v > 0.0 {
                    1.0
                } else {
                    alpha
                }
            }
            Activation::Elu { alpha } => {
                if v > 0.0 {
                    1.0
                } else {
                    alpha * v.exp()
                }
            }
        }
    }

    /// Apply the activation function to an array of any dimensionality in-place.
    pub fn apply<D: Dimension>(&self, inputs: &mut Array<f64, D>) {
        if let Activation::Linear = self {
            return;
        }
        let act = *self;
        inputs.mapv_inplace(|v| act.value(v));
    }

    /// Compute the element-wise derivative for an array of pre-activation values.
    pub fn derivative<S, D>(&self, inputs: &ArrayBase<S, D>) -> Array<f64, D>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let act = *self;
        inputs.mapv(|v| act.gradient(v))
    }
}
