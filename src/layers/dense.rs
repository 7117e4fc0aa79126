use ndarray::{Array1, Array2, ArrayView2, ArrayViewD, ArrayViewMutD, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::initialization::WeightInit;
use super::traits::{Layer as LayerTrait, LayerGradients};
use crate::activations::Activation;
use crate::error::Result;

/// A fully connected (dense) layer in a neural network
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DenseLayer {
    pub weights: Array2<f64>,
    pub biases: Array1<f64>,
    pub activation: Activation,
}

/// Values kept from a training forward pass for the backward pass
pub struct DenseCache {
    inputs: Array2<f64>,
    pre_activation: Array2<f64>,
}

impl DenseLayer {
    /// Create a new dense layer with weights drawn from the initializer
    /// recommended for `activation`. Biases start at zero.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Result<Self> {
        Self::with_init(
            input_size,
            output_size,
            activation,
            WeightInit::for_activation(&activation),
            rng,
        )
    }

    pub fn with_init<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        init: WeightInit,
        rng: &mut R,
    ) -> Result<Self> {
        let weights = init.initialize((input_size, output_size), input_size, output_size, rng)?;
        Ok(DenseLayer {
            weights,
            biases: Array1::zeros(output_size),
            activation,
        })
    }

    /// Forward pass for a batch of input vectors `[batch, input_size]`.
    pub fn forward_batch(&self, inputs: ArrayView2<f64>) -> Array2<f64> {
        let mut outputs = self.affine(inputs);
        self.activation.apply(&mut outputs);
        outputs
    }

    /// Forward pass that also returns what the backward pass needs.
    pub fn forward_cached(&self, inputs: ArrayView2<f64>) -> (Array2<f64>, DenseCache) {
        let pre_activation = self.affine(inputs);
        let mut outputs = pre_activation.clone();
        self.activation.apply(&mut outputs);
        let cache = DenseCache {
            inputs: inputs.to_owned(),
            pre_activation,
        };
        (outputs, cache)
    }

    /// Backward pass for a batch of output errors.
    ///
    /// Returns the error with respect to the layer input together with the
    /// weight and bias gradients.
    pub fn backward_batch(
        &self,
        cache: &DenseCache,
        output_errors: ArrayView2<f64>,
    ) -> LayerGradients<Array2<f64>> {
        let activation_deriv = self.activation.derivative(&cache.pre_activation);
        let adjusted_error = &output_errors * &activation_deriv;
        let weight_gradients = cache.inputs.t().dot(&adjusted_error);
        let bias_gradients = adjusted_error.sum_axis(Axis(0));
        let input_errors = adjusted_error.dot(&self.weights.t());

        LayerGradients {
            input_errors,
            parameter_grads: vec![weight_gradients.into_dyn(), bias_gradients.into_dyn()],
        }
    }

    fn affine(&self, inputs: ArrayView2<f64>) -> Array2<f64> {
        inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0))
    }
}

impl LayerTrait for DenseLayer {
    fn parameters(&self) -> Vec<ArrayViewD<'_, f64>> {
        vec![self.weights.view().into_dyn(), self.biases.view().into_dyn()]
    }

    fn parameters_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>> {
        vec![
            self.weights.view_mut().into_dyn(),
            self.biases.view_mut().into_dyn(),
        ]
    }

    fn output_size(&self) -> usize {
        self.weights.shape()[1]
    }

    fn input_size(&self) -> usize {
        self.weights.shape()[0]
    }
}
