//! 1D convolutional layer for sequence-shaped observations.
//!
//! Inputs are `[batch, channels, length]`. The output length follows
//! `floor((length - dilation * (kernel_size - 1) - 1) / stride) + 1`; there is
//! no padding.

use ndarray::{s, Array1, Array3, ArrayView3, ArrayViewD, ArrayViewMutD};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::initialization::WeightInit;
use super::traits::{Layer as LayerTrait, LayerGradients};
use crate::activations::Activation;
use crate::error::{Result, RlPackError};

/// 1D Convolutional Layer
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Conv1DLayer {
    /// Convolution kernels [out_channels, in_channels, kernel_size]
    pub kernels: Array3<f64>,

    /// Bias terms for each output channel
    pub biases: Array1<f64>,

    pub activation: Activation,
    pub stride: usize,
    pub dilation: usize,
}

/// Values kept from a training forward pass for the backward pass
pub struct ConvCache {
    input: Array3<f64>,
    pre_activation: Array3<f64>,
}

impl Conv1DLayer {
    pub fn new<R: Rng + ?Sized>(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        dilation: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Result<Self> {
        if in_channels == 0 || out_channels == 0 || kernel_size == 0 {
            return Err(RlPackError::configuration(
                "conv1d".to_string(),
                format!(
                    "channels and kernel size must be positive (in={}, out={}, kernel={})",
                    in_channels, out_channels, kernel_size
                ),
            ));
        }
        if stride == 0 || dilation == 0 {
            return Err(RlPackError::configuration(
                "conv1d".to_string(),
                format!("stride ({}) and dilation ({}) must be positive", stride, dilation),
            ));
        }

        let init = WeightInit::for_activation(&activation);
        let kernels = init.initialize(
            (out_channels, in_channels, kernel_size),
            in_channels * kernel_size,
            out_channels * kernel_size,
            rng,
        )?;

        Ok(Conv1DLayer {
            kernels,
            biases: Array1::zeros(out_channels),
            activation,
            stride,
            dilation,
        })
    }

    pub fn in_channels(&self) -> usize {
        self.kernels.shape()[1]
    }

    pub fn out_channels(&self) -> usize {
        self.kernels.shape()[0]
    }

    pub fn kernel_size(&self) -> usize {
        self.kernels.shape()[2]
    }

    /// Output length for a given input length, or `None` when the dilated
    /// kernel does not fit.
    pub fn output_length(&self, input_length: usize) -> Option<usize> {
        let span = self.dilation.checked_mul(self.kernel_size() - 1)?.checked_add(1)?;
        if input_length < span {
            return None;
        }
        Some((input_length - span) / self.stride + 1)
    }

    /// Forward pass for a batch of sequences
    pub fn forward_batch(&self, input: ArrayView3<f64>) -> Array3<f64> {
        let mut output = self.convolve(input);
        self.activation.apply(&mut output);
        output
    }

    /// Forward pass that also returns what the backward pass needs.
    pub fn forward_cached(&self, input: ArrayView3<f64>) -> (Array3<f64>, ConvCache) {
        let pre_activation = self.convolve(input);
        let mut output = pre_activation.clone();
        self.activation.apply(&mut output);
        (
            output,
            ConvCache {
                input: input.to_owned(),
                pre_activation,
            },
        )
    }

    /// Backward pass. `output_errors` has the shape of the forward output.
    pub fn backward_batch(
        &self,
        cache: &ConvCache,
        output_errors: ArrayView3<f64>,
    ) -> LayerGradients<Array3<f64>> {
        let delta = &output_errors * &self.activation.derivative(&cache.pre_activation);
        let (batch_size, out_channels, out_length) = delta.dim();
        let in_channels = self.in_channels();
        let kernel_size = self.kernel_size();

        let mut kernel_grads = Array3::zeros(self.kernels.dim());
        let mut input_errors = Array3::zeros(cache.input.dim());

        for b in 0..batch_size {
            for oc in 0..out_channels {
                for ol in 0..out_length {
                    let d = delta[[b, oc, ol]];
                    if d == 0.0 {
                        continue;
                    }
                    let start = ol * self.stride;
                    for ic in 0..in_channels {
                        for k in 0..kernel_size {
                            let pos = start + k * self.dilation;
                            kernel_grads[[oc, ic, k]] += d * cache.input[[b, ic, pos]];
                            input_errors[[b, ic, pos]] += d * self.kernels[[oc, ic, k]];
                        }
                    }
                }
            }
        }

        let bias_grads = Array1::from_shape_fn(out_channels, |oc| delta.slice(s![.., oc, ..]).sum());

        LayerGradients {
            input_errors,
            parameter_grads: vec![kernel_grads.into_dyn(), bias_grads.into_dyn()],
        }
    }

    fn convolve(&self, input: ArrayView3<f64>) -> Array3<f64> {
        let (batch_size, _, input_length) = input.dim();
        let out_channels = self.out_channels();
        let in_channels = self.in_channels();
        let kernel_size = self.kernel_size();
        let span = self.dilation * (kernel_size - 1) + 1;
        let out_length = if input_length >= span {
            (input_length - span) / self.stride + 1
        } else {
            0
        };

        let mut output = Array3::zeros((batch_size, out_channels, out_length));
        for b in 0..batch_size {
            for oc in 0..out_channels {
                for ol in 0..out_length {
                    let start = ol * self.stride;
                    let mut sum = self.biases[oc];
                    for ic in 0..in_channels {
                        for k in 0..kernel_size {
                            sum += input[[b, ic, start + k * self.dilation]] * self.kernels[[oc, ic, k]];
                        }
                    }
                    output[[b, oc, ol]] = sum;
                }
            }
        }
        output
    }

}

impl LayerTrait for Conv1DLayer {
    fn parameters(&self) -> Vec<ArrayViewD<'_, f64>> {
        vec![self.kernels.view().into_dyn(), self.biases.view().into_dyn()]
    }

    fn parameters_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>> {
        vec![
            self.kernels.view_mut().into_dyn(),
            self.biases.view_mut().into_dyn(),
        ]
    }

    fn output_size(&self) -> usize {
        self.out_channels()
    }

    fn input_size(&self) -> usize {
        self.in_channels()
    }
}
