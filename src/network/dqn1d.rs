use ndarray::{Array2, Array3, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{
    assign_parameters, check_batch_width, reshape_error, snapshot, NetworkParameters, QNetwork,
    Trainer,
};
use crate::activations::Activation;
use crate::config::{Dqn1dConfig, ModelConfig};
use crate::error::{Result, RlPackError};
use crate::layers::{Conv1DLayer, DenseLayer, DropoutLayer, LayerTrait};
use crate::tensor::StateShape;

/// Convolutional Q-network for sequence observations.
///
/// States have logical shape `[channels, sequence_length]`. Each block is a
/// 1D convolution with the configured activation; the last block's output is
/// flattened, passed through dropout (training only) and mapped to one
/// Q-value per action by a linear layer.
#[derive(Clone, Debug)]
pub struct Dqn1d {
    pub convs: Vec<Conv1DLayer>,
    pub dropout: DropoutLayer,
    pub head: DenseLayer,
    state_shape: StateShape,
    trainer: Trainer,
    dropout_rng: StdRng,
}

impl Dqn1d {
    pub fn new<R: Rng + ?Sized>(
        config: &Dqn1dConfig,
        num_actions: usize,
        trainer: Trainer,
        rng: &mut R,
    ) -> Result<Self> {
        ModelConfig::Dqn1d(config.clone()).validate()?;
        let in_channels = config.channels.first().copied().unwrap_or(0);
        let state_shape = StateShape::new(vec![in_channels, config.sequence_length])?;
        let activation = Activation::from_name(&config.activation)?;
        let lengths = config.interim_lengths()?;

        let mut convs = Vec::with_capacity(config.kernel_sizes.len());
        for (i, pair) in config.channels.windows(2).enumerate() {
            convs.push(Conv1DLayer::new(
                pair[0],
                pair[1],
                config.kernel_sizes[i],
                config.strides_sizes[i],
                config.dilation_sizes[i],
                activation,
                &mut *rng,
            )?);
        }

        let out_channels = config.channels.last().copied().unwrap_or(0);
        let out_length = lengths.last().copied().unwrap_or(0);
        let flat_size = match out_channels.checked_mul(out_length) {
            Some(size) if size > 0 => size,
            _ => {
                return Err(RlPackError::configuration(
                    "dqn1d".to_string(),
                    format!(
                        "convolution stack produces {} channels of length {} for {}",
                        out_channels, out_length, state_shape
                    ),
                ))
            }
        };

        let head = DenseLayer::new(flat_size, num_actions, Activation::Linear, &mut *rng)?;
        let dropout = DropoutLayer::new(config.dropout)?;

        Ok(Dqn1d {
            convs,
            dropout,
            head,
            state_shape,
            trainer,
            dropout_rng: StdRng::seed_from_u64(rng.gen()),
        })
    }

    fn to_sequences(&self, states: ArrayView2<f64>) -> Result<Array3<f64>> {
        let dims = self.state_shape.dims();
        Array3::from_shape_vec((states.nrows(), dims[0], dims[1]), states.iter().copied().collect())
            .map_err(reshape_error)
    }

    fn flatten(features: Array3<f64>) -> Result<Array2<f64>> {
        let (batch, channels, length) = features.dim();
        features
            .as_standard_layout()
            .into_owned()
            .into_shape((batch, channels * length))
            .map_err(reshape_error)
    }
}

impl QNetwork for Dqn1d {
    fn forward(&self, states: ArrayView2<f64>) -> Result<Array2<f64>> {
        check_batch_width(&states, &self.state_shape)?;
        let mut features = self.to_sequences(states)?;
        for conv in &self.convs {
            features = conv.forward_batch(features.view());
        }
        let flat = Self::flatten(features)?;
        Ok(self.head.forward_batch(flat.view()))
    }

    fn update(
        &mut self,
        states: ArrayView2<f64>,
        targets: ArrayView1<f64>,
        actions: &[usize],
        learning_rate: f64,
    ) -> Result<f64> {
        check_batch_width(&states, &self.state_shape)?;

        let mut caches = Vec::with_capacity(self.convs.len());
        let mut features = self.to_sequences(states)?;
        for conv in &self.convs {
            let (next, cache) = conv.forward_cached(features.view());
            caches.push(cache);
            features = next;
        }
        let conv_dim = features.dim();
        let flat = Self::flatten(features)?;
        let (dropped, mask) = self.dropout.forward_train(flat.view(), &mut self.dropout_rng);
        let (q_values, head_cache) = self.head.forward_cached(dropped.view());

        let (loss, errors) = self.trainer.output_errors(&q_values, targets, actions)?;

        let head_grads = self.head.backward_batch(&head_cache, errors.view());
        let flat_errors = self.dropout.backward(head_grads.input_errors.view(), &mask);
        let mut conv_errors = flat_errors.into_shape(conv_dim).map_err(reshape_error)?;

        let mut conv_grads = Vec::with_capacity(self.convs.len());
        for (conv, cache) in self.convs.iter().zip(&caches).rev() {
            let grads = conv.backward_batch(cache, conv_errors.view());
            conv_errors = grads.input_errors;
            conv_grads.push(grads.parameter_grads);
        }
        let gradients = conv_grads
            .into_iter()
            .rev()
            .flatten()
            .chain(head_grads.parameter_grads)
            .collect();

        let parameters = self
            .convs
            .iter_mut()
            .flat_map(|conv| conv.parameters_mut())
            .chain(self.head.parameters_mut())
            .collect();
        self.trainer.apply(parameters, gradients, learning_rate)?;
        Ok(loss)
    }

    fn parameters(&self) -> NetworkParameters {
        snapshot(
            self.convs
                .iter()
                .flat_map(|conv| conv.parameters())
                .chain(self.head.parameters()),
        )
    }

    fn set_parameters(&mut self, parameters: &NetworkParameters) -> Result<()> {
        let views = self
            .convs
            .iter_mut()
            .flat_map(|conv| conv.parameters_mut())
            .chain(self.head.parameters_mut())
            .collect();
        assign_parameters(views, parameters)
    }

    fn num_actions(&self) -> usize {
        self.head.output_size()
    }

    fn state_shape(&self) -> &StateShape {
        &self.state_shape
    }

    fn model_name(&self) -> &'static str {
        "dqn1d"
    }
}
