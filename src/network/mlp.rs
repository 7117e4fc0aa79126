use ndarray::{Array2, ArrayView1, ArrayView2};
use rand::Rng;

use super::{assign_parameters, check_batch_width, snapshot, NetworkParameters, QNetwork, Trainer};
use crate::activations::Activation;
use crate::config::MlpConfig;
use crate::error::Result;
use crate::layers::{DenseLayer, LayerTrait};
use crate::tensor::StateShape;

/// Fully connected Q-network: hidden dense layers followed by a linear head
/// with one output per action.
#[derive(Clone, Debug)]
pub struct Mlp {
    pub layers: Vec<DenseLayer>,
    state_shape: StateShape,
    trainer: Trainer,
}

impl Mlp {
    pub fn new<R: Rng + ?Sized>(
        config: &MlpConfig,
        num_actions: usize,
        trainer: Trainer,
        rng: &mut R,
    ) -> Result<Self> {
        let state_shape = StateShape::new(config.state_shape.clone())?;
        let activation = Activation::from_name(&config.activation)?;

        let mut sizes = vec![state_shape.num_elements()];
        sizes.extend(config.hidden_sizes.iter().copied());
        sizes.push(num_actions);

        let last = sizes.len() - 2;
        let layers = sizes
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                let act = if i == last { Activation::Linear } else { activation };
                DenseLayer::new(pair[0], pair[1], act, &mut *rng)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Mlp {
            layers,
            state_shape,
            trainer,
        })
    }
}

impl QNetwork for Mlp {
    fn forward(&self, states: ArrayView2<f64>) -> Result<Array2<f64>> {
        check_batch_width(&states, &self.state_shape)?;
        let mut outputs = states.to_owned();
        for layer in &self.layers {
            outputs = layer.forward_batch(outputs.view());
        }
        Ok(outputs)
    }

    fn update(
        &mut self,
        states: ArrayView2<f64>,
        targets: ArrayView1<f64>,
        actions: &[usize],
        learning_rate: f64,
    ) -> Result<f64> {
        check_batch_width(&states, &self.state_shape)?;

        let mut caches = Vec::with_capacity(self.layers.len());
        let mut outputs = states.to_owned();
        for layer in &self.layers {
            let (next, cache) = layer.forward_cached(outputs.view());
            caches.push(cache);
            outputs = next;
        }

        let (loss, mut errors) = self.trainer.output_errors(&outputs, targets, actions)?;

        let mut layer_grads = Vec::with_capacity(self.layers.len());
        for (layer, cache) in self.layers.iter().zip(&caches).rev() {
            let grads = layer.backward_batch(cache, errors.view());
            errors = grads.input_errors;
            layer_grads.push(grads.parameter_grads);
        }
        let gradients = layer_grads.into_iter().rev().flatten().collect();

        let parameters = self
            .layers
            .iter_mut()
            .flat_map(|layer| layer.parameters_mut())
            .collect();
        self.trainer.apply(parameters, gradients, learning_rate)?;
        Ok(loss)
    }

    fn parameters(&self) -> NetworkParameters {
        snapshot(self.layers.iter().flat_map(|layer| layer.parameters()))
    }

    fn set_parameters(&mut self, parameters: &NetworkParameters) -> Result<()> {
        let views = self
            .layers
            .iter_mut()
            .flat_map(|layer| layer.parameters_mut())
            .collect();
        assign_parameters(views, parameters)
    }

    fn num_actions(&self) -> usize {
        self.layers.last().map(|l| l.output_size()).unwrap_or(0)
    }

    fn state_shape(&self) -> &StateShape {
        &self.state_shape
    }

    fn model_name(&self) -> &'static str {
        "mlp"
    }
}
