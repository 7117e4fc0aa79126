//! Q-value function approximators.
//!
//! Every architecture implements [`QNetwork`]: a pure batched forward pass
//! and a single gradient step on the taken actions' Q-values. The concrete
//! type is picked at runtime from `model_name` by [`build_network`].

pub mod dqn1d;
pub mod mlp;
pub mod trainer;

use ndarray::{Array1, Array2, ArrayD, ArrayView1, ArrayView2, ArrayViewD, ArrayViewMutD, Axis, ShapeError};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::{Result, RlPackError};
use crate::tensor::StateShape;

pub use dqn1d::Dqn1d;
pub use mlp::Mlp;
pub use trainer::Trainer;

/// Owned copy of every trainable tensor, in network order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkParameters {
    pub tensors: Vec<ArrayD<f64>>,
}

impl NetworkParameters {
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Total number of scalars
    pub fn num_elements(&self) -> usize {
        self.tensors.iter().map(|t| t.len()).sum()
    }
}

/// A parametrised mapping from states to one Q-value per action.
pub trait QNetwork: Send {
    /// Q-values for a batch of flattened states `[batch, features]`.
    ///
    /// Never changes parameters; stochastic layers are inactive.
    fn forward(&self, states: ArrayView2<f64>) -> Result<Array2<f64>>;

    /// One gradient step moving `Q(states[i], actions[i])` towards
    /// `targets[i]`. Returns the loss before the step.
    ///
    /// Fails with `NumericalInstability` on non-finite targets, loss or
    /// gradients, in which case no parameter is modified.
    fn update(
        &mut self,
        states: ArrayView2<f64>,
        targets: ArrayView1<f64>,
        actions: &[usize],
        learning_rate: f64,
    ) -> Result<f64>;

    fn parameters(&self) -> NetworkParameters;

    /// Overwrite all parameters; fails with `Configuration` when the layout
    /// differs from this network's.
    fn set_parameters(&mut self, parameters: &NetworkParameters) -> Result<()>;

    fn num_actions(&self) -> usize;

    fn state_shape(&self) -> &StateShape;

    fn model_name(&self) -> &'static str;

    /// Copy every parameter of `self` into `other`
    fn clone_parameters_into(&self, other: &mut dyn QNetwork) -> Result<()> {
        other.set_parameters(&self.parameters())
    }

    /// Q-values for a single flattened state
    fn forward_single(&self, state: ArrayView1<f64>) -> Result<Array1<f64>> {
        let q_values = self.forward(state.insert_axis(Axis(0)))?;
        Ok(q_values.row(0).to_owned())
    }
}

/// Build the architecture described by `config` with freshly initialised
/// weights.
pub fn build_network<R: Rng + ?Sized>(
    config: &ModelConfig,
    num_actions: usize,
    trainer: Trainer,
    rng: &mut R,
) -> Result<Box<dyn QNetwork>> {
    config.check_num_actions(num_actions)?;
    match config {
        ModelConfig::Mlp(cfg) => Ok(Box::new(Mlp::new(cfg, num_actions, trainer, rng)?)),
        ModelConfig::Dqn1d(cfg) => Ok(Box::new(Dqn1d::new(cfg, num_actions, trainer, rng)?)),
    }
}

pub(crate) fn snapshot<'a, I>(views: I) -> NetworkParameters
where
    I: IntoIterator<Item = ArrayViewD<'a, f64>>,
{
    NetworkParameters {
        tensors: views.into_iter().map(|v| v.to_owned()).collect(),
    }
}

/// Assign `parameters` to `views`, checking the whole layout first so a
/// mismatch leaves every tensor untouched.
pub(crate) fn assign_parameters(
    views: Vec<ArrayViewMutD<'_, f64>>,
    parameters: &NetworkParameters,
) -> Result<()> {
    if views.len() != parameters.len() {
        return Err(RlPackError::configuration(
            "parameters".to_string(),
            format!(
                "expected {} tensors, got {}",
                views.len(),
                parameters.len()
            ),
        ));
    }
    for (idx, (view, tensor)) in views.iter().zip(&parameters.tensors).enumerate() {
        if view.shape() != tensor.shape() {
            return Err(RlPackError::configuration(
                "parameters".to_string(),
                format!(
                    "tensor {} has shape {:?}, expected {:?}",
                    idx,
                    tensor.shape(),
                    view.shape()
                ),
            ));
        }
    }
    for (mut view, tensor) in views.into_iter().zip(&parameters.tensors) {
        view.assign(tensor);
    }
    Ok(())
}

pub(crate) fn check_batch_width(states: &ArrayView2<f64>, shape: &StateShape) -> Result<()> {
    if states.ncols() != shape.num_elements() {
        return Err(RlPackError::shape_mismatch(
            format!("{} features per state {}", shape.num_elements(), shape),
            format!("{} features", states.ncols()),
        ));
    }
    Ok(())
}

pub(crate) fn reshape_error(err: ShapeError) -> RlPackError {
    RlPackError::shape_mismatch("a reshapable buffer".to_string(), err.to_string())
}
