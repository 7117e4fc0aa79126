use ndarray::{Array1, Array2, ArrayD, ArrayView1, ArrayViewMutD};

use crate::config::AgentConfig;
use crate::error::{Result, RlPackError};
use crate::loss::{Loss, LossKind};
use crate::optimizer::{Adam, GradientClipper, Optimizer, OptimizerWrapper};
use crate::tensor::all_finite;

/// Loss, gradient clipping and optimizer state owned by one network
#[derive(Clone, Debug)]
pub struct Trainer {
    pub optimizer: OptimizerWrapper,
    pub loss: LossKind,
    pub clippers: Vec<GradientClipper>,
}

impl Trainer {
    pub fn new(optimizer: OptimizerWrapper, loss: LossKind, clippers: Vec<GradientClipper>) -> Self {
        Trainer {
            optimizer,
            loss,
            clippers,
        }
    }

    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        Ok(Trainer::new(
            OptimizerWrapper::from_name(&config.optimizer)?,
            config.loss_kind()?,
            config.gradient_clippers(),
        ))
    }

    /// Loss of the taken actions' Q-values and the error matrix to
    /// backpropagate.
    ///
    /// The error matrix has the shape of `q_values` and is zero everywhere
    /// except at each row's taken action.
    pub fn output_errors(
        &self,
        q_values: &Array2<f64>,
        targets: ArrayView1<f64>,
        actions: &[usize],
    ) -> Result<(f64, Array2<f64>)> {
        let (batch_size, num_actions) = q_values.dim();
        if targets.len() != batch_size || actions.len() != batch_size {
            return Err(RlPackError::shape_mismatch(
                format!("{} targets and actions", batch_size),
                format!("{} targets, {} actions", targets.len(), actions.len()),
            ));
        }
        if let Some(&action) = actions.iter().find(|&&a| a >= num_actions) {
            return Err(RlPackError::invalid_transition(format!(
                "action {} out of range for {} actions",
                action, num_actions
            )));
        }
        if !all_finite(targets.iter()) {
            return Err(RlPackError::numerical("non-finite TD target"));
        }

        let predictions = Array1::from_shape_fn(batch_size, |i| q_values[[i, actions[i]]]);
        let loss = self.loss.compute(predictions.view(), targets);
        if !loss.is_finite() {
            return Err(RlPackError::numerical(format!("loss is {}", loss)));
        }

        let grad = self.loss.gradient(predictions.view(), targets);
        let mut errors = Array2::zeros((batch_size, num_actions));
        for (i, (&action, &g)) in actions.iter().zip(grad.iter()).enumerate() {
            errors[[i, action]] = g;
        }
        Ok((loss, errors))
    }

    /// Clip `gradients` and apply one optimizer step to `parameters`.
    ///
    /// Gradients are checked before anything is written. If the step itself
    /// produces a non-finite parameter, every tensor and the optimizer state
    /// are restored and `NumericalInstability` is returned.
    pub fn apply(
        &mut self,
        mut parameters: Vec<ArrayViewMutD<'_, f64>>,
        mut gradients: Vec<ArrayD<f64>>,
        learning_rate: f64,
    ) -> Result<()> {
        if let Some(idx) = gradients.iter().position(|g| !all_finite(g.iter())) {
            return Err(RlPackError::numerical(format!(
                "non-finite gradient in parameter tensor {}",
                idx
            )));
        }
        for clipper in &self.clippers {
            clipper.clip(&mut gradients);
        }

        let saved_parameters: Vec<ArrayD<f64>> = parameters.iter().map(|p| p.to_owned()).collect();
        let saved_optimizer = self.optimizer.clone();

        self.optimizer.begin_step();
        for (idx, (param, grad)) in parameters.iter_mut().zip(&gradients).enumerate() {
            self.optimizer.update(idx, param.view_mut(), grad, learning_rate);
        }

        if let Some(idx) = parameters.iter().position(|p| !all_finite(p.iter())) {
            for (param, saved) in parameters.iter_mut().zip(&saved_parameters) {
                param.assign(saved);
            }
            self.optimizer = saved_optimizer;
            return Err(RlPackError::numerical(format!(
                "optimizer step overflowed parameter tensor {}",
                idx
            )));
        }
        Ok(())
    }
}

impl Default for Trainer {
    fn default() -> Self {
        Trainer::new(OptimizerWrapper::Adam(Adam::default()), LossKind::Mse, Vec::new())
    }
}
