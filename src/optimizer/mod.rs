pub mod gradient_clipper;

use ndarray::{ArrayD, ArrayViewMutD, IxDyn, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RlPackError};

pub use gradient_clipper::GradientClipper;

/// Gradient-descent update rule applied tensor by tensor.
///
/// `index` identifies the parameter tensor within the network (its position
/// in the network's parameter list), so stateful optimizers keep one set of
/// moments per tensor.
pub trait Optimizer {
    /// Called once per gradient step, before any tensor is updated
    fn begin_step(&mut self) {}

    fn update(
        &mut self,
        index: usize,
        param: ArrayViewMutD<f64>,
        gradient: &ArrayD<f64>,
        learning_rate: f64,
    );
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum OptimizerWrapper {
    SGD(SGD),
    Adam(Adam),
    RMSProp(RMSProp),
}

impl OptimizerWrapper {
    /// Build an optimizer from the name used in `agent_args`
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sgd" => Ok(OptimizerWrapper::SGD(SGD::new())),
            "adam" => Ok(OptimizerWrapper::Adam(Adam::default())),
            "rmsprop" => Ok(OptimizerWrapper::RMSProp(RMSProp::default())),
            other => Err(RlPackError::configuration(
                "optimizer".to_string(),
                format!("Unknown optimizer '{}'", other),
            )),
        }
    }
}

impl Optimizer for OptimizerWrapper {
    fn begin_step(&mut self) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.begin_step(),
            OptimizerWrapper::Adam(optimizer) => optimizer.begin_step(),
            OptimizerWrapper::RMSProp(optimizer) => optimizer.begin_step(),
        }
    }

    fn update(
        &mut self,
        index: usize,
        param: ArrayViewMutD<f64>,
        gradient: &ArrayD<f64>,
        learning_rate: f64,
    ) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.update(index, param, gradient, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.update(index, param, gradient, learning_rate),
            OptimizerWrapper::RMSProp(optimizer) => {
                optimizer.update(index, param, gradient, learning_rate)
            }
        }
    }
}

/// Per-tensor state slot, (re)allocated when the tensor shape is new.
fn state_slot<'a>(states: &'a mut Vec<ArrayD<f64>>, index: usize, shape: &[usize]) -> &'a mut ArrayD<f64> {
    if states.len() <= index {
        states.resize_with(index + 1, || ArrayD::zeros(IxDyn(&[0])));
    }
    if states[index].shape() != shape {
        states[index] = ArrayD::zeros(IxDyn(shape));
    }
    &mut states[index]
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SGD;

impl SGD {
    pub fn new() -> SGD {
        SGD
    }
}

impl Optimizer for SGD {
    fn update(
        &mut self,
        _index: usize,
        mut param: ArrayViewMutD<f64>,
        gradient: &ArrayD<f64>,
        learning_rate: f64,
    ) {
        param.zip_mut_with(gradient, |w, &g| *w -= learning_rate * g);
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Adam {
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    m: Vec<ArrayD<f64>>,
    v: Vec<ArrayD<f64>>,
    pub t: u64,
}

impl Adam {
    pub fn new(beta1: f64, beta2: f64, epsilon: f64) -> Self {
        Adam {
            beta1,
            beta2,
            epsilon,
            m: Vec::new(),
            v: Vec::new(),
            t: 0,
        }
    }
}

impl Default for Adam {
    fn default() -> Self {
        Self::new(0.9, 0.999, 1e-8)
    }
}

impl Optimizer for Adam {
    fn begin_step(&mut self) {
        self.t += 1;
    }

    fn update(
        &mut self,
        index: usize,
        param: ArrayViewMutD<f64>,
        gradient: &ArrayD<f64>,
        learning_rate: f64,
    ) {
        let (beta1, beta2, eps) = (self.beta1, self.beta2, self.epsilon);
        let t = self.t.max(1) as i32;
        let bias1 = 1.0 - beta1.powi(t);
        let bias2 = 1.0 - beta2.powi(t);

        let m = state_slot(&mut self.m, index, gradient.shape());
        let v = state_slot(&mut self.v, index, gradient.shape());

        Zip::from(param)
            .and(m)
            .and(v)
            .and(gradient)
            .for_each(|w, m, v, &g| {
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;
                let m_hat = *m / bias1;
                let v_hat = *v / bias2;
                *w -= learning_rate * m_hat / (v_hat.sqrt() + eps);
            });
    }
}

/// RMSProp optimizer
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RMSProp {
    pub beta: f64,
    pub epsilon: f64,
    v: Vec<ArrayD<f64>>,
}

impl RMSProp {
    pub fn new(beta: f64, epsilon: f64) -> Self {
        RMSProp {
            beta,
            epsilon,
            v: Vec::new(),
        }
    }
}

impl Default for RMSProp {
    fn default() -> Self {
        Self::new(0.9, 1e-8)
    }
}

impl Optimizer for RMSProp {
    fn update(
        &mut self,
        index: usize,
        param: ArrayViewMutD<f64>,
        gradient: &ArrayD<f64>,
        learning_rate: f64,
    ) {
        let (beta, eps) = (self.beta, self.epsilon);
        let v = state_slot(&mut self.v, index, gradient.shape());

        Zip::from(param)
            .and(v)
            .and(gradient)
            .for_each(|w, v, &g| {
                *v = beta * *v + (1.0 - beta) * g * g;
                *w -= learning_rate * g / (v.sqrt() + eps);
            });
    }
}
