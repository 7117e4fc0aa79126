use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

/// Trait defining the interface for TD regression losses.
///
/// Both methods work on one predicted value per batch row (the Q-value of
/// the taken action) against its Bellman target. Losses and gradients are
/// averaged over the batch.
pub trait Loss {
    /// Compute the mean loss for a batch of predictions and targets
    fn compute(&self, predictions: ArrayView1<f64>, targets: ArrayView1<f64>) -> f64;

    /// Compute the gradient of the mean loss with respect to the predictions
    fn gradient(&self, predictions: ArrayView1<f64>, targets: ArrayView1<f64>) -> Array1<f64>;
}

/// Mean Squared Error loss, `0.5 * mean((p - t)^2)`
#[derive(Clone, Copy, Debug, Default)]
pub struct MSE;

impl Loss for MSE {
    fn compute(&self, predictions: ArrayView1<f64>, targets: ArrayView1<f64>) -> f64 {
        let diff = &predictions - &targets;
        (&diff * &diff).sum() / (2.0 * predictions.len() as f64)
    }

    fn gradient(&self, predictions: ArrayView1<f64>, targets: ArrayView1<f64>) -> Array1<f64> {
        (&predictions - &targets) / predictions.len() as f64
    }
}

/// Huber loss (smooth L1)
#[derive(Clone, Copy, Debug)]
pub struct HuberLoss {
    pub delta: f64,
}

impl HuberLoss {
    pub fn new(delta: f64) -> Self {
        HuberLoss { delta }
    }
}

impl Loss for HuberLoss {
    fn compute(&self, predictions: ArrayView1<f64>, targets: ArrayView1<f64>) -> f64 {
        let diff = &predictions - &targets;
        diff.mapv(|x| {
            let abs_x = x.abs();
            if abs_x <= self.delta {
                0.5 * x * x
            } else {
                self.delta * abs_x - 0.5 * self.delta * self.delta
            }
        })
        .sum()
            / predictions.len() as f64
    }

    fn gradient(&self, predictions: ArrayView1<f64>, targets: ArrayView1<f64>) -> Array1<f64> {
        let diff = &predictions - &targets;
        let n = predictions.len() as f64;
        diff.mapv(|x| {
            if x.abs() <= self.delta {
                x / n
            } else {
                self.delta * x.signum() / n
            }
        })
    }
}

/// Loss selected through `agent_args`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum LossKind {
    #[default]
    Mse,
    Huber { delta: f64 },
}

impl Loss for LossKind {
    fn compute(&self, predictions: ArrayView1<f64>, targets: ArrayView1<f64>) -> f64 {
        match *self {
            LossKind::Mse => MSE.compute(predictions, targets),
            LossKind::Huber { delta } => HuberLoss::new(delta).compute(predictions, targets),
        }
    }

    fn gradient(&self, predictions: ArrayView1<f64>, targets: ArrayView1<f64>) -> Array1<f64> {
        match *self {
            LossKind::Mse => MSE.gradient(predictions, targets),
            LossKind::Huber { delta } => HuberLoss::new(delta).gradient(predictions, targets),
        }
    }
}
