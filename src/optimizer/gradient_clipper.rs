use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

/// Gradient clipping methods
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum GradientClipper {
    /// Clip each gradient element into `[min, max]`
    ClipByValue { min: f64, max: f64 },

    /// Rescale each tensor whose L2 norm exceeds `max_norm`
    ClipByNorm { max_norm: f64 },

    /// Rescale all tensors together when their joint L2 norm exceeds `max_norm`
    ClipByGlobalNorm { max_norm: f64 },
}

impl GradientClipper {
    /// Clip a full set of parameter gradients in place
    pub fn clip(&self, gradients: &mut [ArrayD<f64>]) {
        match *self {
            GradientClipper::ClipByValue { min, max } => {
                for grad in gradients.iter_mut() {
                    grad.mapv_inplace(|g| g.max(min).min(max));
                }
            }

            GradientClipper::ClipByNorm { max_norm } => {
                for grad in gradients.iter_mut() {
                    let norm = grad.iter().map(|&g| g * g).sum::<f64>().sqrt();
                    if norm > max_norm {
                        let scale = max_norm / norm;
                        grad.mapv_inplace(|g| g * scale);
                    }
                }
            }

            GradientClipper::ClipByGlobalNorm { max_norm } => {
                let global_norm = Self::compute_global_norm(gradients);
                if global_norm > max_norm {
                    let scale = max_norm / global_norm;
                    for grad in gradients.iter_mut() {
                        grad.mapv_inplace(|g| g * scale);
                    }
                }
            }
        }
    }

    /// Compute the joint L2 norm of all gradients
    pub fn compute_global_norm(gradients: &[ArrayD<f64>]) -> f64 {
        gradients
            .iter()
            .map(|g| g.iter().map(|&x| x * x).sum::<f64>())
            .sum::<f64>()
            .sqrt()
    }
}
