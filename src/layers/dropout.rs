use ndarray::{Array2, ArrayView2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RlPackError};

/// Inverted dropout.
///
/// Randomly zeroes units with probability `dropout_rate` during training and
/// rescales survivors by `1 / (1 - dropout_rate)`, so evaluation is the
/// identity and needs no rescaling.
#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
pub struct DropoutLayer {
    pub dropout_rate: f64,
}

impl DropoutLayer {
    pub fn new(dropout_rate: f64) -> Result<Self> {
        if !(0.0..1.0).contains(&dropout_rate) {
            return Err(RlPackError::configuration(
                "dropout".to_string(),
                format!("Dropout rate must be in [0, 1), got {}", dropout_rate),
            ));
        }
        Ok(DropoutLayer { dropout_rate })
    }

    pub fn is_active(&self) -> bool {
        self.dropout_rate > 0.0
    }

    /// Training-mode forward pass; returns the output and the mask to use in
    /// the backward pass.
    pub fn forward_train<R: Rng + ?Sized>(
        &self,
        inputs: ArrayView2<f64>,
        rng: &mut R,
    ) -> (Array2<f64>, Array2<f64>) {
        if !self.is_active() {
            return (inputs.to_owned(), Array2::ones(inputs.dim()));
        }
        let scale = 1.0 / (1.0 - self.dropout_rate);
        let rate = self.dropout_rate;
        let mask = Array2::from_shape_simple_fn(inputs.dim(), || {
            if rng.gen::<f64>() >= rate {
                scale
            } else {
                0.0
            }
        });
        (&inputs * &mask, mask)
    }

    /// Backward pass through a mask produced by [`DropoutLayer::forward_train`]
    pub fn backward(&self, output_errors: ArrayView2<f64>, mask: &Array2<f64>) -> Array2<f64> {
        &output_errors * mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_rate_bounds() {
        assert!(DropoutLayer::new(0.0).is_ok());
        assert!(DropoutLayer::new(0.5).is_ok());
        assert!(DropoutLayer::new(1.0).is_err());
        assert!(DropoutLayer::new(-0.1).is_err());
    }

    #[test]
    fn test_zero_rate_is_identity() {
        let mut rng = StdRng::seed_from_u64(0);
        let layer = DropoutLayer::new(0.0).unwrap();
        let x = Array2::from_elem((3, 4), 2.0);
        let (out, mask) = layer.forward_train(x.view(), &mut rng);
        assert_eq!(out, x);
        assert!(mask.iter().all(|&m| m == 1.0));
    }

    #[test]
    fn test_mask_values_are_scaled_or_zero() {
        let mut rng = StdRng::seed_from_u64(11);
        let layer = DropoutLayer::new(0.5).unwrap();
        let x = Array2::ones((16, 16));
        let (out, mask) = layer.forward_train(x.view(), &mut rng);
        assert!(mask.iter().all(|&m| m == 0.0 || (m - 2.0).abs() < 1e-12));
        assert_eq!(out, mask);
        assert!(mask.iter().any(|&m| m == 0.0));
        assert!(mask.iter().any(|&m| m > 0.0));
    }
}
