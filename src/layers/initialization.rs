use ndarray::{Array, Dimension, ShapeBuilder};
use rand_distr::Normal;
use ndarray_rand::RandomExt;
use rand::Rng;

use crate::activations::Activation;
use crate::error::{Result, RlPackError};

/// Weight initialization strategies
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightInit {
    /// Xavier/Glorot normal initialization
    XavierNormal,

    /// He/Kaiming normal initialization (for ReLU)
    HeNormal,
}

impl WeightInit {
    /// Draw a tensor of the given shape.
    ///
    /// `fan_in` and `fan_out` count the connections feeding into and out of
    /// one unit; for convolutions they include the kernel width.
    pub fn initialize<Sh, D, R>(
        &self,
        shape: Sh,
        fan_in: usize,
        fan_out: usize,
        rng: &mut R,
    ) -> Result<Array<f64, D>>
    where
        Sh: ShapeBuilder<Dim = D>,
        D: Dimension,
        R: Rng + ?Sized,
    {
        let std = match *self {
            WeightInit::XavierNormal => (2.0 / (fan_in as f64 + fan_out as f64)).sqrt(),
            WeightInit::HeNormal => (2.0 / fan_in as f64).sqrt(),
        };
        let normal = Normal::new(0.0, std).map_err(|e| {
            RlPackError::configuration(
                "weight_init".to_string(),
                format!("fan_in {}, fan_out {}: {}", fan_in, fan_out, e),
            )
        })?;
        Ok(Array::random_using(shape, normal, rng))
    }

    /// Get the recommended initialization for an activation function
    pub fn for_activation(activation: &Activation) -> Self {
        match activation {
            Activation::Relu | Activation::LeakyRelu { .. } | Activation::Elu { .. } => {
                WeightInit::HeNormal
            }
            Activation::Sigmoid | Activation::Tanh | Activation::Linear => WeightInit::XavierNormal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_seeded_initialization_is_reproducible() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        let wa: Array2<f64> = WeightInit::HeNormal.initialize((4, 3), 4, 3, &mut a).unwrap();
        let wb: Array2<f64> = WeightInit::HeNormal.initialize((4, 3), 4, 3, &mut b).unwrap();
        assert_eq!(wa, wb);
    }

    #[test]
    fn test_xavier_normal_scale() {
        let mut rng = StdRng::seed_from_u64(1);
        let w: Array2<f64> = WeightInit::XavierNormal
            .initialize((50, 50), 50, 50, &mut rng)
            .unwrap();
        let var = w.iter().map(|&x| x * x).sum::<f64>() / w.len() as f64;
        assert!((var - 0.02).abs() < 0.005);
    }
}
