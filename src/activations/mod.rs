//! # Activation Functions Module
//!
//! Element-wise non-linearities used between network layers. Every variant
//! exposes its scalar value and derivative, and applies to arrays of any
//! dimensionality so dense and convolutional layers share one implementation.
//!
//! ## Available Activations
//!
//! - **ReLU**: `max(0, x)`, the default for hidden layers
//! - **Sigmoid**: `1 / (1 + e^(-x))`
//! - **Tanh**: hyperbolic tangent
//! - **Linear**: identity, used for the Q-value head
//! - **LeakyReLU** / **ELU**: ReLU variants with a non-zero negative slope
//!
//! ```rust
//! use rlpack::activations::Activation;
//! use ndarray::array;
//!
//! let relu = Activation::from_name("relu").unwrap();
//! let mut data = array![1.0, -0.5, 0.0, 2.0];
//! relu.apply(&mut data);
//! assert_eq!(data, array![1.0, 0.0, 0.0, 2.0]);
//! ```

pub mod functions;

pub use functions::Activation;
