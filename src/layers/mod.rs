pub mod conv;
pub mod dense;
pub mod dropout;
pub mod initialization;
pub mod traits;

pub use conv::{Conv1DLayer, ConvCache};
pub use dense::{DenseCache, DenseLayer};
pub use dropout::DropoutLayer;
pub use initialization::WeightInit;
pub use traits::{Layer as LayerTrait, LayerGradients};
