use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD};

/// Trait giving networks uniform access to a layer's trainable tensors.
///
/// Tensors are always reported in the same order (weights or kernels first,
/// then biases) so gradient lists and optimizer state line up by index.
pub trait Layer {
    /// Read-only views of the trainable tensors
    fn parameters(&self) -> Vec<ArrayViewD<'_, f64>>;

    /// Mutable views of the trainable tensors
    fn parameters_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>>;

    /// Get the output size of the layer (features or channels)
    fn output_size(&self) -> usize;

    /// Get the input size of the layer (features or channels)
    fn input_size(&self) -> usize;

    /// Total number of trainable scalars
    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.len()).sum()
    }
}

/// Gradients produced by one layer's backward pass
pub struct LayerGradients<E> {
    /// Error to propagate into the previous layer
    pub input_errors: E,
    /// Parameter gradients, ordered like [`Layer::parameters`]
    pub parameter_grads: Vec<ArrayD<f64>>,
}
