use ndarray::{arr2, Array2, Array3};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::activations::Activation;
use crate::layers::{Conv1DLayer, DenseLayer, DropoutLayer, LayerTrait, WeightInit};

#[test]
fn test_layer_creation() {
    let mut rng = StdRng::seed_from_u64(0);
    let layer = DenseLayer::new(3, 2, Activation::Relu, &mut rng).unwrap();

    assert_eq!(layer.weights.shape(), [3, 2]);
    assert_eq!(layer.biases.shape(), [2]);
    assert_eq!(layer.num_parameters(), 8);
}

#[test]
fn test_dense_layer_forward() {
    let mut rng = StdRng::seed_from_u64(0);
    let layer = DenseLayer::new(3, 2, Activation::Relu, &mut rng).unwrap();
    let input = arr2(&[[1.0, 2.0, 3.0], [0.0, 0.0, 0.0]]);
    let output = layer.forward_batch(input.view());
    assert_eq!(output.shape(), [2, 2]);
    assert!(output.iter().all(|&v| v >= 0.0));
}

#[test]
fn test_weight_initialization() {
    let mut rng = StdRng::seed_from_u64(3);
    let layer =
        DenseLayer::with_init(10, 20, Activation::Relu, WeightInit::XavierNormal, &mut rng).unwrap();
    let var: f64 = layer.weights.iter().map(|&x| x * x).sum::<f64>() / (10.0 * 20.0);
    assert!((var - 2.0 / 30.0).abs() < 0.05);

    let layer = DenseLayer::with_init(10, 20, Activation::Relu, WeightInit::HeNormal, &mut rng).unwrap();
    let var: f64 = layer.weights.iter().map(|&x| x * x).sum::<f64>() / (10.0 * 20.0);
    let expected_var = 2.0 / 10.0;
    assert!((var - expected_var).abs() < 0.1);
}

#[test]
fn test_conv_layer_shapes() {
    let mut rng = StdRng::seed_from_u64(1);
    let conv = Conv1DLayer::new(2, 4, 3, 2, 1, Activation::Relu, &mut rng).unwrap();
    assert_eq!(conv.output_length(9), Some(4));
    assert_eq!(conv.output_length(2), None);

    let input = Array3::from_elem((3, 2, 9), 0.5);
    let output = conv.forward_batch(input.view());
    assert_eq!(output.dim(), (3, 4, 4));
    assert_eq!(conv.parameters().len(), 2);
}

#[test]
fn test_conv_rejects_zero_stride() {
    let mut rng = StdRng::seed_from_u64(1);
    assert!(Conv1DLayer::new(1, 1, 3, 0, 1, Activation::Relu, &mut rng).is_err());
}

#[test]
fn test_dropout_layer() {
    let layer = DropoutLayer::new(0.5).unwrap();
    let mut rng = StdRng::seed_from_u64(8);
    let input = Array2::ones((1, 100));
    let (output, mask) = layer.forward_train(input.view(), &mut rng);

    let zero_count = output.iter().filter(|&&x| x == 0.0).count();
    assert!(zero_count > 30 && zero_count < 70);
    for &val in output.iter() {
        assert!(val == 0.0 || (val - 2.0).abs() < 1e-12);
    }

    let grads = layer.backward(Array2::ones((1, 100)).view(), &mask);
    assert_eq!(grads, mask);
}

#[test]
fn test_inactive_dropout_is_identity() {
    let layer = DropoutLayer::new(0.0).unwrap();
    let mut rng = StdRng::seed_from_u64(8);
    let input = arr2(&[[1.0, -2.0, 3.0]]);
    let (output, _) = layer.forward_train(input.view(), &mut rng);
    assert_eq!(output, input);
}

#[test]
fn test_parameters_mut_writes_through() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut layer = DenseLayer::new(2, 2, Activation::Linear, &mut rng).unwrap();
    for mut p in layer.parameters_mut() {
        p.fill(0.25);
    }
    assert!(layer.weights.iter().all(|&w| w == 0.25));
    assert!(layer.biases.iter().all(|&b| b == 0.25));
}
