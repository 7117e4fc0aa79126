use ndarray::{array, Array2};
use crate::activations::Activation;

#[test]
fn test_relu_activation() {
    let relu = Activation::Relu;
    let mut input = array![-1.0, 0.0, 1.0, 2.0];
    relu.apply(&mut input);
    assert_eq!(input, array![0.0, 0.0, 1.0, 2.0]);
}

#[test]
fn test_sigmoid_activation() {
    let sigmoid = Activation::Sigmoid;
    let mut input = array![0.0];
    sigmoid.apply(&mut input);
    assert!((input[0] - 0.5).abs() < 1e-12);
}

#[test]
fn test_tanh_activation() {
    let tanh = Activation::Tanh;
    let mut input = array![0.0];
    tanh.apply(&mut input);
    assert_eq!(input[0], 0.0);
}

#[test]
fn test_leaky_relu() {
    let leaky = Activation::LeakyRelu { alpha: 0.01 };
    let mut input = array![-1.0, 0.0, 1.0];
    leaky.apply(&mut input);
    assert_eq!(input, array![-0.01, 0.0, 1.0]);
}

#[test]
fn test_elu() {
    let elu = Activation::Elu { alpha: 1.0 };
    let mut input = array![-1.0, 0.0, 1.0];
    elu.apply(&mut input);
    assert!((input[0] - (-0.632)).abs() < 0.001);
    assert_eq!(input[1], 0.0);
    assert_eq!(input[2], 1.0);
}

#[test]
fn test_linear_is_identity_on_matrices() {
    let mut input = array![[-3.0, 2.5], [0.0, 1e9]];
    let expected = input.clone();
    Activation::Linear.apply(&mut input);
    assert_eq!(input, expected);
}

#[test]
fn test_activation_derivatives() {
    let relu = Activation::Relu;
    let pre = array![-1.0, 0.0, 1.0, 2.0];
    assert_eq!(relu.derivative(&pre), array![0.0, 0.0, 1.0, 1.0]);

    let leaky = Activation::LeakyRelu { alpha: 0.1 };
    let pre = array![-1.0, 0.0, 1.0];
    assert_eq!(leaky.derivative(&pre), array![0.1, 0.1, 1.0]);

    let sigmoid = Activation::Sigmoid;
    let d: Array2<f64> = sigmoid.derivative(&array![[0.0]]);
    assert!((d[[0, 0]] - 0.25).abs() < 1e-12);
}

#[test]
fn test_derivatives_match_finite_differences() {
    let h = 1e-6;
    for activation in [
        Activation::Sigmoid,
        Activation::Tanh,
        Activation::Elu { alpha: 0.7 },
        Activation::Linear,
    ] {
        for &x in &[-2.0, -0.3, 0.4, 1.7] {
            let numeric = (activation.value(x + h) - activation.value(x - h)) / (2.0 * h);
            assert!(
                (numeric - activation.gradient(x)).abs() < 1e-6,
                "{:?} at {}",
                activation,
                x
            );
        }
    }
}

#[test]
fn test_from_name() {
    assert_eq!(Activation::from_name("ReLU").unwrap(), Activation::Relu);
    assert_eq!(Activation::from_name("identity").unwrap(), Activation::Linear);
    assert!(Activation::from_name("gelu").is_err());
}
