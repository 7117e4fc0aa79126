use ndarray::{array, Array1, Array2, Ix2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

use crate::config::{ModelConfig, MlpConfig};
use crate::error::RlPackError;
use crate::loss::LossKind;
use crate::network::{build_network, Mlp, NetworkParameters, QNetwork, Trainer};
use crate::optimizer::{OptimizerWrapper, SGD};

fn sgd_trainer() -> Trainer {
    Trainer::new(OptimizerWrapper::SGD(SGD::new()), LossKind::Mse, Vec::new())
}

fn mlp(hidden: Vec<usize>, num_actions: usize, seed: u64) -> Mlp {
    let config = MlpConfig {
        state_shape: vec![3],
        hidden_sizes: hidden,
        activation: "tanh".to_string(),
        num_actions: None,
    };
    let mut rng = StdRng::seed_from_u64(seed);
    Mlp::new(&config, num_actions, sgd_trainer(), &mut rng).unwrap()
}

fn dqn1d_config(dropout: f64) -> ModelConfig {
    ModelConfig::from_args(
        "dqn1d",
        &json!({
            "sequence_length": 6,
            "channels": [1, 3],
            "kernel_sizes": [2],
            "strides_sizes": [1],
            "dilation_sizes": [2],
            "activation": "tanh",
            "dropout": dropout
        }),
    )
    .unwrap()
}

#[test]
fn test_neural_network_creation() {
    let net = mlp(vec![8, 4], 2, 0);
    assert_eq!(net.num_actions(), 2);
    assert_eq!(net.state_shape().dims(), &[3]);
    assert_eq!(net.model_name(), "mlp");
    assert_eq!(net.parameters().num_elements(), 3 * 8 + 8 + 8 * 4 + 4 + 4 * 2 + 2);
}

#[test]
fn test_forward_batch_is_pure() {
    let net = mlp(vec![8], 2, 1);
    let before = net.parameters();
    let states = array![[0.1, 0.2, 0.3], [-0.5, 0.0, 1.0]];
    let q1 = net.forward(states.view()).unwrap();
    let q2 = net.forward(states.view()).unwrap();
    assert_eq!(q1.dim(), (2, 2));
    assert_eq!(q1, q2);
    assert_eq!(net.parameters(), before);
}

#[test]
fn test_forward_single_matches_batch() {
    let net = mlp(vec![8], 3, 2);
    let states = array![[0.1, 0.2, 0.3], [-0.5, 0.0, 1.0]];
    let batch = net.forward(states.view()).unwrap();
    let single = net.forward_single(states.row(1)).unwrap();
    assert_eq!(single, batch.row(1).to_owned());
}

#[test]
fn test_update_reduces_loss() {
    let mut net = mlp(vec![16], 2, 3);
    let states = array![[0.1, 0.2, 0.3], [-0.5, 0.0, 1.0], [0.9, -0.9, 0.0]];
    let targets = array![1.0, -1.0, 0.5];
    let actions = [0, 1, 1];

    let first = net.update(states.view(), targets.view(), &actions, 0.1).unwrap();
    let mut last = first;
    for _ in 0..1000 {
        last = net.update(states.view(), targets.view(), &actions, 0.1).unwrap();
    }
    assert!(last < first * 0.5, "loss went from {} to {}", first, last);
}

#[test]
fn test_gradient_only_through_taken_action() {
    let mut net = mlp(Vec::new(), 3, 4);
    let before = net.layers[0].weights.clone();
    let states = array![[1.0, 2.0, 3.0]];
    net.update(states.view(), array![10.0].view(), &[1], 0.01)
        .unwrap();

    let after = &net.layers[0].weights;
    assert_eq!(after.column(0), before.column(0));
    assert_eq!(after.column(2), before.column(2));
    assert_ne!(after.column(1), before.column(1));
}

#[test]
fn test_non_finite_target_rejected_without_change() {
    let mut net = mlp(vec![4], 2, 5);
    let before = net.parameters();
    let states = array![[0.1, 0.2, 0.3]];

    for target in [f64::NAN, f64::INFINITY, 1e300] {
        let err = net
            .update(states.view(), array![target].view(), &[0], 0.1)
            .unwrap_err();
        assert!(matches!(err, RlPackError::NumericalInstability(_)));
        assert_eq!(net.parameters(), before);
    }
}

#[test]
fn test_overflowing_gradient_rejected_with_finite_loss() {
    // Large inputs cancel in the forward pass, so the loss stays finite,
    // but the weight gradient input * error overflows.
    let mut net = mlp(Vec::new(), 1, 0);
    net.set_parameters(&NetworkParameters {
        tensors: vec![array![[1.0], [-1.0], [0.0]].into_dyn(), array![0.0].into_dyn()],
    })
    .unwrap();
    let before = net.parameters();
    let states = array![[1e300, 1e300, 0.0]];
    assert_eq!(net.forward(states.view()).unwrap()[[0, 0]], 0.0);

    let err = net
        .update(states.view(), array![1e10].view(), &[0], 0.1)
        .unwrap_err();
    match err {
        RlPackError::NumericalInstability(msg) => assert!(msg.contains("gradient"), "{}", msg),
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(net.parameters(), before);
}

#[test]
fn test_clone_parameters_into() {
    let source = mlp(vec![8], 2, 6);
    let mut copy = mlp(vec![8], 2, 7);
    assert_ne!(source.parameters(), copy.parameters());
    source.clone_parameters_into(&mut copy).unwrap();
    assert_eq!(source.parameters(), copy.parameters());

    let mut other_layout = mlp(vec![4], 2, 8);
    let before = other_layout.parameters();
    let err = source.clone_parameters_into(&mut other_layout).unwrap_err();
    assert!(matches!(err, RlPackError::Configuration { .. }));
    assert_eq!(other_layout.parameters(), before);
}

#[test]
fn test_build_network_by_name() {
    let mut rng = StdRng::seed_from_u64(0);
    let mlp_config = ModelConfig::from_args("mlp", &json!({"state_shape": [2, 2]})).unwrap();
    let net = build_network(&mlp_config, 3, Trainer::default(), &mut rng).unwrap();
    assert_eq!(net.model_name(), "mlp");
    assert_eq!(net.num_actions(), 3);

    let net = build_network(&dqn1d_config(0.0), 2, Trainer::default(), &mut rng).unwrap();
    assert_eq!(net.model_name(), "dqn1d");
    assert_eq!(net.state_shape().dims(), &[1, 6]);
}

#[test]
fn test_build_network_rejects_conflicting_num_actions() {
    let mut rng = StdRng::seed_from_u64(0);
    let config =
        ModelConfig::from_args("mlp", &json!({"state_shape": [2], "num_actions": 5})).unwrap();
    assert!(build_network(&config, 4, Trainer::default(), &mut rng).is_err());
}

#[test]
fn test_dqn1d_update_reduces_loss() {
    let mut rng = StdRng::seed_from_u64(9);
    let mut net = build_network(&dqn1d_config(0.0), 2, sgd_trainer(), &mut rng).unwrap();
    let states = Array2::from_shape_fn((4, 6), |(b, i)| ((b + 1) * (i + 1)) as f64 * 0.05);
    let targets = array![0.5, -0.5, 1.0, 0.0];
    let actions = [0, 1, 0, 1];

    let first = net.update(states.view(), targets.view(), &actions, 0.05).unwrap();
    let mut last = first;
    for _ in 0..300 {
        last = net.update(states.view(), targets.view(), &actions, 0.05).unwrap();
    }
    assert!(last < first, "loss went from {} to {}", first, last);
}

#[test]
fn test_dqn1d_gradient_matches_finite_difference() {
    let mut rng = StdRng::seed_from_u64(10);
    let net = build_network(&dqn1d_config(0.0), 2, sgd_trainer(), &mut rng).unwrap();
    let states = array![[0.3, -0.2, 0.5, 0.1, -0.4, 0.2]];
    let target = array![1.0];
    let lr = 1e-3;

    let loss_of = |n: &dyn QNetwork| {
        let q = n.forward(states.view()).unwrap();
        0.5 * (q[[0, 0]] - target[0]).powi(2)
    };

    // SGD step: theta' = theta - lr * grad, so grad = (theta - theta') / lr
    let base = net.parameters();
    let mut stepped = build_network(&dqn1d_config(0.0), 2, sgd_trainer(), &mut rng).unwrap();
    stepped.set_parameters(&base).unwrap();
    stepped.update(states.view(), target.view(), &[0], lr).unwrap();
    let after = stepped.parameters();

    // tensors: conv kernels, conv biases, head weights, head biases
    let head_before = base.tensors[2].view().into_dimensionality::<Ix2>().unwrap();
    let head_after = after.tensors[2].view().into_dimensionality::<Ix2>().unwrap();
    let h = 1e-6;
    for i in 0..head_before.nrows() {
        let analytic = (head_before[[i, 0]] - head_after[[i, 0]]) / lr;

        let mut plus = base.clone();
        let mut minus = base.clone();
        let mut p = plus.tensors[2].view_mut().into_dimensionality::<Ix2>().unwrap();
        p[[i, 0]] += h;
        let mut m = minus.tensors[2].view_mut().into_dimensionality::<Ix2>().unwrap();
        m[[i, 0]] -= h;

        let mut probe = build_network(&dqn1d_config(0.0), 2, sgd_trainer(), &mut rng).unwrap();
        probe.set_parameters(&plus).unwrap();
        let loss_plus = loss_of(probe.as_ref());
        probe.set_parameters(&minus).unwrap();
        let loss_minus = loss_of(probe.as_ref());
        let numeric = (loss_plus - loss_minus) / (2.0 * h);

        assert!(
            (analytic - numeric).abs() < 1e-5,
            "head weight {}: analytic {} vs numeric {}",
            i,
            analytic,
            numeric
        );
    }
}

#[test]
fn test_huber_trainer_bounds_gradient() {
    let config = MlpConfig {
        state_shape: vec![1],
        hidden_sizes: Vec::new(),
        activation: "relu".to_string(),
        num_actions: None,
    };
    let mut rng = StdRng::seed_from_u64(11);
    let trainer = Trainer::new(
        OptimizerWrapper::SGD(SGD::new()),
        LossKind::Huber { delta: 1.0 },
        Vec::new(),
    );
    let mut net = Mlp::new(&config, 1, trainer, &mut rng).unwrap();
    net.layers[0].weights.fill(0.0);
    net.layers[0].biases.fill(0.0);

    // |error| = 1000 > delta, so the bias gradient is clipped to -1
    net.update(array![[1.0]].view(), Array1::from_elem(1, 1000.0).view(), &[0], 0.1)
        .unwrap();
    assert!((net.layers[0].biases[0] - 0.1).abs() < 1e-12);
}
