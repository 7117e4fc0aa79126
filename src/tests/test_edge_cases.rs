use ndarray::array;
use serde_json::json;

use super::{agent_args, mlp_args};
use crate::agent::DqnAgent;
use crate::exploration::greedy_action;
use crate::tensor::StateShape;

#[test]
fn test_single_slot_buffer() {
    let mut args = agent_args();
    args["replay_capacity"] = json!(1);
    args["batch_size"] = json!(1);
    let mut agent = DqnAgent::new("mlp", mlp_args(), args).unwrap();

    for i in 0..5 {
        let s = [i as f64, 0.0, 1.0];
        agent.train(&s, &s, 0.0, 0, true, &[3], &[3]).unwrap();
        assert_eq!(agent.buffer_len(), 1);
    }
    let last = agent.buffer().iter().next().map(|t| t.state[0]);
    assert_eq!(last, Some(4.0));
    assert_eq!(agent.update_count(), 5);
}

#[test]
fn test_undiscounted_episodic_task() {
    let mut args = agent_args();
    args["gamma"] = json!(1.0);
    let mut agent = DqnAgent::new("mlp", mlp_args(), args).unwrap();
    for i in 0..10 {
        let s = [0.0, 0.5, i as f64 * 0.01];
        assert!(agent.train(&s, &s, 0.0, 3, i == 9, &[3], &[3]).unwrap() < 4);
    }
}

#[test]
fn test_single_action_space() {
    let mut args = agent_args();
    args["num_actions"] = json!(1);
    let mut agent = DqnAgent::new("mlp", mlp_args(), args).unwrap();
    for _ in 0..5 {
        assert_eq!(agent.policy(&[0.1, 0.2, 0.3], &[3]).unwrap(), 0);
    }
    assert!(agent.train(&[0.0; 3], &[0.0; 3], 1.0, 1, false, &[3], &[3]).is_err());
}

#[test]
fn test_greedy_action_with_extreme_values() {
    assert_eq!(greedy_action(array![f64::NEG_INFINITY, -1e308].view()), 1);
    assert_eq!(greedy_action(array![f64::INFINITY, f64::INFINITY].view()), 0);
    assert_eq!(greedy_action(array![-0.0, 0.0].view()), 0);
}

#[test]
fn test_multi_dimensional_state_shape() {
    let shape = StateShape::new(vec![2, 3, 2]).unwrap();
    assert_eq!(shape.num_elements(), 12);
    let data: Vec<f64> = (0..12).map(|i| i as f64).collect();
    let state = shape.reconstruct(&data, &[1, 2, 3, 2]).unwrap();
    assert_eq!(state.len(), 12);
    assert!(shape.reconstruct(&data, &[2, 2, 3, 2]).is_err());
    assert!(shape.reconstruct(&data, &[3, 2, 2]).is_err());
}

#[test]
fn test_large_but_finite_states() {
    let mut agent = DqnAgent::new("mlp", mlp_args(), agent_args()).unwrap();
    let s = [1e6, -1e6, 0.0];
    assert!(agent.policy(&s, &[3]).unwrap() < 4);
    let q = agent.q_values(&s, &[3]).unwrap();
    assert_eq!(q.len(), 4);
    assert!(q.iter().all(|v| v.is_finite()));
}
