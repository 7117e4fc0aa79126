// Test modules for all components
pub mod test_activations;
pub mod test_edge_cases;
pub mod test_layers;
pub mod test_network;

use serde_json::{json, Value};

/// Minimal valid `agent_args` with a fixed seed
pub(crate) fn agent_args() -> Value {
    json!({
        "batch_size": 2,
        "gamma": 0.99,
        "epsilon_start": 1.0,
        "epsilon_min": 0.05,
        "epsilon_decay_steps": 100,
        "decay_mode": "linear",
        "replay_capacity": 10,
        "target_update_interval": 5,
        "learning_rate": 0.01,
        "num_actions": 4,
        "seed": 42
    })
}

pub(crate) fn mlp_args() -> Value {
    json!({"state_shape": [3], "hidden_sizes": [16, 16]})
}
