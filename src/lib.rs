//! # RLPack - Deep Q-Network agent runtime
//!
//! RLPack is the learner side of a reinforcement-learning loop. A host
//! simulation calls the agent once per timestep: `policy` picks an action for
//! the observed state and `train` consumes the resulting transition
//! `(state, action, reward, next_state, done)` to improve the policy.
//!
//! ## Key Features
//!
//! - **DQN**: experience replay, online and target networks, epsilon-greedy
//!   exploration with linear or exponential decay, optional Double DQN
//! - **Architectures**: `"mlp"` (dense stack) and `"dqn1d"` (1D convolutions,
//!   dropout, linear head), chosen by name at construction
//! - **Optimizers**: Adam, SGD and RMSProp with per-tensor state
//! - **Stability**: MSE or Huber loss, gradient clipping, rejection of
//!   non-finite targets and gradients before any parameter changes
//! - **Checkpoints**: bincode snapshots of parameters and counters
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rlpack::agent::DqnAgent;
//! use serde_json::json;
//!
//! let mut agent = DqnAgent::new(
//!     "dqn1d",
//!     json!({
//!         "sequence_length": 16,
//!         "channels": [2, 8, 8],
//!         "kernel_sizes": [3, 3],
//!         "strides_sizes": [1, 1],
//!         "dilation_sizes": [1, 2],
//!         "activation": "relu",
//!         "dropout": 0.1
//!     }),
//!     json!({
//!         "batch_size": 32,
//!         "gamma": 0.99,
//!         "epsilon_start": 1.0,
//!         "epsilon_min": 0.01,
//!         "epsilon_decay_steps": 10000,
//!         "decay_mode": "exponential",
//!         "replay_capacity": 50000,
//!         "target_update_interval": 500,
//!         "learning_rate": 0.0005,
//!         "num_actions": 3
//!     }),
//! )?;
//!
//! let state = vec![0.0; 32];
//! let action = agent.policy(&state, &[2, 16])?;
//! # let _ = action;
//! # Ok::<(), rlpack::error::RlPackError>(())
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - Activation functions (ReLU, Sigmoid, Tanh, etc.)
//! - [`agent`] - The DQN agent and its target network
//! - [`checkpoint`] - On-disk agent snapshots
//! - [`config`] - Typed `model_args` / `agent_args`
//! - [`error`] - Error types and result handling
//! - [`exploration`] - Epsilon schedules and action selection
//! - [`layers`] - Dense, 1D convolution and dropout layers
//! - [`loss`] - TD regression losses
//! - [`network`] - Q-network architectures
//! - [`optimizer`] - Optimization algorithms and gradient clipping
//! - [`replay_buffer`] - Experience replay
//! - [`tensor`] - State shapes and flat-buffer reconstruction

pub mod activations;
pub mod agent;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod exploration;
pub mod layers;
pub mod loss;
pub mod network;
pub mod optimizer;
pub mod replay_buffer;
pub mod tensor;

#[cfg(test)]
mod tests;
