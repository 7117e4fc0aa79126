//! # DQN Agent
//!
//! [`DqnAgent`] owns every piece of learner state: the replay buffer, the
//! online network, the [`TargetNetwork`], the exploration schedule, the RNG
//! and the step counter. It is built once from
//! `(model_name, model_args, agent_args)` and then driven by two calls per
//! environment step:
//!
//! - `policy(state)` evaluates the online network and applies epsilon-greedy
//!   exploration.
//! - `train(transition)` validates and stores the transition, runs a
//!   gradient step once a batch can be sampled, keeps the target network on
//!   its sync schedule and returns the next action.
//!
//! The agent is single-threaded and synchronous; wrap it in a mutex to share
//! it between threads.

mod dqn;
pub mod target;

pub use dqn::DqnAgent;
pub use target::TargetNetwork;
