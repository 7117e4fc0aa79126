use log::{debug, info, trace, warn};
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use std::fmt;
use std::path::Path;

use super::target::TargetNetwork;
use crate::checkpoint::{Checkpoint, CHECKPOINT_VERSION};
use crate::config::{AgentConfig, ModelConfig};
use crate::error::{Result, RlPackError};
use crate::exploration::{greedy_action, EpsilonGreedy, EpsilonSchedule};
use crate::network::{build_network, NetworkParameters, QNetwork, Trainer};
use crate::replay_buffer::{ReplayBuffer, Transition};
use crate::tensor::{all_finite, stack_states, StateShape};

/// Deep Q-Network agent with experience replay and a target network.
///
/// The host loop calls [`DqnAgent::policy`] to act and [`DqnAgent::train`]
/// once per environment step with the observed transition. `train` stores
/// the transition, runs one gradient step once the replay buffer holds a
/// full batch, keeps the target network on its sync schedule and returns the
/// action to take in the next state.
///
/// # Example
///
/// ```rust
/// use rlpack::agent::DqnAgent;
/// use serde_json::json;
///
/// let mut agent = DqnAgent::new(
///     "mlp",
///     json!({"state_shape": [4], "hidden_sizes": [32, 32]}),
///     json!({
///         "batch_size": 2,
///         "gamma": 0.99,
///         "epsilon_start": 1.0,
///         "epsilon_min": 0.05,
///         "epsilon_decay_steps": 1000,
///         "decay_mode": "linear",
///         "replay_capacity": 1000,
///         "target_update_interval": 100,
///         "learning_rate": 0.001,
///         "num_actions": 2,
///         "seed": 7
///     }),
/// )
/// .unwrap();
///
/// let state = [0.1, -0.2, 0.3, -0.1];
/// let action = agent.policy(&state, &[4]).unwrap();
///
/// let next_state = [0.15, -0.25, 0.35, -0.05];
/// let next_action = agent
///     .train(&state, &next_state, 1.0, action, false, &[4], &[4])
///     .unwrap();
/// assert!(next_action < 2);
/// ```
pub struct DqnAgent {
    model_args: Value,
    agent_args: Value,
    config: AgentConfig,
    state_shape: StateShape,

    /// Network trained by gradient steps and used to act
    online: Box<dyn QNetwork>,

    /// Delayed copy used for bootstrap targets
    target: TargetNetwork,

    buffer: ReplayBuffer,
    exploration: EpsilonGreedy,
    rng: StdRng,

    /// Accepted `train` calls
    step_count: u64,

    /// Gradient steps applied to the online network
    update_count: u64,

    last_loss: Option<f64>,
}

impl DqnAgent {
    /// Build an agent from an architecture name and its argument maps.
    ///
    /// Every argument is validated here; on failure no agent is created.
    pub fn new(model_name: &str, model_args: Value, agent_args: Value) -> Result<Self> {
        let config = AgentConfig::from_args(&agent_args)?;
        let model_config = ModelConfig::from_args(model_name, &model_args)?;
        model_config.check_num_actions(config.num_actions)?;
        let state_shape = model_config.state_shape()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let online = build_network(
            &model_config,
            config.num_actions,
            Trainer::from_config(&config)?,
            &mut rng,
        )?;
        let target_network = build_network(
            &model_config,
            config.num_actions,
            Trainer::from_config(&config)?,
            &mut rng,
        )?;
        let target = TargetNetwork::new(target_network, online.as_ref())?;

        info!(
            "Created DQN agent: model={}, state_shape={}, actions={}, parameters={}",
            online.model_name(),
            state_shape,
            config.num_actions,
            online.parameters().num_elements()
        );

        Ok(DqnAgent {
            model_args,
            agent_args,
            buffer: ReplayBuffer::new(config.replay_capacity),
            exploration: EpsilonGreedy::new(EpsilonSchedule::from_config(&config)),
            config,
            state_shape,
            online,
            target,
            rng,
            step_count: 0,
            update_count: 0,
            last_loss: None,
        })
    }

    /// Select an action for `state_current` with the current epsilon.
    ///
    /// Fails with `ShapeMismatch` when the buffer or its shape metadata
    /// disagrees with the configured state shape. Never touches the replay
    /// buffer, the parameters or the step counter.
    pub fn policy(&mut self, state_current: &[f64], state_current_shape: &[usize]) -> Result<usize> {
        let state = self
            .state_shape
            .reconstruct(state_current, state_current_shape)?;
        self.select_action(state.view())
    }

    /// Greedy Q-values of the online network for one state
    pub fn q_values(&self, state: &[f64], shape: &[usize]) -> Result<Array1<f64>> {
        let state = self.state_shape.reconstruct(state, shape)?;
        self.online.forward_single(state.view())
    }

    /// Consume one transition and return the action for `state_next`.
    ///
    /// Invalid input fails with `InvalidTransition` before anything is
    /// stored.
    #[allow(clippy::too_many_arguments)]
    pub fn train(
        &mut self,
        state_current: &[f64],
        state_next: &[f64],
        reward: f64,
        action: usize,
        done: bool,
        state_current_shape: &[usize],
        state_next_shape: &[usize],
    ) -> Result<usize> {
        let state = self
            .state_shape
            .reconstruct(state_current, state_current_shape)
            .map_err(|e| RlPackError::invalid_transition(format!("state_current: {}", e)))?;
        let next_state = self
            .state_shape
            .reconstruct(state_next, state_next_shape)
            .map_err(|e| RlPackError::invalid_transition(format!("state_next: {}", e)))?;

        self.train_transition(Transition {
            state,
            action,
            reward,
            next_state,
            done,
        })
    }

    /// [`DqnAgent::train`] for an already assembled transition
    pub fn train_transition(&mut self, transition: Transition) -> Result<usize> {
        self.check_transition(&transition)?;
        let next_state = transition.next_state.clone();
        self.buffer.insert(transition);

        let step = self.step_count + 1;
        if step % self.config.policy_update_interval == 0 {
            match self.learn() {
                Ok(loss) => {
                    self.update_count += 1;
                    self.last_loss = Some(loss);
                    trace!("step {}: loss {:.6}", step, loss);
                }
                Err(e) if e.is_insufficient_data() => {
                    debug!("step {}: skipping update ({})", step, e);
                }
                Err(e) => {
                    if let RlPackError::NumericalInstability(_) = e {
                        warn!("step {}: update rejected: {}", step, e);
                    }
                    return Err(e);
                }
            }
        }

        self.step_count = step;
        if step % self.config.target_update_interval == 0 {
            self.target.sync_from(self.online.as_ref())?;
            debug!(
                "step {}: synced target network (sync #{})",
                step,
                self.target.sync_count()
            );
        }

        self.select_action(next_state.view())
    }

    fn check_transition(&self, transition: &Transition) -> Result<()> {
        let num_actions = self.config.num_actions;
        if transition.action >= num_actions {
            return Err(RlPackError::invalid_transition(format!(
                "action {} out of range for {} actions",
                transition.action, num_actions
            )));
        }
        if !transition.reward.is_finite() {
            return Err(RlPackError::invalid_transition(format!(
                "reward must be finite, got {}",
                transition.reward
            )));
        }
        let expected = self.state_shape.num_elements();
        for (name, state) in [("state", &transition.state), ("next_state", &transition.next_state)] {
            if state.len() != expected {
                return Err(RlPackError::invalid_transition(format!(
                    "{} has {} values, expected {} for shape {}",
                    name,
                    state.len(),
                    expected,
                    self.state_shape
                )));
            }
            if !all_finite(state.iter()) {
                return Err(RlPackError::invalid_transition(format!(
                    "{} contains non-finite values",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Sample a batch and take one gradient step on the online network
    fn learn(&mut self) -> Result<f64> {
        let batch = self
            .buffer
            .sample_batch(self.config.batch_size, &mut self.rng)?;

        let num_features = self.state_shape.num_elements();
        let states = stack_states(batch.iter().copied().map(|t| &t.state), num_features);
        let next_states = stack_states(batch.iter().copied().map(|t| &t.next_state), num_features);
        let actions: Vec<usize> = batch.iter().map(|t| t.action).collect();
        let rewards: Vec<f64> = batch.iter().map(|t| t.reward).collect();
        let dones: Vec<bool> = batch.iter().map(|t| t.done).collect();

        let targets = self.td_targets(&next_states, &rewards, &dones)?;
        self.online.update(
            states.view(),
            targets.view(),
            &actions,
            self.config.learning_rate,
        )
    }

    /// Bellman targets: `r` for terminal transitions, otherwise
    /// `r + gamma * Q_target(s', a*)` where `a*` maximises the target
    /// network (or the online network with double DQN).
    fn td_targets(
        &self,
        next_states: &Array2<f64>,
        rewards: &[f64],
        dones: &[bool],
    ) -> Result<Array1<f64>> {
        let next_q_target = self.target.forward(next_states.view())?;
        let next_q_online = if self.config.double_dqn {
            Some(self.online.forward(next_states.view())?)
        } else {
            None
        };

        let gamma = self.config.gamma;
        let targets = Array1::from_shape_fn(rewards.len(), |i| {
            if dones[i] {
                return rewards[i];
            }
            let bootstrap = match &next_q_online {
                Some(online_q) => next_q_target[[i, greedy_action(online_q.row(i))]],
                None => next_q_target
                    .row(i)
                    .iter()
                    .copied()
                    .fold(f64::NEG_INFINITY, f64::max),
            };
            rewards[i] + gamma * bootstrap
        });

        if !all_finite(targets.iter()) {
            return Err(RlPackError::numerical(
                "non-finite TD target from target network",
            ));
        }
        Ok(targets)
    }

    fn select_action(&mut self, state: ArrayView1<f64>) -> Result<usize> {
        let q_values = self.online.forward_single(state)?;
        Ok(self
            .exploration
            .select_action(q_values.view(), self.step_count, &mut self.rng))
    }

    /// Persist parameters, counters and construction arguments
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        Checkpoint {
            version: CHECKPOINT_VERSION,
            model_name: self.online.model_name().to_string(),
            model_args: serde_json::to_string(&self.model_args)?,
            agent_args: serde_json::to_string(&self.agent_args)?,
            online: self.online.parameters(),
            target: self.target.parameters(),
            step_count: self.step_count,
            update_count: self.update_count,
            sync_count: self.target.sync_count(),
        }
        .save(path)
    }

    /// Rebuild an agent from a checkpoint written by [`DqnAgent::save`].
    ///
    /// The replay buffer starts empty and optimizer moments are reset.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let checkpoint = Checkpoint::load(path)?;
        let model_args: Value = serde_json::from_str(&checkpoint.model_args)?;
        let agent_args: Value = serde_json::from_str(&checkpoint.agent_args)?;

        let mut agent = DqnAgent::new(&checkpoint.model_name, model_args, agent_args)?;
        agent.online.set_parameters(&checkpoint.online)?;
        agent
            .target
            .restore(&checkpoint.target, checkpoint.sync_count)?;
        agent.step_count = checkpoint.step_count;
        agent.update_count = checkpoint.update_count;
        info!(
            "Loaded DQN agent at step {} ({} updates, {} target syncs)",
            agent.step_count,
            agent.update_count,
            agent.target.sync_count()
        );
        Ok(agent)
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn sync_count(&self) -> u64 {
        self.target.sync_count()
    }

    /// Epsilon used by the next action selection
    pub fn epsilon(&self) -> f64 {
        self.exploration.schedule.epsilon(self.step_count)
    }

    pub fn last_loss(&self) -> Option<f64> {
        self.last_loss
    }

    pub fn buffer(&self) -> &ReplayBuffer {
        &self.buffer
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn state_shape(&self) -> &StateShape {
        &self.state_shape
    }

    pub fn num_actions(&self) -> usize {
        self.config.num_actions
    }

    pub fn model_name(&self) -> &'static str {
        self.online.model_name()
    }

    pub fn online_parameters(&self) -> NetworkParameters {
        self.online.parameters()
    }

    pub fn target_parameters(&self) -> NetworkParameters {
        self.target.parameters()
    }

    /// Replace the online parameters, e.g. to warm-start from another agent
    pub fn set_online_parameters(&mut self, parameters: &NetworkParameters) -> Result<()> {
        self.online.set_parameters(parameters)
    }
}

impl fmt::Debug for DqnAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DqnAgent")
            .field("model", &self.online.model_name())
            .field("state_shape", &self.state_shape)
            .field("num_actions", &self.config.num_actions)
            .field("step_count", &self.step_count)
            .field("update_count", &self.update_count)
            .field("sync_count", &self.target.sync_count())
            .field("buffer_len", &self.buffer.len())
            .finish_non_exhaustive()
    }
}
