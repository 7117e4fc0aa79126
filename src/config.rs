//! Typed agent and model configuration.
//!
//! Callers describe an agent with a model name and two dynamic maps,
//! `model_args` and `agent_args`. Both are parsed here into explicit structs
//! with named, typed fields; unknown keys, wrong types and out-of-range values
//! are rejected with [`RlPackError::Configuration`] before any agent state is
//! built.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::activations::Activation;
use crate::error::{Result, RlPackError};
use crate::loss::LossKind;
use crate::optimizer::{GradientClipper, OptimizerWrapper};
use crate::tensor::StateShape;

/// Shape of the epsilon decay curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecayMode {
    Linear,
    Exponential,
}

fn default_optimizer() -> String {
    "adam".to_string()
}

fn default_loss() -> String {
    "mse".to_string()
}

fn default_huber_delta() -> f64 {
    1.0
}

fn default_interval() -> u64 {
    1
}

fn default_activation() -> String {
    "relu".to_string()
}

fn default_hidden_sizes() -> Vec<usize> {
    vec![64, 64]
}

/// Agent hyperparameters (`agent_args`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    pub batch_size: usize,
    pub gamma: f64,
    pub epsilon_start: f64,
    pub epsilon_min: f64,
    pub epsilon_decay_steps: u64,
    pub decay_mode: DecayMode,
    pub replay_capacity: usize,
    pub target_update_interval: u64,
    pub learning_rate: f64,
    pub num_actions: usize,

    /// `"adam"`, `"sgd"` or `"rmsprop"`
    #[serde(default = "default_optimizer")]
    pub optimizer: String,

    /// Attempt a gradient update only every this many steps
    #[serde(default = "default_interval")]
    pub policy_update_interval: u64,

    #[serde(default)]
    pub double_dqn: bool,

    /// `"mse"` or `"huber"`
    #[serde(default = "default_loss")]
    pub loss: String,

    #[serde(default = "default_huber_delta")]
    pub huber_delta: f64,

    /// Global-norm gradient clipping threshold
    #[serde(default)]
    pub max_grad_norm: Option<f64>,

    /// Per-tensor L2 norm clipping threshold
    #[serde(default)]
    pub clip_norm: Option<f64>,

    /// Element-wise gradient clipping bound
    #[serde(default)]
    pub grad_clip_value: Option<f64>,

    /// Seed for weight initialisation, sampling and exploration
    #[serde(default)]
    pub seed: Option<u64>,
}

impl AgentConfig {
    /// Parse and validate `agent_args`
    pub fn from_args(args: &Value) -> Result<Self> {
        let config: AgentConfig = parse_args("agent_args", args)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(invalid("batch_size", "must be greater than 0".to_string()));
        }
        if self.replay_capacity == 0 {
            return Err(invalid("replay_capacity", "must be greater than 0".to_string()));
        }
        if self.batch_size > self.replay_capacity {
            return Err(invalid(
                "batch_size",
                format!(
                    "batch size {} exceeds replay capacity {}; training could never start",
                    self.batch_size, self.replay_capacity
                ),
            ));
        }
        if self.num_actions == 0 {
            return Err(invalid("num_actions", "must be greater than 0".to_string()));
        }
        if !(self.gamma > 0.0 && self.gamma <= 1.0) {
            return Err(invalid("gamma", format!("must be in (0, 1], got {}", self.gamma)));
        }
        for (name, value) in [("epsilon_start", self.epsilon_start), ("epsilon_min", self.epsilon_min)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(name, format!("must be in [0, 1], got {}", value)));
            }
        }
        if self.epsilon_min > self.epsilon_start {
            return Err(invalid(
                "epsilon_min",
                format!(
                    "{} is greater than epsilon_start {}",
                    self.epsilon_min, self.epsilon_start
                ),
            ));
        }
        if self.epsilon_decay_steps == 0 {
            return Err(invalid("epsilon_decay_steps", "must be greater than 0".to_string()));
        }
        if self.target_update_interval == 0 {
            return Err(invalid("target_update_interval", "must be greater than 0".to_string()));
        }
        if self.policy_update_interval == 0 {
            return Err(invalid("policy_update_interval", "must be greater than 0".to_string()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(invalid(
                "learning_rate",
                format!("must be a positive finite number, got {}", self.learning_rate),
            ));
        }
        OptimizerWrapper::from_name(&self.optimizer)?;
        self.loss_kind()?;
        for (name, norm) in [("max_grad_norm", self.max_grad_norm), ("clip_norm", self.clip_norm)] {
            if let Some(norm) = norm {
                if !(norm.is_finite() && norm > 0.0) {
                    return Err(invalid(name, format!("must be positive, got {}", norm)));
                }
            }
        }
        if let Some(value) = self.grad_clip_value {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid("grad_clip_value", format!("must be positive, got {}", value)));
            }
        }
        Ok(())
    }

    pub fn loss_kind(&self) -> Result<LossKind> {
        match self.loss.to_ascii_lowercase().as_str() {
            "mse" => Ok(LossKind::Mse),
            "huber" | "smooth_l1" => {
                if !(self.huber_delta.is_finite() && self.huber_delta > 0.0) {
                    return Err(invalid(
                        "huber_delta",
                        format!("must be positive, got {}", self.huber_delta),
                    ));
                }
                Ok(LossKind::Huber {
                    delta: self.huber_delta,
                })
            }
            other => Err(invalid("loss", format!("Unknown loss '{}'", other))),
        }
    }

    /// Clippers applied to every gradient step, in order
    pub fn gradient_clippers(&self) -> Vec<GradientClipper> {
        let mut clippers = Vec::new();
        if let Some(value) = self.grad_clip_value {
            clippers.push(GradientClipper::ClipByValue {
                min: -value,
                max: value,
            });
        }
        if let Some(max_norm) = self.clip_norm {
            clippers.push(GradientClipper::ClipByNorm { max_norm });
        }
        if let Some(max_norm) = self.max_grad_norm {
            clippers.push(GradientClipper::ClipByGlobalNorm { max_norm });
        }
        clippers
    }
}

/// `model_args` for the `"mlp"` architecture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MlpConfig {
    pub state_shape: Vec<usize>,

    #[serde(default = "default_hidden_sizes")]
    pub hidden_sizes: Vec<usize>,

    #[serde(default = "default_activation")]
    pub activation: String,

    #[serde(default)]
    pub num_actions: Option<usize>,
}

/// `model_args` for the `"dqn1d"` architecture.
///
/// `channels[0]` is the number of input channels; each following entry adds
/// one convolution block configured by the matching kernel, stride and
/// dilation entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dqn1dConfig {
    pub sequence_length: usize,
    pub channels: Vec<usize>,
    pub kernel_sizes: Vec<usize>,
    pub strides_sizes: Vec<usize>,
    pub dilation_sizes: Vec<usize>,

    #[serde(default = "default_activation")]
    pub activation: String,

    #[serde(default)]
    pub dropout: f64,

    #[serde(default)]
    pub num_actions: Option<usize>,
}

impl Dqn1dConfig {
    /// Sequence length after each convolution block, starting with the input
    pub fn interim_lengths(&self) -> Result<Vec<usize>> {
        let mut lengths = vec![self.sequence_length];
        for (idx, ((&kernel, &stride), &dilation)) in self
            .kernel_sizes
            .iter()
            .zip(&self.strides_sizes)
            .zip(&self.dilation_sizes)
            .enumerate()
        {
            let current = lengths[idx];
            let span = kernel
                .checked_sub(1)
                .and_then(|k| k.checked_mul(dilation))
                .and_then(|s| s.checked_add(1))
                .ok_or_else(|| {
                    invalid(
                        "kernel_sizes",
                        format!(
                            "block {}: kernel {} with dilation {} has no valid span",
                            idx, kernel, dilation
                        ),
                    )
                })?;
            if current < span {
                return Err(invalid(
                    "kernel_sizes",
                    format!(
                        "block {} needs at least {} input positions but only {} remain",
                        idx, span, current
                    ),
                ));
            }
            lengths.push((current - span) / stride + 1);
        }
        Ok(lengths)
    }
}

/// Architecture configuration keyed by `model_name`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelConfig {
    Mlp(MlpConfig),
    Dqn1d(Dqn1dConfig),
}

impl ModelConfig {
    /// Parse `model_args` for the architecture named `model_name`
    pub fn from_args(model_name: &str, args: &Value) -> Result<Self> {
        let config = match model_name.to_ascii_lowercase().as_str() {
            "mlp" => ModelConfig::Mlp(parse_args("model_args", args)?),
            "dqn1d" => ModelConfig::Dqn1d(parse_args("model_args", args)?),
            other => {
                return Err(invalid(
                    "model_name",
                    format!("Unknown model '{}'; expected 'mlp' or 'dqn1d'", other),
                ))
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn model_name(&self) -> &'static str {
        match self {
            ModelConfig::Mlp(_) => "mlp",
            ModelConfig::Dqn1d(_) => "dqn1d",
        }
    }

    /// Logical observation shape the architecture consumes
    pub fn state_shape(&self) -> Result<StateShape> {
        match self {
            ModelConfig::Mlp(cfg) => StateShape::new(cfg.state_shape.clone()),
            ModelConfig::Dqn1d(cfg) => {
                let in_channels = cfg.channels.first().copied().unwrap_or(0);
                StateShape::new(vec![in_channels, cfg.sequence_length])
            }
        }
    }

    pub fn activation(&self) -> Result<Activation> {
        match self {
            ModelConfig::Mlp(cfg) => Activation::from_name(&cfg.activation),
            ModelConfig::Dqn1d(cfg) => Activation::from_name(&cfg.activation),
        }
    }

    /// Number of actions declared in `model_args`, if any
    pub fn declared_num_actions(&self) -> Option<usize> {
        match self {
            ModelConfig::Mlp(cfg) => cfg.num_actions,
            ModelConfig::Dqn1d(cfg) => cfg.num_actions,
        }
    }

    /// Check that `model_args` agrees with the agent's action count
    pub fn check_num_actions(&self, num_actions: usize) -> Result<()> {
        match self.declared_num_actions() {
            Some(declared) if declared != num_actions => Err(invalid(
                "num_actions",
                format!(
                    "model_args declares {} actions but agent_args declares {}",
                    declared, num_actions
                ),
            )),
            _ => Ok(()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.state_shape()?;
        self.activation()?;
        match self {
            ModelConfig::Mlp(cfg) => {
                if cfg.hidden_sizes.iter().any(|&h| h == 0) {
                    return Err(invalid(
                        "hidden_sizes",
                        format!("all layer sizes must be positive, got {:?}", cfg.hidden_sizes),
                    ));
                }
            }
            ModelConfig::Dqn1d(cfg) => {
                if cfg.channels.len() < 2 {
                    return Err(invalid(
                        "channels",
                        "needs the input channel count and at least one block".to_string(),
                    ));
                }
                let blocks = cfg.channels.len() - 1;
                for (name, list) in [
                    ("kernel_sizes", &cfg.kernel_sizes),
                    ("strides_sizes", &cfg.strides_sizes),
                    ("dilation_sizes", &cfg.dilation_sizes),
                ] {
                    if list.len() != blocks {
                        return Err(invalid(
                            name,
                            format!("expected {} entries (one per block), got {}", blocks, list.len()),
                        ));
                    }
                    if list.iter().any(|&v| v == 0) {
                        return Err(invalid(name, format!("entries must be positive, got {:?}", list)));
                    }
                }
                if cfg.channels.iter().any(|&c| c == 0) {
                    return Err(invalid(
                        "channels",
                        format!("entries must be positive, got {:?}", cfg.channels),
                    ));
                }
                if !(0.0..1.0).contains(&cfg.dropout) {
                    return Err(invalid("dropout", format!("must be in [0, 1), got {}", cfg.dropout)));
                }
                cfg.interim_lengths()?;
            }
        }
        if self.declared_num_actions() == Some(0) {
            return Err(invalid("num_actions", "must be greater than 0".to_string()));
        }
        Ok(())
    }
}

/// A complete agent description, as kept in a run configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub model_name: String,
    pub model_args: Value,
    pub agent_args: Value,
}

impl RunConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| invalid("run_config", e.to_string()))
    }

    /// Load a run configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}

fn parse_args<T: DeserializeOwned>(name: &str, args: &Value) -> Result<T> {
    if !args.is_object() {
        return Err(invalid(name, format!("expected a mapping, got {}", args)));
    }
    serde_json::from_value(args.clone()).map_err(|e| invalid(name, e.to_string()))
}

fn invalid(name: &str, reason: String) -> RlPackError {
    RlPackError::configuration(name.to_string(), reason)
}
