//! On-disk agent snapshots.
//!
//! A checkpoint stores what is needed to rebuild an agent and resume its
//! policy: the construction arguments, both parameter sets and the step
//! counters. Optimizer moments and replay memory are not persisted.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Result, RlPackError};
use crate::network::NetworkParameters;

/// Format version written into every checkpoint
pub const CHECKPOINT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub model_name: String,
    /// `model_args` as JSON text
    pub model_args: String,
    /// `agent_args` as JSON text
    pub agent_args: String,
    pub online: NetworkParameters,
    pub target: NetworkParameters,
    pub step_count: u64,
    pub update_count: u64,
    pub sync_count: u64,
}

impl Checkpoint {
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = bincode::serialize(self)?;
        fs::write(path, serialized)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path)?;
        let checkpoint: Checkpoint = bincode::deserialize(&data)?;
        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(RlPackError::SerializationError(format!(
                "unsupported checkpoint version {} (expected {})",
                checkpoint.version, CHECKPOINT_VERSION
            )));
        }
        Ok(checkpoint)
    }
}
