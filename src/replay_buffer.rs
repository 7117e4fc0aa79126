use ndarray::Array1;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::error::{Result, RlPackError};

/// One observed environment step
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state: Array1<f64>,
    pub action: usize,
    pub reward: f64,
    pub next_state: Array1<f64>,
    pub done: bool,
}

/// Bounded FIFO experience memory.
///
/// Once `capacity` transitions are stored, each insert evicts the oldest.
#[derive(Clone, Debug)]
pub struct ReplayBuffer {
    buffer: VecDeque<Transition>,
    capacity: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        ReplayBuffer {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Store a transition, evicting the oldest one when full
    pub fn insert(&mut self, transition: Transition) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    /// Draw `batch_size` transitions uniformly, with replacement.
    ///
    /// Fails with `InsufficientData` while the buffer holds fewer than
    /// `batch_size` transitions.
    pub fn sample_batch<R: Rng + ?Sized>(
        &self,
        batch_size: usize,
        rng: &mut R,
    ) -> Result<Vec<&Transition>> {
        let available = self.buffer.len();
        if available < batch_size || available == 0 {
            return Err(RlPackError::InsufficientData {
                requested: batch_size,
                available,
            });
        }
        Ok((0..batch_size)
            .map(|_| &self.buffer[rng.gen_range(0..available)])
            .collect())
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stored transitions, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.buffer.iter()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
