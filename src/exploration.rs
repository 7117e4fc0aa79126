//! Epsilon-greedy exploration.
//!
//! Epsilon is a pure function of the agent's step counter, so the schedule
//! carries no state of its own and restoring the counter restores epsilon.

use ndarray::ArrayView1;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{AgentConfig, DecayMode};

/// Decay rate of the exponential schedule; after `decay_steps` the distance
/// to `epsilon_min` has shrunk by `exp(-EXP_DECAY_RATE)` before clamping.
const EXP_DECAY_RATE: f64 = 5.0;

/// Monotone non-increasing epsilon schedule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpsilonSchedule {
    pub start: f64,
    pub min: f64,
    pub decay_steps: u64,
    pub mode: DecayMode,
}

impl EpsilonSchedule {
    pub fn new(start: f64, min: f64, decay_steps: u64, mode: DecayMode) -> Self {
        EpsilonSchedule {
            start,
            min,
            decay_steps: decay_steps.max(1),
            mode,
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(
            config.epsilon_start,
            config.epsilon_min,
            config.epsilon_decay_steps,
            config.decay_mode,
        )
    }

    /// Epsilon after `step` counted training steps
    pub fn epsilon(&self, step: u64) -> f64 {
        if step == 0 {
            return self.start;
        }
        if step >= self.decay_steps {
            return self.min;
        }
        let progress = step as f64 / self.decay_steps as f64;
        let span = self.start - self.min;
        let value = match self.mode {
            DecayMode::Linear => self.start - span * progress,
            DecayMode::Exponential => self.min + span * (-EXP_DECAY_RATE * progress).exp(),
        };
        value.max(self.min).min(self.start)
    }
}

/// Epsilon-greedy action selector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpsilonGreedy {
    pub schedule: EpsilonSchedule,
}

impl EpsilonGreedy {
    pub fn new(schedule: EpsilonSchedule) -> Self {
        EpsilonGreedy { schedule }
    }

    /// Pick a uniformly random action with probability `epsilon(step)`,
    /// otherwise the greedy one.
    pub fn select_action<R: Rng + ?Sized>(
        &self,
        q_values: ArrayView1<f64>,
        step: u64,
        rng: &mut R,
    ) -> usize {
        let epsilon = self.schedule.epsilon(step);
        if epsilon > 0.0 && rng.gen::<f64>() < epsilon {
            rng.gen_range(0..q_values.len().max(1))
        } else {
            greedy_action(q_values)
        }
    }
}

/// Index of the largest Q-value.
///
/// Ties resolve to the lowest index. NaN entries are skipped; if every entry
/// is NaN the first action is returned.
pub fn greedy_action(q_values: ArrayView1<f64>) -> usize {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &q) in q_values.iter().enumerate() {
        if q.is_nan() {
            continue;
        }
        match best {
            Some((_, best_q)) if q <= best_q => {}
            _ => best = Some((idx, q)),
        }
    }
    best.map(|(idx, _)| idx).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_greedy_ties_pick_lowest_index() {
        assert_eq!(greedy_action(array![1.0, 3.0, 3.0, 2.0].view()), 1);
        assert_eq!(greedy_action(array![0.0, 0.0].view()), 0);
    }

    #[test]
    fn test_greedy_skips_nan() {
        assert_eq!(greedy_action(array![f64::NAN, -1.0, -2.0].view()), 1);
        assert_eq!(greedy_action(array![f64::NAN, f64::NAN].view()), 0);
    }

    #[test]
    fn test_zero_epsilon_is_greedy() {
        let policy = EpsilonGreedy::new(EpsilonSchedule::new(0.0, 0.0, 10, DecayMode::Linear));
        let mut rng = StdRng::seed_from_u64(3);
        for step in 0..20 {
            assert_eq!(policy.select_action(array![0.1, 0.9, 0.2].view(), step, &mut rng), 1);
        }
    }

    #[test]
    fn test_full_epsilon_covers_all_actions() {
        let policy = EpsilonGreedy::new(EpsilonSchedule::new(1.0, 1.0, 10, DecayMode::Linear));
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen = [false; 4];
        for _ in 0..200 {
            seen[policy.select_action(array![0.0, 0.0, 0.0, 1.0].view(), 0, &mut rng)] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
