use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{assert_interval, decay::Decay};

use super::Choice;

/// Epsilon greedy exploration policy with an episode-dependent epsilon threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpsilonGreedy<D: Decay> {
    epsilon: D,
}

impl<D: Decay> EpsilonGreedy<D> {
    /// Initialize epsilon greedy policy with a decay strategy
    pub fn new(decay: D) -> Self {
        Self { epsilon: decay }
    }

    /// Exploration rate for `episode`
    pub fn epsilon(&self, episode: u32) -> f64 {
        self.epsilon.evaluate(episode as f64)
    }

    /// Flip the explore/exploit coin for `episode`
    pub fn choose<R: Rng + ?Sized>(&self, episode: u32, rng: &mut R) -> Choice {
        choose(self.epsilon(episode), rng)
    }
}

/// Flip the explore/exploit coin with an explicit `epsilon`
///
/// **Panics** if `epsilon` is not in the interval `[0,1]`
pub fn choose<R: Rng + ?Sized>(epsilon: f64, rng: &mut R) -> Choice {
    assert_interval!(epsilon, 0.0, 1.0);
    if rng.gen::<f64>() < epsilon {
        Choice::Explore
    } else {
        Choice::Exploit
    }
}
