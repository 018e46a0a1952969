use rand::Rng;
use serde::{Deserialize, Serialize};
use strum::{FromRepr, VariantArray};

use crate::discretize::DiscreteState;

/// Number of actions available to the agent
pub const N_ACTIONS: usize = 2;

/// The two controls of the side-scroller: let gravity act, or apply an upward impulse
#[derive(
    FromRepr,
    VariantArray,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
)]
pub enum Action {
    Idle = 0,
    Flap = 1,
}

impl Action {
    /// Table index of this action
    pub fn index(self) -> usize {
        self as usize
    }

    /// Draw an action uniformly at random
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::VARIANTS[rng.gen_range(0..N_ACTIONS)]
    }
}

impl From<usize> for Action {
    fn from(value: usize) -> Self {
        Self::from_repr(value).expect("Action::from is only called with valid values [0, 1]")
    }
}

/// The game the agent learns to play, seen through a [`Discretizer`](crate::discretize::Discretizer)
///
/// Implementors own the simulation and the reward shaping. The agent treats rewards as opaque.
pub trait Environment {
    /// Begin a new episode
    ///
    /// **Returns** the initial discretized observation
    fn reset(&mut self) -> DiscreteState;

    /// Advance the simulation by one tick under `action`
    ///
    /// **Returns** `(next_state, reward, done)` where `done` marks a terminal state. Episodes cut short
    /// without reaching one are reported through [`truncated`](Environment::truncated) instead.
    fn step(&mut self, action: Action) -> (DiscreteState, f32, bool);

    /// Whether the most recent [`step`](Environment::step) cleared an obstacle
    fn passed_obstacle(&self) -> bool {
        false
    }

    /// Whether the episode was cut off after the most recent [`step`](Environment::step) without
    /// reaching a terminal state
    fn truncated(&self) -> bool {
        false
    }
}
