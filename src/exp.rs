use crate::{discretize::DiscreteState, env::Action};

/// A single transition observed in the environment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exp {
    /// The state of the environment before taking the action
    pub state: DiscreteState,
    /// The action taken in the given state
    pub action: Action,
    /// The reward received after taking the action
    pub reward: f32,
    /// The state of the environment after the action is taken
    pub next_state: DiscreteState,
    /// Whether the episode ended with this transition
    pub done: bool,
}
