//! Tabular Q-learning for a two-action side-scrolling obstacle game.
//!
//! Continuous observations are bucketed by a [`Discretizer`](discretize::Discretizer) into a dense
//! [`ValueTable`](table::ValueTable), which a [`QTableAgent`](algo::tabular::QTableAgent) fills in
//! with visit-count step sizes while exploring epsilon-greedily.

/// Implemented RL algorithms
pub mod algo;

/// Implementations of strategies for time-decaying hyperparameters
pub mod decay;

/// Observation discretization
pub mod discretize;

/// Environment
pub mod env;

/// Crate error type
pub mod error;

/// Transitions
pub mod exp;

/// Exploration policies
pub mod exploration;

/// Persistence of tables, score logs, and run directories
pub mod record;

/// Dense action-value and visit-count tables
pub mod table;

/// Testing environments
#[cfg(feature = "gym")]
pub mod gym;

mod util;

pub use error::{Error, Result};
