use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    discretize::DiscreteState,
    env::{Action, N_ACTIONS},
    error::{Error, Result},
};

/// Dimensions of a value table: bins per observation channel, with [`N_ACTIONS`] implied last
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableShape {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl TableShape {
    pub fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    /// Full 4-d shape `(x, y, z, actions)`
    pub fn dims(&self) -> [usize; 4] {
        [self.x, self.y, self.z, N_ACTIONS]
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.dims().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn row(&self, s: DiscreteState) -> usize {
        ((s.xi * self.y + s.yi) * self.z + s.zi) * N_ACTIONS
    }
}

impl From<[usize; 4]> for TableShape {
    fn from([x, y, z, _]: [usize; 4]) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for TableShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x, self.y, self.z, N_ACTIONS)
    }
}

/// Dense action-value table `Q` with its parallel visit-count table `N`
///
/// Both are flat row-major arrays over `(xi, yi, zi, action)`, so the values of all actions in a
/// state are contiguous.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueTable {
    shape: TableShape,
    values: Vec<f32>,
    visits: Vec<u64>,
}

impl ValueTable {
    /// A zero-initialized table
    pub fn new(shape: TableShape) -> Self {
        Self {
            shape,
            values: vec![0.0; shape.len()],
            visits: vec![0; shape.len()],
        }
    }

    /// Assemble a table from raw arrays. Missing visit counts are zero-filled.
    ///
    /// ### Errors
    /// [`Error::Corrupt`] if an array's length disagrees with `shape`
    pub fn from_parts(shape: TableShape, values: Vec<f32>, visits: Option<Vec<u64>>) -> Result<Self> {
        let expected = shape.len();
        let visits = visits.unwrap_or_else(|| vec![0; expected]);
        for found in [values.len(), visits.len()] {
            if found != expected {
                return Err(Error::Corrupt {
                    shape,
                    expected,
                    found,
                });
            }
        }
        Ok(Self {
            shape,
            values,
            visits,
        })
    }

    pub fn shape(&self) -> TableShape {
        self.shape
    }

    /// Raw `Q` array
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Raw `N` array
    pub fn visits(&self) -> &[u64] {
        &self.visits
    }

    /// `Q[s, :]`
    pub fn action_values(&self, state: DiscreteState) -> &[f32] {
        let row = self.shape.row(state);
        &self.values[row..row + N_ACTIONS]
    }

    pub fn value(&self, state: DiscreteState, action: Action) -> f32 {
        self.values[self.shape.row(state) + action.index()]
    }

    pub fn visit_count(&self, state: DiscreteState, action: Action) -> u64 {
        self.visits[self.shape.row(state) + action.index()]
    }

    /// `max_a Q[s, a]`
    pub fn max_value(&self, state: DiscreteState) -> f32 {
        self.action_values(state)
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// The action with the highest value in `state`, preferring the lowest index on ties
    pub fn greedy_action(&self, state: DiscreteState) -> Action {
        let values = self.action_values(state);
        let mut best = 0;
        for (i, &v) in values.iter().enumerate().skip(1) {
            if v > values[best] {
                best = i;
            }
        }
        Action::from(best)
    }

    /// Mutable access to one `(Q, N)` cell pair
    pub(crate) fn cell_mut(&mut self, state: DiscreteState, action: Action) -> (&mut f32, &mut u64) {
        let i = self.shape.row(state) + action.index();
        (&mut self.values[i], &mut self.visits[i])
    }

    /// Visit counts projected onto the `(x, y)` plane, summed over velocity bins and actions
    ///
    /// Indexed `[xi][yi]`.
    pub fn visit_heatmap(&self) -> Vec<Vec<u64>> {
        let TableShape { x, y, z } = self.shape;
        let mut heatmap = vec![vec![0; y]; x];
        for (xi, column) in heatmap.iter_mut().enumerate() {
            for (yi, cell) in column.iter_mut().enumerate() {
                let start = self.shape.row(DiscreteState::new(xi, yi, 0));
                *cell = self.visits[start..start + z * N_ACTIONS].iter().sum();
            }
        }
        heatmap
    }
}
