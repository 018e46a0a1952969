use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    table::TableShape,
};

/// An index triple identifying one cell of the discretized observation space
///
/// Only a [`Discretizer`] produces these, so every component is a valid bin index for the
/// configuration that produced it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscreteState {
    pub xi: usize,
    pub yi: usize,
    pub zi: usize,
}

impl DiscreteState {
    pub fn new(xi: usize, yi: usize, zi: usize) -> Self {
        Self { xi, yi, zi }
    }
}

/// Strictly increasing bucket boundaries for one observation channel
///
/// The first and last edges double as the clamp bounds of the channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BinEdges {
    edges: Vec<f64>,
}

impl BinEdges {
    /// Validate a list of edges
    ///
    /// ### Errors
    /// [`Error::InvalidBinEdges`] if there are fewer than two edges, any edge is not finite, or the
    /// edges are not strictly increasing
    pub fn new(dim: &'static str, edges: Vec<f64>) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidBinEdges {
            dim,
            reason: reason.to_owned(),
        };
        if edges.len() < 2 {
            return Err(invalid("at least two edges are required"));
        }
        if edges.iter().any(|e| !e.is_finite()) {
            return Err(invalid("edges must be finite"));
        }
        if edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(invalid("edges must be strictly increasing"));
        }
        Ok(Self { edges })
    }

    /// Evenly spaced edges from `start` to `stop` inclusive
    pub fn range(dim: &'static str, start: f64, stop: f64, step: f64) -> Result<Self> {
        if !(step > 0.0) || !(stop > start) {
            return Err(Error::InvalidBinEdges {
                dim,
                reason: format!("cannot step from {start} to {stop} by {step}"),
            });
        }
        let n = ((stop - start) / step).round() as usize;
        Self::new(dim, (0..=n).map(|i| start + i as f64 * step).collect())
    }

    /// Number of bins, one fewer than the number of edges
    pub fn bins(&self) -> usize {
        self.edges.len() - 1
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn low(&self) -> f64 {
        self.edges[0]
    }

    pub fn high(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }

    /// Index of the half-open bin `[edges[k], edges[k+1])` containing `value` after clamping
    ///
    /// A value equal to the last edge lands in the final bin. NaN lands in bin 0.
    pub fn index(&self, value: f64) -> usize {
        let value = value.clamp(self.low(), self.high());
        self.edges
            .partition_point(|&e| e <= value)
            .saturating_sub(1)
            .min(self.bins() - 1)
    }
}

/// Maps a continuous `(x, y, v)` observation onto a [`DiscreteState`]
///
/// For the side-scroller the channels are the horizontal distance to the next obstacle, the
/// vertical offset to its gap, and the vertical velocity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Discretizer {
    x: BinEdges,
    y: BinEdges,
    z: BinEdges,
}

impl Discretizer {
    pub fn new(x: BinEdges, y: BinEdges, z: BinEdges) -> Self {
        Self { x, y, z }
    }

    /// Bins used for the side-scroller: distance `0..=500` by 10, gap offset `-200..=200` by 10,
    /// velocity `-15..=15` by 3
    pub fn flappy() -> Self {
        let bins = || -> Result<Self> {
            Ok(Self::new(
                BinEdges::range("x", 0.0, 500.0, 10.0)?,
                BinEdges::range("y", -200.0, 200.0, 10.0)?,
                BinEdges::range("z", -15.0, 15.0, 3.0)?,
            ))
        };
        bins().expect("built-in bin edges are valid")
    }

    /// Discretize one observation. Out-of-range values saturate at the boundary bins.
    pub fn discretize(&self, x: f64, y: f64, v: f64) -> DiscreteState {
        DiscreteState {
            xi: self.x.index(x),
            yi: self.y.index(y),
            zi: self.z.index(v),
        }
    }

    /// Shape of the value table this discretizer indexes into
    pub fn shape(&self) -> TableShape {
        TableShape::new(self.x.bins(), self.y.bins(), self.z.bins())
    }

    pub fn x_edges(&self) -> &BinEdges {
        &self.x
    }

    pub fn y_edges(&self) -> &BinEdges {
        &self.y
    }

    pub fn z_edges(&self) -> &BinEdges {
        &self.z
    }
}

impl Default for Discretizer {
    fn default() -> Self {
        Self::flappy()
    }
}
