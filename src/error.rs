use std::io;

use thiserror::Error;

use crate::table::TableShape;

/// Errors surfaced by the crate
///
/// Out-of-range observations are not errors (they saturate in the
/// [`Discretizer`](crate::discretize::Discretizer)) and neither is value divergence (contained by the
/// table's value cap). What remains is configuration and I/O.
#[derive(Debug, Error)]
pub enum Error {
    /// Bin edges that are too short, not strictly increasing, or not finite
    #[error("invalid bin edges for `{dim}`: {reason}")]
    InvalidBinEdges { dim: &'static str, reason: String },

    /// A persisted table was built for a different bin configuration
    #[error("table shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch {
        expected: TableShape,
        found: TableShape,
    },

    /// A persisted array declares one shape but carries a different number of elements
    #[error("corrupt table file: shape {shape} needs {expected} elements, found {found}")]
    Corrupt {
        shape: TableShape,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("encoding error: {0}")]
    Encode(#[from] bincode::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
