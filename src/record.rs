use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    table::{TableShape, ValueTable},
};

/// File name of the persisted action-value array inside a run directory
pub const Q_TABLE_FILE: &str = "q_table.bin";
/// File name of the persisted visit-count array inside a run directory
pub const VISIT_FILE: &str = "visit.bin";
/// File name of the per-episode score log inside a run directory
pub const SCORES_FILE: &str = "scores.csv";

/// Per-episode counters, one row of the score log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeStats {
    pub episode: u32,
    /// Ticks survived, not counting a terminal one
    pub frames: u32,
    /// Obstacles passed
    pub pipes: u32,
}

impl EpisodeStats {
    pub fn new(episode: u32) -> Self {
        Self {
            episode,
            ..Default::default()
        }
    }

    /// Account for one environment step
    pub fn track(&mut self, done: bool, passed_obstacle: bool) {
        if !done {
            self.frames += 1;
        }
        if passed_obstacle {
            self.pipes += 1;
        }
    }
}

/// CSV log of [`EpisodeStats`] with an `episode,frames,pipes` header
pub struct EpisodeLog<W: Write> {
    writer: csv::Writer<W>,
}

impl EpisodeLog<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            writer: csv::Writer::from_path(path)?,
        })
    }
}

impl<W: Write> EpisodeLog<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
        }
    }

    pub fn record(&mut self, stats: &EpisodeStats) -> Result<()> {
        self.writer.serialize(stats)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and return the underlying writer
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))
    }
}

/// Read back a score log written by [`EpisodeLog`]
pub fn read_episode_log(path: impl AsRef<Path>) -> Result<Vec<EpisodeStats>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<std::result::Result<_, _>>()?;
    Ok(rows)
}

/// Create a fresh `run-%Y%m%d-%H%M%S` directory under `base`
///
/// Fails if the directory already exists rather than mixing two runs.
pub fn create_run_dir(base: impl AsRef<Path>) -> Result<PathBuf> {
    let base = base.as_ref();
    fs::create_dir_all(base)?;
    let dir = base.join(Local::now().format("run-%Y%m%d-%H%M%S").to_string());
    fs::create_dir(&dir)?;
    log::info!("created run directory {}", dir.display());
    Ok(dir)
}

#[derive(Serialize)]
struct DenseArrayRef<'a, T> {
    shape: [usize; 4],
    data: &'a [T],
}

#[derive(Deserialize)]
struct DenseArray<T> {
    shape: [usize; 4],
    data: Vec<T>,
}

fn write_array<T: Serialize>(path: &Path, shape: TableShape, data: &[T]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let array = DenseArrayRef {
        shape: shape.dims(),
        data,
    };
    bincode::serialize_into(&mut writer, &array)?;
    writer.flush()?;
    Ok(())
}

fn read_array<T>(path: &Path, expected: TableShape) -> Result<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
{
    let reader = BufReader::new(File::open(path)?);
    let array: DenseArray<T> = bincode::deserialize_from(reader)?;
    let found = TableShape::from(array.shape);
    if array.shape != expected.dims() {
        return Err(Error::ShapeMismatch { expected, found });
    }
    Ok(array.data)
}

/// Save both arrays of `table` into `dir`
pub fn save_table(table: &ValueTable, dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    write_array(&dir.join(Q_TABLE_FILE), table.shape(), table.values())?;
    write_array(&dir.join(VISIT_FILE), table.shape(), table.visits())?;
    log::info!("saved {} table to {}", table.shape(), dir.display());
    Ok(())
}

/// Load a table saved by [`save_table`], requiring it to have exactly `expected` shape
///
/// With `with_visits` unset only the action values are read and visit counts start at zero, which
/// is all a greedy evaluation needs.
///
/// ### Errors
/// [`Error::ShapeMismatch`] if either array was saved for a different bin configuration
pub fn load_table(dir: impl AsRef<Path>, expected: TableShape, with_visits: bool) -> Result<ValueTable> {
    let dir = dir.as_ref();
    let values = read_array(&dir.join(Q_TABLE_FILE), expected)?;
    let visits = if with_visits {
        Some(read_array(&dir.join(VISIT_FILE), expected)?)
    } else {
        None
    };
    let table = ValueTable::from_parts(expected, values, visits)?;
    log::info!("loaded {} table from {}", expected, dir.display());
    Ok(table)
}

/// Whether `dir` holds a saved action-value array
pub fn has_table(dir: impl AsRef<Path>) -> io::Result<bool> {
    dir.as_ref().join(Q_TABLE_FILE).try_exists()
}
