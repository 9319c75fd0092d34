//! Error types for the benchmark pipeline.
//!
//! [`BenchError`] covers failures that stop an operation. Failures of a
//! single row, lookup or query sample are reported as values
//! ([`RowFailure`], [`LookupFailure`], [`QueryFailure`]) so the caller can
//! decide whether the surrounding batch survives.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BenchError>;

#[derive(Debug, Error)]
pub enum BenchError {
    /// Schema creation, transaction control, index DDL, statement preparation.
    #[error("{stage} failed: {source}")]
    Setup {
        stage: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("cannot remove stale store file {}: {source}", .path.display())]
    StaleStore {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("index {0} already exists")]
    IndexAlreadyExists(String),

    #[error("index {0} does not exist")]
    IndexMissing(String),

    #[error("cannot create unique index {index}: duplicate names in resources ({source})")]
    DuplicateNames {
        index: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("query returns {actual} columns but its row shape declares {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("batch load rolled back after {} failed row(s); first: {}", .0.len(), first_failure(.0))]
    LoadRolledBack(Vec<RowFailure>),
}

impl BenchError {
    pub(crate) fn setup(stage: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| BenchError::Setup { stage, source }
    }
}

fn first_failure(failures: &[RowFailure]) -> String {
    failures
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".to_string())
}

/// A record that could not be inserted.
#[derive(Debug, Error)]
#[error("row {index}: {cause}")]
pub struct RowFailure {
    pub index: usize,
    pub cause: BenchError,
}

/// A name lookup that errored (as opposed to finding no row).
#[derive(Debug, Error)]
#[error("lookup of {name} for edge {index}: {cause}")]
pub struct LookupFailure {
    pub index: usize,
    pub name: String,
    pub cause: BenchError,
}

/// A failed benchmark iteration.
#[derive(Debug, Error)]
#[error("iteration {iteration}: {cause}")]
pub struct QueryFailure {
    pub iteration: usize,
    pub cause: BenchError,
}
