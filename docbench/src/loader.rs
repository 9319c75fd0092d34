//! Bulk insertion of generated records.
//!
//! All rows go through one prepared `INSERT` inside one transaction. The
//! batch is all-or-nothing: a single failed row rolls the transaction back.

use crate::error::{BenchError, Result, RowFailure};
use crate::generator::Record;
use log::{info, warn};
use rusqlite::{params, Connection};
use std::str::FromStr;
use std::time::{Duration, Instant};

const INSERT_RECORD: &str = "INSERT INTO resources (id, name, data) VALUES (?1, ?2, ?3)";

/// What to do after the first failed row. Either way nothing is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop executing at the first failure.
    #[default]
    AbortOnFirst,
    /// Keep executing to report every failing row, then roll back.
    CollectAll,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abort" | "abort-on-first" => Ok(Self::AbortOnFirst),
            "collect" | "collect-all" => Ok(Self::CollectAll),
            other => Err(format!("unknown load policy {other}")),
        }
    }
}

#[derive(Debug)]
pub struct LoadReport {
    /// Rows handed to the insert statement.
    pub attempted: usize,
    /// Rows present after the transaction ended (0 after a rollback).
    pub committed: usize,
    pub failures: Vec<RowFailure>,
    pub elapsed: Duration,
    /// Id of the last record inserted, kept for the point-lookup query.
    pub last_id: Option<String>,
}

impl LoadReport {
    pub fn is_committed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Insert `records` in a single transaction.
///
/// Returns `Err` only when the transaction or statement cannot be set up;
/// row failures are reported in [`LoadReport::failures`].
pub fn load_records<I>(conn: &mut Connection, records: I, policy: FailurePolicy) -> Result<LoadReport>
where
    I: IntoIterator<Item = Record>,
{
    let start = Instant::now();
    let tx = conn
        .transaction()
        .map_err(BenchError::setup("begin load transaction"))?;

    let mut attempted = 0;
    let mut failures = Vec::new();
    let mut last_id = None;
    {
        let mut stmt = tx
            .prepare(INSERT_RECORD)
            .map_err(BenchError::setup("prepare insert"))?;

        for record in records {
            attempted += 1;
            let outcome = record.payload.to_json().and_then(|data| {
                stmt.execute(params![record.id, record.name, data])
                    .map_err(BenchError::from)
            });

            match outcome {
                Ok(_) => last_id = Some(record.id),
                Err(cause) => {
                    warn!("Insert of record {} failed: {cause}", record.index);
                    failures.push(RowFailure {
                        index: record.index,
                        cause,
                    });
                    if policy == FailurePolicy::AbortOnFirst {
                        break;
                    }
                }
            }
        }
    }

    let committed = if failures.is_empty() {
        tx.commit().map_err(BenchError::setup("commit load"))?;
        attempted
    } else {
        tx.rollback().map_err(BenchError::setup("roll back load"))?;
        warn!(
            "Rolled back load of {attempted} record(s) after {} failure(s)",
            failures.len()
        );
        last_id = None;
        0
    };

    let elapsed = start.elapsed();
    info!("Insert {committed} records took {elapsed:?}");

    Ok(LoadReport {
        attempted,
        committed,
        failures,
        elapsed,
        last_id,
    })
}
