//! Repeated-sample query benchmarking.
//!
//! Each query declares the shape of its result rows up front ([`RowShape`]);
//! a statement whose column count disagrees is reported as a failure, never
//! decoded with a guessed arity.
//!
//! A sample covers statement preparation, execution and stepping to the
//! first row. For sorted or aggregated queries that first step already does
//! all the work. Cursors of all but the final iteration are released as
//! soon as their sample is taken; the final cursor is handed to the caller
//! after its timing window has closed, so printing rows never counts.

use crate::error::{BenchError, QueryFailure};
use log::{debug, info, warn};
use rusqlite::{Connection, Row, Rows};
use std::fmt;
use std::time::{Duration, Instant};

/// Column layout of a query's result rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowShape {
    /// `id TEXT, data TEXT`
    Record,
    /// One nullable text column.
    Value,
    /// `key TEXT NULL, count INTEGER`
    Count,
    /// `id TEXT, data TEXT, related_id TEXT NULL`
    RecordWithRelation,
}

impl RowShape {
    pub fn arity(self) -> usize {
        match self {
            RowShape::Value => 1,
            RowShape::Record | RowShape::Count => 2,
            RowShape::RecordWithRelation => 3,
        }
    }

    fn decode(self, row: &Row<'_>) -> rusqlite::Result<ResultRow> {
        Ok(match self {
            RowShape::Record => ResultRow::Record {
                id: row.get(0)?,
                data: row.get(1)?,
            },
            RowShape::Value => ResultRow::Value(row.get(0)?),
            RowShape::Count => ResultRow::Count {
                key: row.get(0)?,
                count: row.get(1)?,
            },
            RowShape::RecordWithRelation => ResultRow::RecordWithRelation {
                id: row.get(0)?,
                data: row.get(1)?,
                related_id: row.get(2)?,
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultRow {
    Record {
        id: String,
        data: String,
    },
    Value(Option<String>),
    Count {
        key: Option<String>,
        count: i64,
    },
    RecordWithRelation {
        id: String,
        data: String,
        related_id: Option<String>,
    },
}

impl fmt::Display for ResultRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_null(v: &Option<String>) -> &str {
            v.as_deref().unwrap_or("NULL")
        }
        match self {
            ResultRow::Record { id, data } => write!(f, "{id} {data}"),
            ResultRow::Value(v) => write!(f, "{}", or_null(v)),
            ResultRow::Count { key, count } => write!(f, "{} {count}", or_null(key)),
            ResultRow::RecordWithRelation {
                id,
                data,
                related_id,
            } => write!(f, "{id} {data} {}", or_null(related_id)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BenchQuery {
    pub description: String,
    pub sql: String,
    pub shape: RowShape,
    /// Print rows even when result printing is disabled for the run.
    pub always_print: bool,
}

impl BenchQuery {
    pub fn new(description: impl Into<String>, sql: impl Into<String>, shape: RowShape) -> Self {
        Self {
            description: description.into(),
            sql: sql.into(),
            shape,
            always_print: false,
        }
    }

    pub fn always_printed(mut self) -> Self {
        self.always_print = true;
        self
    }
}

/// The fixed query battery. `sample_id` is an id known to exist (the last
/// record loaded) for the point lookup.
pub fn standard_battery(sample_id: &str) -> Vec<BenchQuery> {
    vec![
        BenchQuery::new(
            "Find a record using the UID",
            format!(
                "SELECT id, data FROM resources WHERE id = '{}'",
                sample_id.replace('\'', "''")
            ),
            RowShape::Record,
        )
        .always_printed(),
        BenchQuery::new(
            "Find records with counter less than 5",
            "SELECT id, data FROM resources WHERE json_extract(data, '$.counter') <= 5 LIMIT 5",
            RowShape::Record,
        ),
        BenchQuery::new(
            "Find records with a city name starting with `New`",
            "SELECT id, data FROM resources WHERE json_extract(data, '$.city') LIKE 'new%' LIMIT 10",
            RowShape::Record,
        ),
        BenchQuery::new(
            "Find all the values for the field 'color'",
            "SELECT DISTINCT json_extract(resources.data, '$.color') FROM resources",
            RowShape::Value,
        ),
        BenchQuery::new(
            "Find count of all values for the field 'kind'",
            "SELECT json_extract(resources.data, '$.kind') AS kind, \
             count(json_extract(resources.data, '$.kind')) AS count \
             FROM resources GROUP BY kind ORDER BY count DESC",
            RowShape::Count,
        ),
        BenchQuery::new(
            "Find count of all values for the field 'kind' using subquery",
            "SELECT kind, count(*) AS count FROM \
             (SELECT json_extract(resources.data, '$.kind') AS kind FROM resources) \
             GROUP BY kind ORDER BY count DESC",
            RowShape::Count,
        ),
        BenchQuery::new(
            "Find records together with their related record",
            "SELECT resources.id, resources.data, relations.related_id FROM resources \
             JOIN relations ON relations.resource_id = resources.id LIMIT 10",
            RowShape::RecordWithRelation,
        ),
        BenchQuery::new(
            "Count relation edges without a related record",
            "SELECT 'dangling', count(*) FROM relations WHERE related_id IS NULL",
            RowShape::Count,
        ),
    ]
}

/// Open result stream of one query execution.
pub struct ResultCursor<'stmt> {
    rows: Rows<'stmt>,
    shape: RowShape,
    pending: Option<ResultRow>,
    read: usize,
}

impl<'stmt> ResultCursor<'stmt> {
    /// Wrap `rows` and step to the first row.
    fn open(mut rows: Rows<'stmt>, shape: RowShape) -> rusqlite::Result<Self> {
        let pending = match rows.next()? {
            Some(row) => Some(shape.decode(row)?),
            None => None,
        };
        Ok(Self {
            rows,
            shape,
            pending,
            read: 0,
        })
    }

    pub fn shape(&self) -> RowShape {
        self.shape
    }

    pub fn next_row(&mut self) -> rusqlite::Result<Option<ResultRow>> {
        let row = match self.pending.take() {
            Some(row) => Some(row),
            None => match self.rows.next()? {
                Some(row) => Some(self.shape.decode(row)?),
                None => None,
            },
        };
        if row.is_some() {
            self.read += 1;
        }
        Ok(row)
    }

    /// Rows handed out so far.
    pub fn rows_read(&self) -> usize {
        self.read
    }
}

#[derive(Debug)]
pub struct QueryReport {
    pub description: String,
    pub sql: String,
    pub samples: Vec<Duration>,
    /// Iterations that produced no sample.
    pub failures: Vec<QueryFailure>,
    /// Rows the consumer read from the final cursor.
    pub rows_consumed: usize,
    /// Error returned by the consumer of the final cursor. The final
    /// sample itself still counts.
    pub consume_error: Option<BenchError>,
}

impl QueryReport {
    fn new(query: &BenchQuery) -> Self {
        Self {
            description: query.description.clone(),
            sql: query.sql.clone(),
            samples: Vec::new(),
            failures: Vec::new(),
            rows_consumed: 0,
            consume_error: None,
        }
    }

    /// Arithmetic mean of the successful samples.
    pub fn mean(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total: Duration = self.samples.iter().sum();
        Some(total / self.samples.len() as u32)
    }

    pub fn min(&self) -> Option<Duration> {
        self.samples.iter().min().copied()
    }

    pub fn max(&self) -> Option<Duration> {
        self.samples.iter().max().copied()
    }

    /// Nearest-rank percentile over the successful samples.
    pub fn percentile(&self, pct: f64) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let mut sorted = self.samples.clone();
        sorted.sort();
        let idx = ((pct / 100.0) * (sorted.len() - 1) as f64).round() as usize;
        Some(sorted[idx.min(sorted.len() - 1)])
    }
}

/// Run `query` `repeat` times and collect one sample per successful run.
///
/// `consume` receives the final iteration's cursor after that iteration's
/// timing window. It is not called if the final iteration fails; an error it
/// returns goes to [`QueryReport::consume_error`].
pub fn benchmark_query<F>(conn: &Connection, query: &BenchQuery, repeat: usize, consume: F) -> QueryReport
where
    F: FnOnce(&mut ResultCursor<'_>) -> rusqlite::Result<()>,
{
    let repeat = repeat.max(1);
    let mut report = QueryReport::new(query);
    let mut consume = Some(consume);

    for iteration in 0..repeat {
        let consumer = if iteration + 1 == repeat {
            consume.take()
        } else {
            None
        };
        match sample(conn, query, iteration, consumer, &mut report) {
            Ok(elapsed) => {
                debug!("{}: iteration {iteration} took {elapsed:?}", query.description);
                report.samples.push(elapsed);
            }
            Err(failure) => {
                warn!("{}: {failure}", query.description);
                report.failures.push(failure);
            }
        }
    }

    if let Some(mean) = report.mean() {
        info!(
            "{}: mean {mean:?} over {} sample(s)",
            query.description,
            report.samples.len()
        );
    }
    report
}

fn sample<F>(
    conn: &Connection,
    query: &BenchQuery,
    iteration: usize,
    consumer: Option<F>,
    report: &mut QueryReport,
) -> Result<Duration, QueryFailure>
where
    F: FnOnce(&mut ResultCursor<'_>) -> rusqlite::Result<()>,
{
    let fail = |cause: BenchError| QueryFailure { iteration, cause };

    let start = Instant::now();
    let mut stmt = conn
        .prepare_cached(&query.sql)
        .map_err(|e| fail(e.into()))?;

    let actual = stmt.column_count();
    let expected = query.shape.arity();
    if actual != expected {
        return Err(fail(BenchError::ShapeMismatch { expected, actual }));
    }

    let rows = stmt.query([]).map_err(|e| fail(e.into()))?;
    let mut cursor = ResultCursor::open(rows, query.shape).map_err(|e| fail(e.into()))?;
    let elapsed = start.elapsed();

    if let Some(consume) = consumer {
        let outcome = consume(&mut cursor);
        report.rows_consumed = cursor.rows_read();
        if let Err(e) = outcome {
            warn!("{}: reading results failed: {e}", query.description);
            report.consume_error = Some(e.into());
        }
    }

    Ok(elapsed)
}

/// Drain `cursor`, printing every row.
pub fn print_rows(cursor: &mut ResultCursor<'_>) -> rusqlite::Result<()> {
    while let Some(row) = cursor.next_row()? {
        println!("\t {row}");
    }
    Ok(())
}

/// Read nothing; the cursor is simply released.
pub fn discard_rows(_cursor: &mut ResultCursor<'_>) -> rusqlite::Result<()> {
    Ok(())
}
