//! Relation graph derived from a cyclic offset table.
//!
//! Edge `i` links record `i` to record `i + offsets[i % offsets.len()]`.
//! Ids are random, so both endpoints are resolved back through the store by
//! name. A target outside the dataset resolves to nothing; whether such a
//! dangling edge is stored (with `NULL` in the empty slot) or skipped is the
//! caller's [`DanglingPolicy`].

use crate::error::{BenchError, LookupFailure, Result};
use crate::generator::record_name;
use log::{debug, info, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::str::FromStr;
use std::time::{Duration, Instant};

const LOOKUP_BY_NAME: &str = "SELECT id FROM resources WHERE name = ?1";
const INSERT_RELATION: &str = "INSERT INTO relations (resource_id, related_id) VALUES (?1, ?2)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DanglingPolicy {
    /// Store the edge with `NULL` for the missing endpoint.
    #[default]
    Persist,
    /// Skip edges with a missing endpoint.
    Drop,
}

impl FromStr for DanglingPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "persist" | "keep-null" => Ok(Self::Persist),
            "drop" | "skip" => Ok(Self::Drop),
            other => Err(format!("unknown dangling policy {other}")),
        }
    }
}

/// Which indices get an edge and how targets are derived.
#[derive(Debug, Clone)]
pub struct RelationPlan {
    /// First source index (inclusive).
    pub start: usize,
    /// Last source index (exclusive).
    pub end: usize,
    pub offsets: Vec<i64>,
}

impl RelationPlan {
    pub fn new(start: usize, end: usize, offsets: Vec<i64>) -> Self {
        Self {
            start,
            end,
            offsets,
        }
    }

    /// `(source, target)` index pairs in source order. Depends only on the
    /// plan, never on store contents.
    ///
    /// Targets saturate at the `i64` bounds; a saturated target lies outside
    /// the dataset and resolves to a dangling endpoint.
    pub fn edge_pairs(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        let m = self.offsets.len();
        (self.start..self.end)
            .filter(move |_| m > 0)
            .map(move |i| {
                let source = i as i64;
                (source, source.saturating_add(self.offsets[i % m]))
            })
    }
}

/// One derived edge. `None` marks an endpoint with no matching record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationEdge {
    pub source_index: i64,
    pub target_index: i64,
    pub source_id: Option<String>,
    pub related_id: Option<String>,
}

impl RelationEdge {
    pub fn is_dangling(&self) -> bool {
        self.source_id.is_none() || self.related_id.is_none()
    }
}

#[derive(Debug, Default)]
pub struct RelationReport {
    pub edges_inserted: usize,
    /// Edges with at least one absent endpoint (stored or not).
    pub dangling: usize,
    /// Dangling edges skipped under [`DanglingPolicy::Drop`].
    pub dropped: usize,
    /// Edges skipped because a lookup errored.
    pub failures: Vec<LookupFailure>,
    pub elapsed: Duration,
}

/// Resolve a record name to its id. No matching row is `Ok(None)`.
pub fn lookup_id(conn: &Connection, name: &str) -> rusqlite::Result<Option<String>> {
    let mut stmt = conn.prepare_cached(LOOKUP_BY_NAME)?;
    stmt.query_row([name], |row| row.get(0)).optional()
}

fn resolve(conn: &Connection, index: i64, edge: usize) -> std::result::Result<Option<String>, LookupFailure> {
    let name = record_name(index);
    lookup_id(conn, &name).map_err(|e| LookupFailure {
        index: edge,
        name,
        cause: BenchError::from(e),
    })
}

/// Resolve one edge. Exposed separately so callers can inspect edges
/// without writing them.
pub fn resolve_edge(
    conn: &Connection,
    edge: usize,
    (source_index, target_index): (i64, i64),
) -> std::result::Result<RelationEdge, LookupFailure> {
    Ok(RelationEdge {
        source_index,
        target_index,
        source_id: resolve(conn, source_index, edge)?,
        related_id: resolve(conn, target_index, edge)?,
    })
}

/// Derive and store all edges of `plan` in one transaction.
///
/// Expects a name index to be present for acceptable lookup cost; see
/// [`crate::index::IndexManager::with_name_index`].
pub fn build_relations(
    conn: &mut Connection,
    plan: &RelationPlan,
    policy: DanglingPolicy,
) -> Result<RelationReport> {
    let start = Instant::now();
    let mut report = RelationReport::default();

    let tx = conn
        .transaction()
        .map_err(BenchError::setup("begin relation transaction"))?;
    {
        let mut insert = tx
            .prepare(INSERT_RELATION)
            .map_err(BenchError::setup("prepare relation insert"))?;

        for (n, pair) in plan.edge_pairs().enumerate() {
            let edge = match resolve_edge(&tx, n, pair) {
                Ok(edge) => edge,
                Err(failure) => {
                    warn!("Skipping edge {n}: {failure}");
                    report.failures.push(failure);
                    continue;
                }
            };

            if edge.is_dangling() {
                report.dangling += 1;
                if policy == DanglingPolicy::Drop {
                    report.dropped += 1;
                    continue;
                }
                debug!(
                    "Dangling edge {} -> {}",
                    edge.source_index, edge.target_index
                );
            }

            insert.execute(params![edge.source_id, edge.related_id])?;
            report.edges_inserted += 1;
        }
    }
    tx.commit().map_err(BenchError::setup("commit relations"))?;

    report.elapsed = start.elapsed();
    info!(
        "Built {} relation edges ({} dangling, {} dropped) in {:?}",
        report.edges_inserted, report.dangling, report.dropped, report.elapsed
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_cycle_through_offsets() {
        let plan = RelationPlan::new(0, 7, vec![2, -1, 0]);
        let pairs: Vec<(i64, i64)> = plan.edge_pairs().collect();
        assert_eq!(
            pairs,
            vec![(0, 2), (1, 0), (2, 2), (3, 5), (4, 3), (5, 5), (6, 8)]
        );
    }

    #[test]
    fn pairs_respect_start() {
        let plan = RelationPlan::new(5, 8, vec![1]);
        let pairs: Vec<(i64, i64)> = plan.edge_pairs().collect();
        assert_eq!(pairs, vec![(5, 6), (6, 7), (7, 8)]);
    }

    #[test]
    fn pairs_are_stable_across_calls() {
        let plan = RelationPlan::new(0, 1_000, crate::config::DEFAULT_OFFSETS.to_vec());
        let a: Vec<_> = plan.edge_pairs().collect();
        let b: Vec<_> = plan.edge_pairs().collect();
        assert_eq!(a, b);
        assert_eq!(a.len(), 1_000);
    }

    #[test]
    fn extreme_offsets_saturate_instead_of_wrapping() {
        let plan = RelationPlan::new(0, 3, vec![i64::MAX, i64::MIN, -1]);
        let pairs: Vec<(i64, i64)> = plan.edge_pairs().collect();
        assert_eq!(pairs, vec![(0, i64::MAX), (1, i64::MIN + 1), (2, 1)]);

        let plan = RelationPlan::new(5, 6, vec![i64::MAX]);
        assert_eq!(plan.edge_pairs().next(), Some((5, i64::MAX)));
    }

    #[test]
    fn empty_offsets_yield_no_pairs() {
        let plan = RelationPlan::new(0, 10, Vec::new());
        assert_eq!(plan.edge_pairs().count(), 0);
    }

    #[test]
    fn dangling_detection() {
        let edge = RelationEdge {
            source_index: 9,
            target_index: 10,
            source_id: Some("a".into()),
            related_id: None,
        };
        assert!(edge.is_dangling());
    }

    #[test]
    fn policy_parses_from_text() {
        assert_eq!("persist".parse::<DanglingPolicy>(), Ok(DanglingPolicy::Persist));
        assert_eq!("DROP".parse::<DanglingPolicy>(), Ok(DanglingPolicy::Drop));
        assert!("maybe".parse::<DanglingPolicy>().is_err());
    }
}
