//! Report module: prints the human-readable run report and builds the
//! serializable summary.

use crate::metrics::{serialize_micros, LabeledSnapshot, PhaseTiming};
use crate::pipeline::RunOutcome;
use crate::query::QueryReport;
use docbench_core::memory::{to_mib, MemorySnapshot};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

fn fmt_opt(d: Option<Duration>) -> String {
    d.map(|d| format!("{d:?}")).unwrap_or_else(|| "-".to_string())
}

fn fmt_mib(v: Option<u64>) -> String {
    v.map(|b| format!("{} MiB", to_mib(b)))
        .unwrap_or_else(|| "n/a".to_string())
}

fn print_memory(label: &str, m: &MemorySnapshot) {
    println!("\n  Memory usage ({label}):");
    if m.is_tracking() {
        println!("    Live heap   = {} MiB", to_mib(m.allocated));
        println!("    Allocated   = {} MiB", to_mib(m.total_allocated));
        println!("    Allocations = {}", m.allocations);
    } else {
        println!("    Live heap   = n/a (tracking allocator not installed)");
    }
    println!("    Resident    = {}", fmt_mib(m.reserved));
    println!(
        "    GC cycles   = {}",
        m.reclamation_cycles
            .map(|n| n.to_string())
            .unwrap_or_else(|| "n/a".to_string())
    );
}

fn print_query(q: &QueryReport) {
    println!("\n  {}", q.description);
    println!("  {}", "-".repeat(60));
    println!("  Query:    {}", q.sql);
    println!("  Samples:  {}", q.samples.len());
    println!("  Mean:     {:>14}", fmt_opt(q.mean()));
    println!("  Min:      {:>14}", fmt_opt(q.min()));
    println!("  p50:      {:>14}", fmt_opt(q.percentile(50.0)));
    println!("  Max:      {:>14}", fmt_opt(q.max()));
    if !q.failures.is_empty() {
        println!("  Failures: {}", q.failures.len());
        for f in &q.failures {
            println!("    {f}");
        }
    }
    if let Some(e) = &q.consume_error {
        println!("  Reading results failed: {e}");
    }
}

/// Print a formatted report of a completed run.
pub fn print_report(outcome: &RunOutcome) {
    println!("\n{}", "=".repeat(80));
    println!("  SQLite JSON Document Benchmark Report");
    println!("  Records: {}", outcome.total_records);
    println!("{}", "=".repeat(80));

    println!("\n  Phase timings:");
    println!("  {:52} {:>14}", "Phase", "Elapsed");
    println!("  {}", "-".repeat(67));
    for p in outcome.metrics.phases() {
        println!("  {:52} {:>14}", p.name, format!("{:?}", p.elapsed));
    }

    let rel = &outcome.relations;
    println!("\n  Relations:");
    println!("    Inserted = {}", rel.edges_inserted);
    println!("    Dangling = {}", rel.dangling);
    println!("    Dropped  = {}", rel.dropped);
    println!("    Lookup failures = {}", rel.failures.len());

    println!("\n{}", "=".repeat(80));
    println!("  Benchmark queries");
    for q in &outcome.queries {
        print_query(q);
    }

    for s in outcome.metrics.memory_snapshots() {
        print_memory(&s.label, &s.memory);
    }

    println!("\n{}", "=".repeat(80));

    // Summary table
    if outcome.queries.len() >= 2 {
        println!("\n  Query Summary:");
        println!("  {:52} {:>12} {:>8}", "Query", "Mean", "Failed");
        println!("  {}", "-".repeat(74));
        for q in &outcome.queries {
            println!(
                "  {:52} {:>12} {:>8}",
                truncate(&q.description, 52),
                fmt_opt(q.mean()),
                q.failures.len()
            );
        }
    }

    println!();
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[derive(Debug, Serialize)]
pub struct QuerySummary {
    pub description: String,
    pub sql: String,
    pub samples_us: Vec<u64>,
    pub mean_us: Option<u64>,
    pub failures: Vec<String>,
    pub rows_consumed: usize,
    pub consume_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub total_records: usize,
    pub records_committed: usize,
    pub relation_edges: usize,
    pub dangling_edges: usize,
    pub dropped_edges: usize,
    pub lookup_failures: usize,
    pub phases: Vec<PhaseTiming>,
    pub queries: Vec<QuerySummary>,
    pub memory: Vec<LabeledSnapshot>,
    #[serde(serialize_with = "serialize_micros")]
    pub total_elapsed: Duration,
}

fn micros(d: Duration) -> u64 {
    d.as_micros().min(u64::MAX as u128) as u64
}

impl From<&RunOutcome> for RunSummary {
    fn from(outcome: &RunOutcome) -> Self {
        let queries = outcome
            .queries
            .iter()
            .map(|q| QuerySummary {
                description: q.description.clone(),
                sql: q.sql.clone(),
                samples_us: q.samples.iter().copied().map(micros).collect(),
                mean_us: q.mean().map(micros),
                failures: q.failures.iter().map(ToString::to_string).collect(),
                rows_consumed: q.rows_consumed,
                consume_error: q.consume_error.as_ref().map(ToString::to_string),
            })
            .collect();

        RunSummary {
            total_records: outcome.total_records,
            records_committed: outcome.load.committed,
            relation_edges: outcome.relations.edges_inserted,
            dangling_edges: outcome.relations.dangling,
            dropped_edges: outcome.relations.dropped,
            lookup_failures: outcome.relations.failures.len(),
            phases: outcome.metrics.phases().to_vec(),
            queries,
            memory: outcome.metrics.memory_snapshots().to_vec(),
            total_elapsed: outcome.metrics.total_elapsed(),
        }
    }
}

/// Write the run summary as pretty-printed JSON.
pub fn write_json(outcome: &RunOutcome, path: &Path) -> anyhow::Result<()> {
    let summary = RunSummary::from(outcome);
    let json = serde_json::to_string_pretty(&summary)?;
    fs::write(path, json)?;
    Ok(())
}
