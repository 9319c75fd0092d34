//! Sequencing of the benchmark phases.
//!
//! generate + load → create name index → build relations → drop name index
//! → query battery. Each phase finishes before the next starts.

use crate::config::BenchConfig;
use crate::error::{BenchError, Result};
use crate::fake::{FakeSource, SyntheticSource};
use crate::generator::DatasetGenerator;
use crate::index::IndexManager;
use crate::loader::{load_records, LoadReport};
use crate::metrics::Metrics;
use crate::query::{benchmark_query, discard_rows, print_rows, standard_battery, QueryReport};
use crate::relations::{build_relations, RelationPlan, RelationReport};
use crate::store::{create_schema, open_store};
use log::{info, warn};
use rusqlite::Connection;

pub const PHASE_LOAD: &str = "generate + load";
pub const PHASE_CREATE_INDEX: &str = "create name index";
pub const PHASE_RELATIONS: &str = "build relations";
pub const PHASE_DROP_INDEX: &str = "drop name index";

#[derive(Debug)]
pub struct RunOutcome {
    pub total_records: usize,
    pub load: LoadReport,
    pub relations: RelationReport,
    pub queries: Vec<QueryReport>,
    pub metrics: Metrics,
}

/// Open the configured store and run every phase.
pub fn run(config: &BenchConfig) -> Result<RunOutcome> {
    config.validate()?;
    let mut conn = open_store(config.db_path.as_deref())?;
    create_schema(&conn)?;
    run_on(&mut conn, config, FakeSource::from_seed_option(config.seed))
}

/// Run every phase against an already created schema.
pub fn run_on<S: SyntheticSource>(
    conn: &mut Connection,
    config: &BenchConfig,
    source: S,
) -> Result<RunOutcome> {
    let mut metrics = Metrics::new();

    info!("Generating {} records", config.total_records);
    let generator = DatasetGenerator::new(config.total_records, source);
    let load = load_records(conn, generator, config.load_policy)?;
    metrics.record_phase(PHASE_LOAD, load.elapsed);
    if !load.is_committed() {
        return Err(BenchError::LoadRolledBack(load.failures));
    }
    metrics.snapshot_memory("after load");

    let index = IndexManager::default();
    metrics.time_phase(PHASE_CREATE_INDEX, || index.create_name_index(conn))?;

    let plan = RelationPlan::new(
        config.relation_start,
        config.total_records,
        config.offsets.clone(),
    );
    let relations = build_relations(conn, &plan, config.dangling);
    if let Ok(report) = &relations {
        metrics.record_phase(PHASE_RELATIONS, report.elapsed);
    }
    let dropped = metrics.time_phase(PHASE_DROP_INDEX, || index.drop_name_index(conn));
    let relations = relations?;
    dropped?;
    if !relations.failures.is_empty() {
        warn!("{} relation edge(s) skipped on lookup errors", relations.failures.len());
    }

    let sample_id = load.last_id.clone().unwrap_or_default();
    let mut queries = Vec::new();
    for query in standard_battery(&sample_id) {
        info!("DESCRIPTION: {}", query.description);
        info!("QUERY      : {}", query.sql);
        let print = config.print_results || query.always_print;
        let report = benchmark_query(conn, &query, config.repeat, |cursor| {
            if print {
                print_rows(cursor)
            } else {
                discard_rows(cursor)
            }
        });
        if let Some(mean) = report.mean() {
            metrics.record_phase(format!("query: {}", query.description), mean);
        }
        queries.push(report);
    }
    metrics.snapshot_memory("after queries");

    Ok(RunOutcome {
        total_records: config.total_records,
        load,
        relations,
        queries,
        metrics,
    })
}
