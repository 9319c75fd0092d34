//! Criterion benchmark harness: bulk load, relation construction and the
//! query battery at several dataset sizes.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use docbench::config::DEFAULT_OFFSETS;
use docbench::fake::FakeSource;
use docbench::generator::{DatasetGenerator, Record};
use docbench::index::IndexManager;
use docbench::loader::{load_records, FailurePolicy};
use docbench::query::{discard_rows, standard_battery};
use docbench::relations::{build_relations, DanglingPolicy, RelationPlan};
use docbench::store::{create_schema, open_store};
use rusqlite::Connection;
use std::time::Duration;

/// Dataset sizes to benchmark.
fn dataset_sizes() -> Vec<(&'static str, usize)> {
    vec![("1k", 1_000), ("10k", 10_000)]
}

fn empty_store() -> Connection {
    let conn = open_store(None).expect("Failed to open in-memory SQLite");
    create_schema(&conn).expect("Failed to create schema");
    conn
}

fn records(total: usize) -> Vec<Record> {
    DatasetGenerator::new(total, FakeSource::seeded(0xDEAD_BEEF)).collect()
}

/// Loaded store with relations built, plus the id of the last record.
fn setup_db(total: usize) -> (Connection, String) {
    let mut conn = empty_store();
    let report = load_records(&mut conn, records(total), FailurePolicy::AbortOnFirst)
        .expect("Failed to load records");
    let plan = RelationPlan::new(0, total, DEFAULT_OFFSETS.to_vec());
    IndexManager::default()
        .with_name_index(&mut conn, |conn| {
            build_relations(conn, &plan, DanglingPolicy::Persist)
        })
        .expect("Failed to build relations");
    (conn, report.last_id.expect("load committed"))
}

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load");
    group.sample_size(10);

    for (label, total) in dataset_sizes() {
        let data = records(total);
        group.bench_with_input(BenchmarkId::from_parameter(label), &data, |b, data| {
            b.iter_batched(
                || (empty_store(), data.clone()),
                |(mut conn, data)| {
                    load_records(&mut conn, data, FailurePolicy::AbortOnFirst).expect("load failed")
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_relations(c: &mut Criterion) {
    let mut group = c.benchmark_group("relations");
    group.sample_size(10);

    for (label, total) in dataset_sizes() {
        let data = records(total);
        let plan = RelationPlan::new(0, total, DEFAULT_OFFSETS.to_vec());
        group.bench_with_input(BenchmarkId::from_parameter(label), &plan, |b, plan| {
            b.iter_batched(
                || {
                    let mut conn = empty_store();
                    load_records(&mut conn, data.clone(), FailurePolicy::AbortOnFirst)
                        .expect("load failed");
                    conn
                },
                |mut conn| {
                    IndexManager::default()
                        .with_name_index(&mut conn, |conn| {
                            build_relations(conn, plan, DanglingPolicy::Persist)
                        })
                        .expect("relations failed")
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("queries");
    group.measurement_time(Duration::from_secs(10));

    for (label, total) in dataset_sizes() {
        let (conn, last_id) = setup_db(total);

        for (n, query) in standard_battery(&last_id).into_iter().enumerate() {
            let id = BenchmarkId::new(format!("q{n}"), label);
            group.bench_with_input(id, &query, |b, query| {
                b.iter(|| docbench::query::benchmark_query(&conn, query, 1, discard_rows));
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_load, bench_relations, bench_queries);
criterion_main!(benches);
