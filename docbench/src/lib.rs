//! SQLite JSON Document Benchmark
//!
//! Measures how an embedded SQLite store copes with JSON-bearing records:
//!
//! - **Load**: synthetic records bulk-inserted through one prepared
//!   statement inside one transaction
//! - **Relations**: an offset-derived edge graph resolved through name
//!   lookups against a temporary unique index
//! - **Queries**: a fixed battery of `json_extract` queries, each sampled
//!   several times and averaged
//!
//! Run the harness: `cargo run --release`
//! Run benchmarks: `cargo bench`
//! Run tests: `cargo test`

pub mod config;
pub mod error;
pub mod fake;
pub mod generator;
pub mod index;
pub mod loader;
pub mod metrics;
pub mod pipeline;
pub mod query;
pub mod relations;
pub mod report;
pub mod store;
