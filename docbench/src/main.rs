//! Benchmark runner that prints the formatted report.
//!
//! Configuration comes from `DOCBENCH_*` environment variables, optionally
//! provided through a `.env` file in the working directory.
//!
//! Usage:
//!   cargo run --release
//!   DOCBENCH_TOTAL_RECORDS=50000 DOCBENCH_PRINT_RESULTS=1 cargo run --release
//!   DOCBENCH_HOLD_OPEN=1 cargo run --release   # park afterwards for external memory tools

use anyhow::Context;
use docbench::config::BenchConfig;
use docbench::pipeline;
use docbench::report::{print_report, write_json};
use docbench_core::memory::TrackingAllocator;
use std::process;

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator;

fn hold_open() -> ! {
    log::info!("Holding process open for inspection (pid {}). Ctrl-C to exit.", process::id());
    loop {
        std::thread::park();
    }
}

fn run() -> anyhow::Result<BenchConfig> {
    let config = BenchConfig::from_env().context("reading configuration")?;

    docbench_core::initialize_logger(
        config.log_level,
        config.log_file.as_deref().and_then(|p| p.to_str()),
    )?;

    println!("Running SQLite JSON document benchmark...");
    println!("  Records:  {}", config.total_records);
    println!("  Repeat:   {}", config.repeat);
    println!("  Offsets:  {:?}", config.offsets);
    match &config.db_path {
        Some(path) => println!("  Store:    {}", path.display()),
        None => println!("  Store:    :memory:"),
    }

    let outcome = pipeline::run(&config).context("benchmark run")?;
    print_report(&outcome);

    if let Some(path) = &config.report_json {
        write_json(&outcome, path)
            .with_context(|| format!("writing JSON report to {}", path.display()))?;
        log::info!("Wrote JSON report to {}", path.display());
    }

    Ok(config)
}

fn main() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Ignoring unreadable .env file: {e}");
        }
    }

    match run() {
        Ok(config) if config.hold_open => hold_open(),
        Ok(_) => {}
        Err(e) => {
            eprintln!("docbench failed: {e:#}");
            process::exit(1);
        }
    }
}
