//! Phase timings and memory snapshots collected over a run.

use docbench_core::memory::{self, MemorySnapshot};
use log::info;
use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize)]
pub struct PhaseTiming {
    pub name: String,
    #[serde(serialize_with = "serialize_micros")]
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabeledSnapshot {
    pub label: String,
    pub memory: MemorySnapshot,
}

#[derive(Debug, Default, Serialize)]
pub struct Metrics {
    phases: Vec<PhaseTiming>,
    memory: Vec<LabeledSnapshot>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_phase(&mut self, name: impl Into<String>, elapsed: Duration) {
        let name = name.into();
        info!("Phase {name} took {elapsed:?}");
        self.phases.push(PhaseTiming { name, elapsed });
    }

    /// Run `f` and record how long it took under `name`.
    pub fn time_phase<T>(&mut self, name: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let value = f();
        self.record_phase(name, start.elapsed());
        value
    }

    pub fn snapshot_memory(&mut self, label: impl Into<String>) -> MemorySnapshot {
        let snapshot = memory::snapshot();
        self.memory.push(LabeledSnapshot {
            label: label.into(),
            memory: snapshot,
        });
        snapshot
    }

    pub fn phases(&self) -> &[PhaseTiming] {
        &self.phases
    }

    pub fn phase(&self, name: &str) -> Option<Duration> {
        self.phases
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.elapsed)
    }

    pub fn memory_snapshots(&self) -> &[LabeledSnapshot] {
        &self.memory
    }

    pub fn total_elapsed(&self) -> Duration {
        self.phases.iter().map(|p| p.elapsed).sum()
    }
}

pub(crate) fn serialize_micros<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_micros().min(u64::MAX as u128) as u64)
}
