//! Run configuration.
//!
//! A [`BenchConfig`] is built once (defaults, then `DOCBENCH_*` environment
//! overrides) and handed to each phase.

use crate::error::{BenchError, Result};
use crate::loader::FailurePolicy;
use crate::relations::DanglingPolicy;
use log::LevelFilter;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_TOTAL_RECORDS: usize = 500_000;
pub const DEFAULT_REPEAT: usize = 5;
pub const DEFAULT_DB_PATH: &str = "./benchmark.db";

/// Cyclic offset table used to derive relation targets.
pub const DEFAULT_OFFSETS: [i64; 11] = [-7, -3, -1, 1, 2, 3, 5, 8, 13, -11, 21];

#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub total_records: usize,
    pub print_results: bool,
    /// Samples per benchmarked query.
    pub repeat: usize,
    pub offsets: Vec<i64>,
    /// First generation index that gets a relation edge.
    pub relation_start: usize,
    pub dangling: DanglingPolicy,
    pub load_policy: FailurePolicy,
    /// `None` keeps the store in memory.
    pub db_path: Option<PathBuf>,
    /// Fixes payload sampling and ids; names are deterministic regardless.
    pub seed: Option<u64>,
    /// Park the process after reporting so external tools can inspect it.
    pub hold_open: bool,
    pub report_json: Option<PathBuf>,
    pub log_level: LevelFilter,
    pub log_file: Option<PathBuf>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            total_records: DEFAULT_TOTAL_RECORDS,
            print_results: false,
            repeat: DEFAULT_REPEAT,
            offsets: DEFAULT_OFFSETS.to_vec(),
            relation_start: 0,
            dangling: DanglingPolicy::Persist,
            load_policy: FailurePolicy::AbortOnFirst,
            db_path: Some(PathBuf::from(DEFAULT_DB_PATH)),
            seed: None,
            hold_open: false,
            report_json: None,
            log_level: LevelFilter::Info,
            log_file: None,
        }
    }
}

impl BenchConfig {
    /// Small in-memory configuration for tests and criterion benches.
    pub fn in_memory(total_records: usize) -> Self {
        Self {
            total_records,
            db_path: None,
            seed: Some(0x5EED_D0C5),
            ..Self::default()
        }
    }

    /// Defaults overridden by `DOCBENCH_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`BenchConfig::from_env`] but reading from an arbitrary source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("DOCBENCH_TOTAL_RECORDS") {
            config.total_records = parse_value("DOCBENCH_TOTAL_RECORDS", &v)?;
        }
        if let Some(v) = lookup("DOCBENCH_PRINT_RESULTS") {
            config.print_results = parse_flag("DOCBENCH_PRINT_RESULTS", &v)?;
        }
        if let Some(v) = lookup("DOCBENCH_REPEAT") {
            config.repeat = parse_value("DOCBENCH_REPEAT", &v)?;
        }
        if let Some(v) = lookup("DOCBENCH_OFFSETS") {
            config.offsets = parse_offsets(&v)?;
        }
        if let Some(v) = lookup("DOCBENCH_RELATION_START") {
            config.relation_start = parse_value("DOCBENCH_RELATION_START", &v)?;
        }
        if let Some(v) = lookup("DOCBENCH_DANGLING") {
            config.dangling = parse_value("DOCBENCH_DANGLING", &v)?;
        }
        if let Some(v) = lookup("DOCBENCH_LOAD_POLICY") {
            config.load_policy = parse_value("DOCBENCH_LOAD_POLICY", &v)?;
        }
        if let Some(v) = lookup("DOCBENCH_DB_PATH") {
            let v = v.trim();
            config.db_path = if v.is_empty() || v == ":memory:" {
                None
            } else {
                Some(PathBuf::from(v))
            };
        }
        if let Some(v) = lookup("DOCBENCH_SEED") {
            config.seed = Some(parse_value("DOCBENCH_SEED", &v)?);
        }
        if let Some(v) = lookup("DOCBENCH_HOLD_OPEN") {
            config.hold_open = parse_flag("DOCBENCH_HOLD_OPEN", &v)?;
        }
        if let Some(v) = lookup("DOCBENCH_REPORT_JSON") {
            config.report_json = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("DOCBENCH_LOG_LEVEL") {
            config.log_level = docbench_core::parse_level(&v)
                .ok_or_else(|| BenchError::Config(format!("DOCBENCH_LOG_LEVEL={v}")))?;
        }
        if let Some(v) = lookup("DOCBENCH_LOG_FILE") {
            config.log_file = Some(PathBuf::from(v));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.total_records == 0 {
            return Err(BenchError::Config("total_records must be at least 1".into()));
        }
        if self.repeat == 0 {
            return Err(BenchError::Config("repeat must be at least 1".into()));
        }
        if self.offsets.is_empty() {
            return Err(BenchError::Config("offset table must not be empty".into()));
        }
        if self.relation_start > self.total_records {
            return Err(BenchError::Config(format!(
                "relation_start {} exceeds total_records {}",
                self.relation_start, self.total_records
            )));
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| BenchError::Config(format!("{key}={raw}")))
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(BenchError::Config(format!("{key}={raw}"))),
    }
}

fn parse_offsets(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_value("DOCBENCH_OFFSETS", s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<BenchConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BenchConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_are_valid() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.total_records, DEFAULT_TOTAL_RECORDS);
        assert_eq!(config.repeat, DEFAULT_REPEAT);
        assert_eq!(config.offsets.len(), 11);
        assert!(config.offsets.iter().any(|&o| o < 0));
        assert!(config.offsets.iter().any(|&o| o > 0));
        assert!(!config.print_results);
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("DOCBENCH_TOTAL_RECORDS", "1000"),
            ("DOCBENCH_PRINT_RESULTS", "true"),
            ("DOCBENCH_REPEAT", "3"),
            ("DOCBENCH_OFFSETS", "1, -2,3"),
            ("DOCBENCH_DANGLING", "drop"),
            ("DOCBENCH_LOAD_POLICY", "collect"),
            ("DOCBENCH_DB_PATH", ":memory:"),
            ("DOCBENCH_SEED", "42"),
        ])
        .unwrap();
        assert_eq!(config.total_records, 1000);
        assert!(config.print_results);
        assert_eq!(config.repeat, 3);
        assert_eq!(config.offsets, vec![1, -2, 3]);
        assert_eq!(config.dangling, DanglingPolicy::Drop);
        assert_eq!(config.load_policy, FailurePolicy::CollectAll);
        assert_eq!(config.db_path, None);
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn zero_repeat_is_rejected() {
        let err = config_from(&[("DOCBENCH_REPEAT", "0")]).unwrap_err();
        assert!(matches!(err, BenchError::Config(_)));
    }

    #[test]
    fn empty_offsets_are_rejected() {
        assert!(config_from(&[("DOCBENCH_OFFSETS", " , ")]).is_err());
    }

    #[test]
    fn garbage_values_are_rejected() {
        assert!(config_from(&[("DOCBENCH_TOTAL_RECORDS", "lots")]).is_err());
        assert!(config_from(&[("DOCBENCH_PRINT_RESULTS", "maybe")]).is_err());
        assert!(config_from(&[("DOCBENCH_DANGLING", "keep")]).is_err());
    }

    #[test]
    fn relation_start_past_end_is_rejected() {
        let config = BenchConfig {
            relation_start: 11,
            ..BenchConfig::in_memory(10)
        };
        assert!(config.validate().is_err());
    }
}
