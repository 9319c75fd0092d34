//! Synthetic dataset generation.
//!
//! Records are produced lazily. Only `name` is a function of the generation
//! index; `id` and the sampled payload fields come from the
//! [`SyntheticSource`] and differ between runs unless the source is seeded.

use crate::error::Result;
use crate::fake::SyntheticSource;
use serde::Serialize;

pub const NUMBER_MIN: i64 = 1;
pub const NUMBER_MAX: i64 = 999_999;

pub const LABELS: [&str; 5] = [
    "label1=value1",
    "label2=value2",
    "label3=value3",
    "label4=value4",
    "label5=value5",
];

/// Name of the record generated at index `i`.
///
/// Defined for negative indices too so relation targets outside the dataset
/// can still be looked up (and not found).
pub fn record_name(i: i64) -> String {
    format!("name-{i}")
}

/// JSON document stored in the `data` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payload {
    pub kind: &'static str,
    pub counter: u64,
    pub number: i64,
    pub boolean: bool,
    pub beer: &'static str,
    pub car: &'static str,
    pub color: &'static str,
    pub city: &'static str,
    pub label: [&'static str; 5],
}

impl Payload {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub index: usize,
    pub id: String,
    pub name: String,
    pub payload: Payload,
}

/// Lazy, finite stream of `total` records with indices `0..total`.
pub struct DatasetGenerator<S> {
    source: S,
    next: usize,
    total: usize,
}

impl<S: SyntheticSource> DatasetGenerator<S> {
    pub fn new(total: usize, source: S) -> Self {
        Self {
            source,
            next: 0,
            total,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    fn generate(&mut self, index: usize) -> Record {
        let source = &mut self.source;
        Record {
            index,
            id: source.unique_token(),
            name: record_name(index as i64),
            payload: Payload {
                kind: source.color(),
                counter: index as u64,
                number: source.number(NUMBER_MIN, NUMBER_MAX),
                boolean: source.boolean(),
                beer: source.beer(),
                car: source.car(),
                color: source.color(),
                city: source.city(),
                label: LABELS,
            },
        }
    }
}

impl<S: SyntheticSource> Iterator for DatasetGenerator<S> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        if self.next >= self.total {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(self.generate(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.next;
        (remaining, Some(remaining))
    }
}

impl<S: SyntheticSource> ExactSizeIterator for DatasetGenerator<S> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeSource;
    use std::collections::HashSet;

    #[test]
    fn names_follow_index() {
        assert_eq!(record_name(0), "name-0");
        assert_eq!(record_name(41), "name-41");
        assert_eq!(record_name(-3), "name--3");
    }

    #[test]
    fn yields_exactly_total_records_in_order() {
        let records: Vec<Record> = DatasetGenerator::new(25, FakeSource::seeded(1)).collect();
        assert_eq!(records.len(), 25);
        for (i, r) in records.iter().enumerate() {
            assert_eq!(r.index, i);
            assert_eq!(r.payload.counter, i as u64);
            assert_eq!(r.name, format!("name-{i}"));
        }
    }

    #[test]
    fn names_reproduce_across_runs_while_ids_do_not() {
        let a: Vec<Record> = DatasetGenerator::new(200, FakeSource::from_entropy()).collect();
        let b: Vec<Record> = DatasetGenerator::new(200, FakeSource::from_entropy()).collect();

        let names_a: Vec<&str> = a.iter().map(|r| r.name.as_str()).collect();
        let names_b: Vec<&str> = b.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names_a, names_b);

        let distinct: HashSet<&str> = names_a.iter().copied().collect();
        assert_eq!(distinct.len(), names_a.len());

        let ids_a: HashSet<&str> = a.iter().map(|r| r.id.as_str()).collect();
        assert!(b.iter().all(|r| !ids_a.contains(r.id.as_str())));
    }

    #[test]
    fn size_hint_counts_down() {
        let mut generator = DatasetGenerator::new(3, FakeSource::seeded(2));
        assert_eq!(generator.len(), 3);
        generator.next();
        assert_eq!(generator.len(), 2);
        generator.by_ref().for_each(drop);
        assert_eq!(generator.len(), 0);
        assert!(generator.next().is_none());
    }

    #[test]
    fn payload_serializes_every_field() {
        let record = DatasetGenerator::new(1, FakeSource::seeded(5))
            .next()
            .unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&record.payload.to_json().unwrap()).unwrap();

        for key in [
            "kind", "counter", "number", "boolean", "beer", "car", "color", "city", "label",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["counter"], 0);
        assert_eq!(json["label"].as_array().unwrap().len(), 5);
        assert_eq!(json["label"][4], "label5=value5");
        let number = json["number"].as_i64().unwrap();
        assert!((NUMBER_MIN..=NUMBER_MAX).contains(&number));
    }
}
