/*! Per-record preprocessing

A [Mapper] is a single worker: it owns its [ConsistencyGuard], its [KeyDeriver] and its [Emit]ter,
and processes records one at a time:

1. schema validation,
2. (append mode) time normalization and consistency check,
3. key derivation,
4. emission.
!*/
use log::{debug, error, warn};
use serde::Serialize;

use crate::config::{AppendSettings, ConfigurationContext, MismatchPolicy};
use crate::error::Error;
use crate::record::{Record, Schema};
use crate::time::TimeBucket;

use super::{ConsistencyGuard, Emit, KeyDeriver};

/// End of shard report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShardSummary {
    pub mapped: u64,
    pub baseline: Option<TimeBucket>,
    pub mismatches: u64,
    pub warned: bool,
}

pub struct Mapper<E: Emit> {
    append: Option<AppendSettings>,
    guard: ConsistencyGuard,
    deriver: KeyDeriver,
    emitter: E,
    mapped: u64,
}

impl<E: Emit> Mapper<E> {
    /// Set up a new worker.
    ///
    /// The guard starts baselined on the sample time value when there's one.
    pub fn new(config: &ConfigurationContext, emitter: E) -> Result<Self, Error> {
        let deriver = KeyDeriver::new(config)?;
        let append = config.append().cloned();
        let guard = match append.as_ref().and_then(AppendSettings::sample_bucket) {
            Some(sample) => ConsistencyGuard::with_baseline(sample.clone()),
            None => ConsistencyGuard::new(),
        };
        debug!(
            "mapper ready: layout {:?}, key schema {}",
            deriver.layout(),
            deriver.key_schema()
        );

        Ok(Self {
            append,
            guard,
            deriver,
            emitter,
            mapped: 0,
        })
    }

    /// Get a reference to the worker's guard.
    pub fn guard(&self) -> &ConsistencyGuard {
        &self.guard
    }

    pub fn key_schema(&self) -> &Schema {
        self.deriver.key_schema()
    }

    /// Process a single record.
    pub fn map(&mut self, record: Record) -> Result<(), Error> {
        self.deriver.validate(&record)?;

        if let Some(append) = &self.append {
            let value = record.get(append.time_column()).ok_or_else(|| {
                Error::Format(format!("no time column {} in record", append.time_column()))
            })?;
            let bucket = append.normalizer().normalize_value(value)?;

            if let Some(mismatch) = self.guard.check(&bucket) {
                match append.mismatch_policy() {
                    MismatchPolicy::Warn => warn!("{}", mismatch),
                    MismatchPolicy::Fail => {
                        error!("{}", mismatch);
                        return Err(Error::TimeMismatch {
                            baseline: mismatch.baseline.to_string(),
                            current: mismatch.current.to_string(),
                        });
                    }
                }
            }
        }

        let key = self.deriver.key_for(&record);
        if let Err(e) = self.emitter.emit(key, record) {
            error!("Exception when emitting pair on mapper!");
            return Err(e);
        }

        self.mapped += 1;
        Ok(())
    }

    /// Process every record of `records`, stopping on the first error.
    ///
    /// Returns the number of records processed by this call.
    pub fn map_all<I>(&mut self, records: I) -> Result<u64, Error>
    where
        I: IntoIterator<Item = Result<Record, Error>>,
    {
        let before = self.mapped;
        for record in records {
            self.map(record?)?;
        }
        Ok(self.mapped - before)
    }

    /// Current summary.
    pub fn summary(&self) -> ShardSummary {
        ShardSummary {
            mapped: self.mapped,
            baseline: self.guard.baseline().cloned(),
            mismatches: self.guard.mismatches(),
            warned: self.guard.warned(),
        }
    }

    /// End the worker, giving back its emitter.
    pub fn finish(self) -> (ShardSummary, E) {
        let summary = self.summary();
        (summary, self.emitter)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::config::{keys, ConfigurationContext, RawConfig};
    use crate::error::Error;
    use crate::processing::{structural_hash, GuardState, OutputKey};
    use crate::record::{Record, Value};

    use super::Mapper;

    const VALUE_SCHEMA: &str = r#"{"type": "record", "name": "event", "fields": [
        {"name": "a", "type": "long"},
        {"name": "b", "type": "long"},
        {"name": "ts", "type": "long"}
    ]}"#;

    // 2024-01-15T10:00, 2024-01-16T01:00, 2024-01-16T05:00
    const TS: [i64; 3] = [1_705_312_800_000, 1_705_366_800_000, 1_705_381_200_000];

    fn conf(entries: &[(&str, &str)]) -> ConfigurationContext {
        let mut raw: RawConfig = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        raw.insert(keys::MAP_OUTPUT_VALUE_SCHEMA.to_string(), VALUE_SCHEMA.to_string());
        ConfigurationContext::from_map(&raw).unwrap()
    }

    fn append_conf(extra: &[(&str, &str)]) -> ConfigurationContext {
        let mut entries = vec![
            (keys::IS_APPEND, "true"),
            (keys::TIME_COLUMN_CONFIG, "ts"),
            (keys::SEGMENT_TIME_FORMAT, "EPOCH"),
            (keys::SEGMENT_TIME_TYPE, "MILLISECONDS"),
            (keys::SEGMENT_PUSH_FREQUENCY, "daily"),
            (keys::TIME_COLUMN_VALUE, "1705276800000"),
        ];
        entries.extend_from_slice(extra);
        conf(&entries)
    }

    fn collector() -> Vec<(OutputKey, Record)> {
        Vec::new()
    }

    fn record(config: &ConfigurationContext, a: i64, b: i64, ts: i64) -> Record {
        Record::new(
            Arc::new(config.value_schema().clone()),
            vec![Value::Long(a), Value::Long(b), Value::Long(ts)],
        )
        .unwrap()
    }

    #[test]
    fn hash_key_without_sort_column() {
        let c = conf(&[]);
        let mut m = Mapper::new(&c, collector()).unwrap();
        let r = record(&c, 1, 2, TS[0]);
        m.map(r.clone()).unwrap();

        let (summary, out) = m.finish();
        assert_eq!(summary.mapped, 1);
        assert_eq!(out.len(), 1);
        let (key, emitted) = &out[0];
        assert_eq!(key.len(), 1);
        assert_eq!(key.hashcode(), Some(structural_hash(&r)));
        assert_eq!(emitted, &r);
    }

    #[test]
    fn sort_key_with_partitioning() {
        let c = conf(&[(keys::SORTING_COLUMN_CONFIG, "a"), (keys::ENABLE_PARTITIONING, "true")]);
        let mut m = Mapper::new(&c, collector()).unwrap();
        m.map(record(&c, 5, 2, TS[0])).unwrap();
        let (_, out) = m.finish();
        assert_eq!(out[0].0.entries(), &[("a".to_string(), Value::Long(5))]);
    }

    #[test]
    fn sort_and_hash_key() {
        let c = conf(&[(keys::SORTING_COLUMN_CONFIG, "a")]);
        let mut m = Mapper::new(&c, collector()).unwrap();
        let r = record(&c, 5, 2, TS[0]);
        m.map(r.clone()).unwrap();
        let (_, out) = m.finish();
        assert_eq!(out[0].0.get("a"), Some(&Value::Long(5)));
        assert_eq!(out[0].0.hashcode(), Some(structural_hash(&r)));
    }

    #[test_log::test]
    fn single_warning_per_worker() {
        let c = append_conf(&[]);
        let mut m = Mapper::new(&c, collector()).unwrap();
        assert_eq!(m.guard().state(), GuardState::Baselined);

        m.map(record(&c, 1, 1, TS[0])).unwrap();
        assert_eq!(m.guard().state(), GuardState::Baselined);
        assert_eq!(m.guard().mismatches(), 0);

        m.map(record(&c, 1, 2, TS[1])).unwrap();
        assert_eq!(m.guard().state(), GuardState::Warned);

        m.map(record(&c, 1, 3, TS[2])).unwrap();
        assert_eq!(m.guard().state(), GuardState::Warned);

        let (summary, out) = m.finish();
        assert_eq!(out.len(), 3);
        assert_eq!(summary.mismatches, 2);
        assert!(summary.warned);
        assert_eq!(summary.baseline.unwrap().as_str(), "2024-01-15");
    }

    #[test]
    fn first_record_is_baseline_without_sample() {
        let c = conf(&[
            (keys::IS_APPEND, "true"),
            (keys::TIME_COLUMN_CONFIG, "ts"),
            (keys::SEGMENT_TIME_FORMAT, "EPOCH"),
            (keys::SEGMENT_TIME_TYPE, "MILLISECONDS"),
        ]);

        let mut m = Mapper::new(&c, collector()).unwrap();
        assert_eq!(m.guard().state(), GuardState::Unset);
        m.map(record(&c, 1, 1, TS[1])).unwrap();
        assert_eq!(m.guard().baseline().unwrap().as_str(), "2024-01-16");
        m.map(record(&c, 1, 1, TS[2])).unwrap();
        assert_eq!(m.guard().state(), GuardState::Baselined);
    }

    #[test]
    fn fail_policy() {
        let c = append_conf(&[(keys::TIME_MISMATCH_POLICY, "fail")]);
        let mut m = Mapper::new(&c, collector()).unwrap();
        m.map(record(&c, 1, 1, TS[0])).unwrap();
        let err = m.map(record(&c, 1, 1, TS[1])).unwrap_err();
        assert!(matches!(err, Error::TimeMismatch { .. }));
        assert_eq!(m.summary().mapped, 1);
    }

    #[test]
    fn schema_mismatch_aborts() {
        let c = conf(&[]);
        let mut m = Mapper::new(&c, collector()).unwrap();

        let narrow = Arc::new(crate::record::Schema::new(
            "event",
            c.value_schema().fields()[..2].to_vec(),
        ));
        let bad = Record::new(narrow, vec![Value::Long(1), Value::Long(2)]).unwrap();
        let records = vec![Ok(record(&c, 1, 2, TS[0])), Ok(bad), Ok(record(&c, 3, 4, TS[0]))];

        let err = m.map_all(records).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }));
        assert_eq!(m.summary().mapped, 1);
    }

    #[test]
    fn unparsable_time_propagates() {
        let c = append_conf(&[]);
        let mut m = Mapper::new(&c, collector()).unwrap();
        let err = m.map(record(&c, 1, 1, i64::MAX)).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }
}
