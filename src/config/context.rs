//! Worker configuration.
use std::collections::HashMap;
use std::str::FromStr;

use itertools::Itertools;
use log::{debug, info};

use crate::error::Error;
use crate::io::avro::parse_schema;
use crate::record::Schema;
use crate::time::{PushFrequency, TimeBucket, TimeFormat, TimeNormalizer};

use super::keys;

/// Flat configuration map, as handed over by the job.
pub type RawConfig = HashMap<String, String>;

/// What to do on the first time bucket mismatch of a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MismatchPolicy {
    /// log a warning and go on.
    #[default]
    Warn,
    /// fail the worker.
    Fail,
}

impl FromStr for MismatchPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(MismatchPolicy::Warn),
            "fail" => Ok(MismatchPolicy::Fail),
            other => Err(Error::Configuration(format!(
                "unknown time mismatch policy {other:?}, expected warn or fail"
            ))),
        }
    }
}

/// Settings that only exist in append mode.
#[derive(Debug, Clone)]
pub struct AppendSettings {
    time_column: String,
    normalizer: TimeNormalizer,
    sample_bucket: Option<TimeBucket>,
    mismatch_policy: MismatchPolicy,
}

impl AppendSettings {
    pub fn time_column(&self) -> &str {
        &self.time_column
    }

    pub fn normalizer(&self) -> &TimeNormalizer {
        &self.normalizer
    }

    /// Bucket of the configured sample time value, if any.
    pub fn sample_bucket(&self) -> Option<&TimeBucket> {
        self.sample_bucket.as_ref()
    }

    pub fn mismatch_policy(&self) -> MismatchPolicy {
        self.mismatch_policy
    }
}

/// Immutable worker settings, resolved once before any record is processed.
#[derive(Debug, Clone)]
pub struct ConfigurationContext {
    table_name: Option<String>,
    append: Option<AppendSettings>,
    sort_column: Option<String>,
    partitioning_enabled: bool,
    key_schema: Option<Schema>,
    value_schema: Schema,
}

impl ConfigurationContext {
    /// Resolve the configuration from a flat map.
    ///
    /// Errors with [Error::Configuration] on missing or malformed settings.
    pub fn from_map(conf: &RawConfig) -> Result<Self, Error> {
        let get = |key: &str| conf.get(key).map(String::as_str);

        let table_name = get(keys::SEGMENT_TABLE_NAME).map(str::to_string);

        let value_schema = get(keys::MAP_OUTPUT_VALUE_SCHEMA)
            .ok_or_else(|| missing(keys::MAP_OUTPUT_VALUE_SCHEMA))
            .and_then(|json| schema_setting(keys::MAP_OUTPUT_VALUE_SCHEMA, json))?;
        let key_schema = get(keys::MAP_OUTPUT_KEY_SCHEMA)
            .map(|json| schema_setting(keys::MAP_OUTPUT_KEY_SCHEMA, json))
            .transpose()?;

        let append = if parse_bool(keys::IS_APPEND, get(keys::IS_APPEND))? {
            Some(append_settings(&get, &value_schema)?)
        } else {
            None
        };

        let sort_column = get(keys::SORTING_COLUMN_CONFIG).map(str::to_string);
        if let Some(column) = &sort_column {
            if value_schema.field(column).is_none() {
                return Err(Error::Configuration(format!(
                    "sorting column {column:?} is not a field of {value_schema}"
                )));
            }
        }

        let partitioning_enabled =
            parse_bool(keys::ENABLE_PARTITIONING, get(keys::ENABLE_PARTITIONING))?;

        Ok(Self {
            table_name,
            append,
            sort_column,
            partitioning_enabled,
            key_schema,
            value_schema,
        })
    }

    /// Log the configuration map, then resolve it.
    pub fn setup(conf: &RawConfig) -> Result<Self, Error> {
        log_configurations(conf);
        let context = Self::from_map(conf)?;
        info!("Sorted Column: {:?}", context.sort_column());
        Ok(context)
    }

    pub fn table_name(&self) -> Option<&str> {
        self.table_name.as_deref()
    }

    pub fn append_mode(&self) -> bool {
        self.append.is_some()
    }

    /// Append mode settings, [None] when not in append mode.
    pub fn append(&self) -> Option<&AppendSettings> {
        self.append.as_ref()
    }

    pub fn time_column(&self) -> Option<&str> {
        self.append.as_ref().map(AppendSettings::time_column)
    }

    pub fn time_format(&self) -> Option<&TimeFormat> {
        self.append.as_ref().map(|a| a.normalizer.format())
    }

    pub fn push_frequency(&self) -> Option<PushFrequency> {
        self.append.as_ref().map(|a| a.normalizer.frequency())
    }

    pub fn sort_column(&self) -> Option<&str> {
        self.sort_column.as_deref()
    }

    pub fn partitioning_enabled(&self) -> bool {
        self.partitioning_enabled
    }

    /// Declared output key schema, if any.
    pub fn key_schema(&self) -> Option<&Schema> {
        self.key_schema.as_ref()
    }

    /// Expected schema of every record.
    pub fn value_schema(&self) -> &Schema {
        &self.value_schema
    }
}

fn missing(key: &str) -> Error {
    Error::Configuration(format!("missing configuration key {key}"))
}

fn schema_setting(key: &str, json: &str) -> Result<Schema, Error> {
    parse_schema(json).map_err(|e| Error::Configuration(format!("{key}: {e}")))
}

/// `"true"` (any case) is true, `"false"` or absent is false.
fn parse_bool(key: &str, value: Option<&str>) -> Result<bool, Error> {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) if v == "true" => Ok(true),
        Some(v) if v == "false" || v.is_empty() => Ok(false),
        Some(v) => Err(Error::Configuration(format!(
            "{key}: expected true or false, got {v:?}"
        ))),
    }
}

fn append_settings<'a>(
    get: &impl Fn(&str) -> Option<&'a str>,
    value_schema: &Schema,
) -> Result<AppendSettings, Error> {
    let time_column = get(keys::TIME_COLUMN_CONFIG).ok_or_else(|| missing(keys::TIME_COLUMN_CONFIG))?;
    if value_schema.field(time_column).is_none() {
        return Err(Error::Configuration(format!(
            "time column {time_column:?} is not a field of {value_schema}"
        )));
    }

    let format = get(keys::SEGMENT_TIME_FORMAT).ok_or_else(|| missing(keys::SEGMENT_TIME_FORMAT))?;
    let format = TimeFormat::from_config(
        format,
        get(keys::SEGMENT_TIME_TYPE),
        get(keys::SEGMENT_TIME_SDF_PATTERN),
    )?;

    let frequency = match get(keys::SEGMENT_PUSH_FREQUENCY) {
        Some(f) => f.parse::<PushFrequency>()?,
        None => {
            debug!("no push frequency, defaulting to daily");
            PushFrequency::default()
        }
    };
    let normalizer = TimeNormalizer::new(format, frequency);

    let sample_bucket = get(keys::TIME_COLUMN_VALUE)
        .map(|sample| {
            normalizer.normalize(sample).map_err(|e| {
                Error::Configuration(format!("{}: {}", keys::TIME_COLUMN_VALUE, e))
            })
        })
        .transpose()?;

    let mismatch_policy: MismatchPolicy = get(keys::TIME_MISMATCH_POLICY)
        .map(str::parse::<MismatchPolicy>)
        .transpose()?
        .unwrap_or_default();

    Ok(AppendSettings {
        time_column: time_column.to_string(),
        normalizer,
        sample_bucket,
        mismatch_policy,
    })
}

/// Log the whole configuration map, sorted by key.
pub fn log_configurations(conf: &RawConfig) {
    let dump = conf
        .iter()
        .sorted()
        .map(|(k, v)| format!("{k}={v}"))
        .join(", \n");

    info!("*********************************************************************");
    info!("Job Configurations: {{{}}}", dump);
    info!("*********************************************************************");
}

#[cfg(test)]
mod tests {
    use crate::config::keys;
    use crate::error::Error;
    use crate::time::{PushFrequency, TimeFormat, TimeUnit};

    use super::{ConfigurationContext, MismatchPolicy, RawConfig};

    const VALUE_SCHEMA: &str = r#"{"type": "record", "name": "event", "fields": [
        {"name": "a", "type": "long"},
        {"name": "b", "type": "long"},
        {"name": "ts", "type": "long"}
    ]}"#;

    fn base() -> RawConfig {
        [
            (keys::SEGMENT_TABLE_NAME, "events"),
            (keys::MAP_OUTPUT_VALUE_SCHEMA, VALUE_SCHEMA),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn append() -> RawConfig {
        let mut c = base();
        c.insert(keys::IS_APPEND.to_string(), "TRUE".to_string());
        c.insert(keys::TIME_COLUMN_CONFIG.to_string(), "ts".to_string());
        c.insert(keys::SEGMENT_TIME_FORMAT.to_string(), "EPOCH".to_string());
        c.insert(keys::SEGMENT_TIME_TYPE.to_string(), "MILLISECONDS".to_string());
        c
    }

    fn is_config_error(r: Result<ConfigurationContext, Error>) -> bool {
        matches!(r, Err(Error::Configuration(_)))
    }

    #[test]
    fn defaults() {
        let c = ConfigurationContext::from_map(&base()).unwrap();
        assert_eq!(c.table_name(), Some("events"));
        assert!(!c.append_mode());
        assert!(!c.partitioning_enabled());
        assert_eq!(c.sort_column(), None);
        assert_eq!(c.key_schema(), None);
        assert_eq!(c.value_schema().len(), 3);
    }

    #[test]
    fn append_mode() {
        let mut conf = append();
        conf.insert(keys::TIME_COLUMN_VALUE.to_string(), "1705312800000".to_string());
        let c = ConfigurationContext::from_map(&conf).unwrap();
        assert_eq!(c.time_column(), Some("ts"));
        assert_eq!(
            c.time_format(),
            Some(&TimeFormat::Epoch(TimeUnit::Milliseconds))
        );
        assert_eq!(c.push_frequency(), Some(PushFrequency::Daily));
        let settings = c.append().unwrap();
        assert_eq!(settings.sample_bucket().unwrap().as_str(), "2024-01-15");
        assert_eq!(settings.mismatch_policy(), MismatchPolicy::Warn);
    }

    #[test]
    fn append_requires_time_settings() {
        for key in [keys::TIME_COLUMN_CONFIG, keys::SEGMENT_TIME_FORMAT, keys::SEGMENT_TIME_TYPE] {
            let mut conf = append();
            conf.remove(key);
            assert!(is_config_error(ConfigurationContext::from_map(&conf)), "{key}");
        }
    }

    #[test]
    fn time_settings_ignored_outside_append() {
        let mut conf = append();
        conf.insert(keys::IS_APPEND.to_string(), "false".to_string());
        conf.remove(keys::SEGMENT_TIME_TYPE);
        let c = ConfigurationContext::from_map(&conf).unwrap();
        assert!(!c.append_mode());
        assert_eq!(c.time_column(), None);
    }

    #[test]
    fn malformed_settings() {
        let cases = [
            (keys::TIME_COLUMN_CONFIG, "nope"),
            (keys::SEGMENT_TIME_FORMAT, "ISO8601"),
            (keys::SEGMENT_PUSH_FREQUENCY, "yearly"),
            (keys::TIME_COLUMN_VALUE, "yesterday"),
            (keys::TIME_MISMATCH_POLICY, "ignore"),
            (keys::ENABLE_PARTITIONING, "maybe"),
            (keys::SORTING_COLUMN_CONFIG, "c"),
            (keys::MAP_OUTPUT_VALUE_SCHEMA, "{not json"),
        ];
        for (key, value) in cases {
            let mut conf = append();
            conf.insert(key.to_string(), value.to_string());
            assert!(is_config_error(ConfigurationContext::from_map(&conf)), "{key}");
        }
    }

    #[test]
    fn pattern_format() {
        let mut conf = append();
        conf.insert(
            keys::SEGMENT_TIME_FORMAT.to_string(),
            "SIMPLE_DATE_FORMAT".to_string(),
        );
        assert!(is_config_error(ConfigurationContext::from_map(&conf)));

        conf.insert(keys::SEGMENT_TIME_SDF_PATTERN.to_string(), "yyyyMMdd".to_string());
        let c = ConfigurationContext::from_map(&conf).unwrap();
        assert!(matches!(c.time_format(), Some(TimeFormat::SimpleDate(_))));
    }

    #[test]
    fn value_schema_is_required() {
        let mut conf = base();
        conf.remove(keys::MAP_OUTPUT_VALUE_SCHEMA);
        assert!(is_config_error(ConfigurationContext::from_map(&conf)));
    }

    #[test]
    fn sorting_and_partitioning() {
        let mut conf = base();
        conf.insert(keys::SORTING_COLUMN_CONFIG.to_string(), "a".to_string());
        conf.insert(keys::ENABLE_PARTITIONING.to_string(), "true".to_string());
        let c = ConfigurationContext::from_map(&conf).unwrap();
        assert_eq!(c.sort_column(), Some("a"));
        assert!(c.partitioning_enabled());
    }
}
