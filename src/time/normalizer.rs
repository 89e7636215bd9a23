//! Time bucket normalization.
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::Error;
use crate::record::Value;

use super::TimeFormat;

/// Canonical representation of the time partition a record belongs to.
///
/// Buckets are opaque strings (`2024-01-15`, `2024-01-15-07`), compared by equality only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TimeBucket(String);

impl TimeBucket {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cadence of segment pushes.
///
/// Only hourly pushes get hour-level buckets,
/// every other frequency is bucketed by calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PushFrequency {
    Hourly,
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl PushFrequency {
    fn bucket_format(self) -> &'static str {
        match self {
            PushFrequency::Hourly => "%Y-%m-%d-%H",
            PushFrequency::Daily | PushFrequency::Weekly | PushFrequency::Monthly => "%Y-%m-%d",
        }
    }
}

impl FromStr for PushFrequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hourly" => Ok(PushFrequency::Hourly),
            "daily" => Ok(PushFrequency::Daily),
            "weekly" => Ok(PushFrequency::Weekly),
            "monthly" => Ok(PushFrequency::Monthly),
            other => Err(Error::Configuration(format!(
                "unknown push frequency {other:?}"
            ))),
        }
    }
}

/// Maps raw time values to [TimeBucket]s.
///
/// Normalization is pure: the same raw value always yields the same bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeNormalizer {
    format: TimeFormat,
    frequency: PushFrequency,
}

impl TimeNormalizer {
    pub fn new(format: TimeFormat, frequency: PushFrequency) -> Self {
        Self { format, frequency }
    }

    /// Get a reference to the normalizer's time format.
    pub fn format(&self) -> &TimeFormat {
        &self.format
    }

    /// Get the normalizer's push frequency.
    pub fn frequency(&self) -> PushFrequency {
        self.frequency
    }

    /// Normalize a raw time value.
    ///
    /// Errors with [Error::Format] if `raw` can't be parsed using the configured format.
    pub fn normalize(&self, raw: &str) -> Result<TimeBucket, Error> {
        let instant = self.format.parse(raw)?;
        Ok(TimeBucket(
            instant.format(self.frequency.bucket_format()).to_string(),
        ))
    }

    /// Normalize a field value, using its textual representation.
    pub fn normalize_value(&self, value: &Value) -> Result<TimeBucket, Error> {
        if value.is_null() {
            return Err(Error::Format("time value is null".to_string()));
        }
        self.normalize(&value.to_string())
    }
}
