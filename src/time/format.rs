/*! Time column formats.

A time column is either stored as a number of `unit`s since the Unix epoch (`EPOCH`),
or as a string following a `SimpleDateFormat`-style pattern (`SIMPLE_DATE_FORMAT`).

Patterns are translated once into a [chrono] format string, so that malformed patterns are caught
at setup rather than on the first record.
!*/
use std::str::FromStr;

use chrono::format::{self, ParseError, Parsed, StrftimeItems};
use chrono::{DateTime, Utc};

use crate::error::Error;

const MILLIS_PER_SECOND: i64 = 1_000;
const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;
const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;

/// Unit of an epoch-based time column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Convert `value` units to milliseconds (flooring sub-millisecond units).
    ///
    /// Returns [None] on overflow.
    pub fn to_millis(self, value: i64) -> Option<i64> {
        match self {
            TimeUnit::Nanoseconds => Some(value.div_euclid(1_000_000)),
            TimeUnit::Microseconds => Some(value.div_euclid(1_000)),
            TimeUnit::Milliseconds => Some(value),
            TimeUnit::Seconds => value.checked_mul(MILLIS_PER_SECOND),
            TimeUnit::Minutes => value.checked_mul(MILLIS_PER_MINUTE),
            TimeUnit::Hours => value.checked_mul(MILLIS_PER_HOUR),
            TimeUnit::Days => value.checked_mul(MILLIS_PER_DAY),
        }
    }
}

impl FromStr for TimeUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NANOSECONDS" => Ok(TimeUnit::Nanoseconds),
            "MICROSECONDS" => Ok(TimeUnit::Microseconds),
            "MILLISECONDS" => Ok(TimeUnit::Milliseconds),
            "SECONDS" => Ok(TimeUnit::Seconds),
            "MINUTES" => Ok(TimeUnit::Minutes),
            "HOURS" => Ok(TimeUnit::Hours),
            "DAYS" => Ok(TimeUnit::Days),
            other => Err(Error::Configuration(format!("unknown time unit {other:?}"))),
        }
    }
}

/// Format of the values of the time column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeFormat {
    Epoch(TimeUnit),
    SimpleDate(DatePattern),
}

impl TimeFormat {
    pub const EPOCH: &'static str = "EPOCH";
    pub const SIMPLE_DATE_FORMAT: &'static str = "SIMPLE_DATE_FORMAT";

    /// Build a format from its configuration values.
    ///
    /// - `format` is either `EPOCH` or `SIMPLE_DATE_FORMAT`,
    /// - `unit` is mandatory for `EPOCH`,
    /// - `pattern` is mandatory for `SIMPLE_DATE_FORMAT`.
    pub fn from_config(
        format: &str,
        unit: Option<&str>,
        pattern: Option<&str>,
    ) -> Result<Self, Error> {
        match format.trim().to_ascii_uppercase().as_str() {
            Self::EPOCH => {
                let unit = unit.ok_or_else(|| {
                    Error::Configuration("EPOCH time format requires a time unit".to_string())
                })?;
                Ok(TimeFormat::Epoch(unit.parse()?))
            }
            Self::SIMPLE_DATE_FORMAT => {
                let pattern = pattern.ok_or_else(|| {
                    Error::Configuration(
                        "SIMPLE_DATE_FORMAT time format requires a pattern".to_string(),
                    )
                })?;
                Ok(TimeFormat::SimpleDate(DatePattern::new(pattern)?))
            }
            other => Err(Error::Configuration(format!(
                "unknown time format {other:?}, expected {} or {}",
                Self::EPOCH,
                Self::SIMPLE_DATE_FORMAT
            ))),
        }
    }

    /// Parse a raw time value into an UTC instant.
    pub fn parse(&self, raw: &str) -> Result<DateTime<Utc>, Error> {
        match self {
            TimeFormat::Epoch(unit) => {
                let value: i64 = raw.parse().map_err(|e| {
                    Error::Format(format!("could not parse {raw:?} as an epoch value: {e}"))
                })?;
                let millis = unit.to_millis(value).ok_or_else(|| {
                    Error::Format(format!("{raw} {unit:?} does not fit in milliseconds"))
                })?;
                let secs = millis.div_euclid(MILLIS_PER_SECOND);
                let nanos = (millis.rem_euclid(MILLIS_PER_SECOND) * 1_000_000) as u32;
                DateTime::from_timestamp(secs, nanos)
                    .ok_or_else(|| Error::Format(format!("{raw} is out of the supported time range")))
            }
            TimeFormat::SimpleDate(pattern) => pattern.parse(raw),
        }
    }
}

/// Fields a pattern sets, the others get `SimpleDateFormat` defaults when parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PatternFields {
    year: bool,
    month: bool,
    day: bool,
    ordinal: bool,
    hour: bool,
    hour12: bool,
    ampm: bool,
    minute: bool,
    second: bool,
}

/// A `SimpleDateFormat` pattern, along with its chrono translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePattern {
    pattern: String,
    chrono: String,
    fields: PatternFields,
}

impl DatePattern {
    /// Translate `pattern`.
    ///
    /// Supported letters are `y M d D H h m s S a E`, everything between single quotes is literal.
    /// Zone letters are not supported since values are read as UTC,
    /// and neither are `k` (1-24) and `K` (0-11) hours.
    /// `h` requires an `a` marker.
    pub fn new(pattern: &str) -> Result<Self, Error> {
        let mut chrono = String::with_capacity(pattern.len() * 2);
        let mut fields = PatternFields::default();

        let chars: Vec<char> = pattern.chars().collect();
        let mut idx = 0;
        while idx < chars.len() {
            let c = chars[idx];

            // quoted literal
            if c == '\'' {
                if chars.get(idx + 1) == Some(&'\'') {
                    chrono.push('\'');
                    idx += 2;
                    continue;
                }
                let end = chars[idx + 1..]
                    .iter()
                    .position(|&c| c == '\'')
                    .ok_or_else(|| {
                        Error::Configuration(format!("unterminated quote in pattern {pattern:?}"))
                    })?;
                for &lit in &chars[idx + 1..idx + 1 + end] {
                    push_literal(&mut chrono, lit);
                }
                idx += end + 2;
                continue;
            }

            if !c.is_ascii_alphabetic() {
                push_literal(&mut chrono, c);
                idx += 1;
                continue;
            }

            // count repeated letter
            let count = chars[idx..].iter().take_while(|&&x| x == c).count();
            let spec = match (c, count) {
                ('y', 2) => "%y",
                ('y', _) => "%Y",
                ('M', 1..=2) => "%m",
                ('M', 3) => "%b",
                ('M', _) => "%B",
                ('d', _) => "%d",
                ('D', _) => "%j",
                ('H', _) => "%H",
                ('h', _) => "%I",
                ('m', _) => "%M",
                ('s', _) => "%S",
                ('S', 3) => "%3f",
                ('S', 6) => "%6f",
                ('S', 9) => "%9f",
                ('a', _) => "%p",
                ('E', 1..=3) => "%a",
                ('E', _) => "%A",
                _ => {
                    return Err(Error::Configuration(format!(
                        "unsupported pattern letter {:?} (x{}) in {:?}",
                        c, count, pattern
                    )))
                }
            };
            match c {
                'y' => fields.year = true,
                'M' => fields.month = true,
                'd' => fields.day = true,
                'D' => fields.ordinal = true,
                'H' => fields.hour = true,
                'h' => fields.hour12 = true,
                'a' => fields.ampm = true,
                'm' => fields.minute = true,
                's' => fields.second = true,
                _ => (),
            }
            chrono.push_str(spec);
            idx += count;
        }

        if !(fields.year || fields.month || fields.day || fields.ordinal) {
            return Err(Error::Configuration(format!(
                "pattern {pattern:?} does not describe a date"
            )));
        }
        if fields.ordinal && (fields.month || fields.day) {
            return Err(Error::Configuration(format!(
                "pattern {pattern:?} mixes day of year with month or day of month"
            )));
        }
        if fields.hour12 && !fields.ampm {
            return Err(Error::Configuration(format!(
                "pattern {pattern:?} has a 1-12 hour without an am/pm marker"
            )));
        }

        Ok(Self {
            pattern: pattern.to_string(),
            chrono,
            fields,
        })
    }

    /// original pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// chrono format string.
    pub fn chrono_format(&self) -> &str {
        &self.chrono
    }

    /// Parse `raw` as UTC.
    ///
    /// Missing fields default like `SimpleDateFormat` does: 1970 for the year,
    /// 1 for the month and day, 0 for the time of day.
    pub fn parse(&self, raw: &str) -> Result<DateTime<Utc>, Error> {
        let err = |e: ParseError| {
            Error::Format(format!(
                "could not parse {:?} with pattern {:?}: {}",
                raw, self.pattern, e
            ))
        };

        let mut parsed = Parsed::new();
        format::parse(&mut parsed, raw, StrftimeItems::new(&self.chrono)).map_err(err)?;

        let f = &self.fields;
        if !f.year {
            parsed.set_year(1970).map_err(err)?;
        }
        if !f.ordinal {
            if !f.month {
                parsed.set_month(1).map_err(err)?;
            }
            if !f.day {
                parsed.set_day(1).map_err(err)?;
            }
        }
        if !f.hour && !f.hour12 {
            parsed.set_hour(0).map_err(err)?;
        }
        if !f.minute {
            parsed.set_minute(0).map_err(err)?;
        }
        if !f.second {
            parsed.set_second(0).map_err(err)?;
        }

        parsed
            .to_naive_datetime_with_offset(0)
            .map(|naive| naive.and_utc())
            .map_err(err)
    }
}

fn push_literal(chrono: &mut String, c: char) {
    if c == '%' {
        chrono.push_str("%%");
    } else {
        chrono.push(c);
    }
}
