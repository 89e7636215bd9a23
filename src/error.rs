//! Error enum
use std::fmt;

use crate::record::Schema;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Configuration(String),
    /// A record whose schema differs from the configured one.
    /// Heterogeneous shards are not recoverable at this stage.
    SchemaMismatch {
        expected: Schema,
        found: Schema,
    },
    Format(String),
    /// First time bucket mismatch when the mismatch policy is `fail`.
    TimeMismatch {
        baseline: String,
        current: String,
    },
    Emit(String),
    Custom(String),
    Serde(serde_json::Error),
    Glob(glob::GlobError),
    GlobPattern(glob::PatternError),
    AvroError(avro_rs::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {e}"),
            Error::Configuration(msg) => write!(f, "configuration error: {msg}"),
            Error::SchemaMismatch { expected, found } => write!(
                f,
                "the schema of all records should be the same! expected {expected}, found {found}"
            ),
            Error::Format(msg) => write!(f, "format error: {msg}"),
            Error::TimeMismatch { baseline, current } => write!(
                f,
                "shard contains multiple time buckets: baseline is {baseline}, current is {current}"
            ),
            Error::Emit(msg) => write!(f, "could not emit record: {msg}"),
            Error::Custom(msg) => write!(f, "{msg}"),
            Error::Serde(e) => write!(f, "json error: {e}"),
            Error::Glob(e) => write!(f, "glob error: {e}"),
            Error::GlobPattern(e) => write!(f, "glob pattern error: {e}"),
            Error::AvroError(e) => write!(f, "avro error: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<avro_rs::Error> for Error {
    fn from(v: avro_rs::Error) -> Self {
        Self::AvroError(v)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Io(e)
    }
}

impl From<glob::GlobError> for Error {
    fn from(e: glob::GlobError) -> Error {
        Error::Glob(e)
    }
}

impl From<glob::PatternError> for Error {
    fn from(e: glob::PatternError) -> Error {
        Error::GlobPattern(e)
    }
}

impl From<String> for Error {
    fn from(s: String) -> Error {
        Error::Custom(s)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::Serde(e)
    }
}
