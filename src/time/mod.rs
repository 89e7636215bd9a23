/*! Time handling for append ingestion.

Raw time column values are parsed using a [TimeFormat], then quantized to a [TimeBucket]
whose granularity depends on the table's [PushFrequency].
!*/
mod format;
mod normalizer;

pub use format::{DatePattern, TimeFormat, TimeUnit};
pub use normalizer::{PushFrequency, TimeBucket, TimeNormalizer};
