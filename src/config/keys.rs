//! Configuration keys, as set by the job that launches the workers.

pub const SEGMENT_TABLE_NAME: &str = "segment.table.name";
pub const IS_APPEND: &str = "is.append";
pub const TIME_COLUMN_CONFIG: &str = "time.column";
pub const TIME_COLUMN_VALUE: &str = "time.column.value";
pub const SEGMENT_PUSH_FREQUENCY: &str = "segment.push.frequency";
pub const SEGMENT_TIME_TYPE: &str = "segment.time.type";
pub const SEGMENT_TIME_FORMAT: &str = "segment.time.format";
pub const SEGMENT_TIME_SDF_PATTERN: &str = "segment.time.sdf.pattern";
pub const SORTING_COLUMN_CONFIG: &str = "sorting.column";
pub const ENABLE_PARTITIONING: &str = "enable.partitioning";
pub const MAP_OUTPUT_KEY_SCHEMA: &str = "avro.serialization.key.writer.schema";
pub const MAP_OUTPUT_VALUE_SCHEMA: &str = "avro.serialization.value.writer.schema";
pub const TIME_MISMATCH_POLICY: &str = "time.mismatch.policy";
