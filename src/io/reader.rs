//! Avro shard reader.
use std::{fs::File, io::BufReader, io::Read, path::Path, sync::Arc};

use avro_rs::Reader;
use log::debug;

use crate::error::Error;
use crate::record::{Record, Schema};

use super::avro::{record_from_avro, schema_from_avro};

/// Iterator over the records of an Avro object container.
///
/// Every record shares the container's writer schema.
pub struct ShardReader<'a, R: Read> {
    schema: Arc<Schema>,
    reader: Reader<'a, R>,
}

impl<'a, R: Read> ShardReader<'a, R> {
    pub fn new(r: R) -> Result<Self, Error> {
        let reader = Reader::new(r)?;
        let schema = Arc::new(schema_from_avro(reader.writer_schema())?);
        debug!("shard schema: {}", schema);
        Ok(Self { schema, reader })
    }

    /// Get a reference to the shard's schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl ShardReader<'static, BufReader<File>> {
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let f = File::open(path)?;
        Self::new(BufReader::new(f))
    }
}

impl<'a, R: Read> Iterator for ShardReader<'a, R> {
    type Item = Result<Record, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next().map(|value| {
            let value = value?;
            record_from_avro(&self.schema, value)
        })
    }
}
