/*! Reading and writing Avro shards.

Input shards are Avro object containers of records, read through [ShardReader].
Mapped pairs are written through [AvroPairEmitter].
!*/
pub mod avro;
mod reader;
mod writer;

pub use reader::ShardReader;
pub use writer::{pair_schema, AvroPairEmitter};
