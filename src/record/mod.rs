/*! Record model

Records handled by the preprocessing stage are schema-bound, immutable lists of values.
The storage format (Avro) is converted from/into this model at the edges, see [crate::io].
!*/
#[allow(clippy::module_inception)]
mod record;
mod schema;
mod value;

pub use record::Record;
pub use schema::{Field, FieldType, Schema};
pub use value::Value;
