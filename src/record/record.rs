//! Immutable, schema-bound records.
use std::sync::Arc;

use crate::error::Error;

use super::{Schema, Value};

/// A record is an ordered list of values, one per field of its schema.
///
/// Records are never mutated once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl Record {
    /// Build a new record.
    ///
    /// Errors if the number of values differs from the number of fields,
    /// or if a value does not conform to its field type.
    pub fn new(schema: Arc<Schema>, values: Vec<Value>) -> Result<Self, Error> {
        if schema.len() != values.len() {
            return Err(Error::Custom(format!(
                "record has {} values but schema {} has {} fields",
                values.len(),
                schema,
                schema.len()
            )));
        }

        if let Some((field, value)) = schema
            .fields()
            .iter()
            .zip(values.iter())
            .find(|(field, value)| !value.conforms_to(field.field_type()))
        {
            return Err(Error::Custom(format!(
                "value {:?} does not conform to field {} ({})",
                value,
                field.name(),
                field.field_type()
            )));
        }

        Ok(Self { schema, values })
    }

    /// Get a reference to the record's schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Get a clone of the shared schema handle.
    pub fn schema_ref(&self) -> Arc<Schema> {
        self.schema.clone()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Get the value of field `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.position(name).map(|idx| &self.values[idx])
    }

    /// iterate over `(field name, value)` pairs, in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name())
            .zip(self.values.iter())
    }
}
