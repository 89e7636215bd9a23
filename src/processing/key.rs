/*! Output key derivation.

The output key decides how records get grouped and ordered by the shuffle:

| sort column | partitioning | key                              |
|-------------|--------------|----------------------------------|
| unset       | any          | `{hashcode}`                     |
| set         | enabled      | `{<sort column>}`                |
| set         | disabled     | `{<sort column>, hashcode}`      |

The `hashcode` entry is a structural hash of the record, spreading records that share
(or lack) a sort value across reducers while still giving a stable secondary order.
!*/
use std::hash::Hasher;

use twox_hash::XxHash64;

use crate::config::ConfigurationContext;
use crate::error::Error;
use crate::record::{Field, FieldType, Record, Schema, Value};

pub const HASHCODE_FIELD: &str = "hashcode";
const KEY_SCHEMA_NAME: &str = "segment_prep.OutputKey";

/// Deterministic hash over the record's ordered `(field, value)` pairs.
///
/// Uses a fixed-seed XxHash64, so that the result does not depend on the process or platform.
pub fn structural_hash(record: &Record) -> i32 {
    let mut hasher = XxHash64::with_seed(0);
    for (field, value) in record.schema().fields().iter().zip(record.values()) {
        hasher.write(&(field.name().len() as u64).to_le_bytes());
        hasher.write(field.name().as_bytes());
        hasher.write_u8(field.field_type().tag());
        value.hash_into(&mut hasher);
    }
    // keys carry an avro `int`
    hasher.finish() as i32
}

/// Ordered mapping of at most two entries.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputKey {
    entries: Vec<(String, Value)>,
}

impl OutputKey {
    pub fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, v)| v)
    }

    /// Get the key's hashcode, if there's one.
    pub fn hashcode(&self) -> Option<i32> {
        match self.get(HASHCODE_FIELD) {
            Some(Value::Int(h)) => Some(*h),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shape of the keys of a worker.
///
/// Resolved once from configuration, so that every key of a worker has the same entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyLayout {
    Hash,
    Sort(String),
    SortAndHash(String),
}

impl KeyLayout {
    pub fn new(sort_column: Option<&str>, partitioning: bool) -> Self {
        match sort_column {
            None => KeyLayout::Hash,
            Some(column) if partitioning => KeyLayout::Sort(column.to_string()),
            Some(column) => KeyLayout::SortAndHash(column.to_string()),
        }
    }

    pub fn sort_column(&self) -> Option<&str> {
        match self {
            KeyLayout::Hash => None,
            KeyLayout::Sort(c) | KeyLayout::SortAndHash(c) => Some(c),
        }
    }

    pub fn has_hashcode(&self) -> bool {
        !matches!(self, KeyLayout::Sort(_))
    }

    /// Schema of the keys produced with this layout, for records of `value_schema`.
    ///
    /// Errors if the sort column is not a field of `value_schema`.
    pub fn key_schema(&self, value_schema: &Schema) -> Result<Schema, Error> {
        let mut fields = Vec::with_capacity(2);
        if let Some(column) = self.sort_column() {
            let field = value_schema.field(column).ok_or_else(|| {
                Error::Configuration(format!(
                    "sorting column {column:?} is not a field of {value_schema}"
                ))
            })?;
            fields.push(field.clone());
        }
        if self.has_hashcode() {
            fields.push(Field::new(HASHCODE_FIELD, FieldType::Int));
        }
        Ok(Schema::new(KEY_SCHEMA_NAME, fields))
    }
}

/// Validates records and derives their [OutputKey].
#[derive(Debug, Clone)]
pub struct KeyDeriver {
    layout: KeyLayout,
    expected: Schema,
    key_schema: Schema,
}

impl KeyDeriver {
    /// Build a deriver from the worker configuration.
    pub fn new(config: &ConfigurationContext) -> Result<Self, Error> {
        let layout = KeyLayout::new(config.sort_column(), config.partitioning_enabled());
        Self::with_layout(layout, config.value_schema().clone(), config.key_schema())
    }

    /// Build a deriver from its parts.
    ///
    /// When `declared_key_schema` is provided, it has to match the layout's key schema field for field.
    pub fn with_layout(
        layout: KeyLayout,
        expected: Schema,
        declared_key_schema: Option<&Schema>,
    ) -> Result<Self, Error> {
        let key_schema = layout.key_schema(&expected)?;
        let key_schema = match declared_key_schema {
            Some(declared) if declared != &key_schema => {
                return Err(Error::Configuration(format!(
                    "declared key schema {declared} does not match the key layout {key_schema}"
                )))
            }
            Some(declared) => declared.clone(),
            None => key_schema,
        };

        Ok(Self {
            layout,
            expected,
            key_schema,
        })
    }

    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    /// Schema of produced keys.
    pub fn key_schema(&self) -> &Schema {
        &self.key_schema
    }

    /// Expected record schema.
    pub fn expected_schema(&self) -> &Schema {
        &self.expected
    }

    /// Checks that `record` has the expected schema.
    pub fn validate(&self, record: &Record) -> Result<(), Error> {
        if record.schema() != &self.expected {
            return Err(Error::SchemaMismatch {
                expected: self.expected.clone(),
                found: record.schema().clone(),
            });
        }
        Ok(())
    }

    /// Validate `record` and derive its key.
    pub fn derive_key(&self, record: &Record) -> Result<OutputKey, Error> {
        self.validate(record)?;
        Ok(self.key_for(record))
    }

    /// Derive the key of an already validated record.
    pub(crate) fn key_for(&self, record: &Record) -> OutputKey {
        let sort_entry = |column: &str| {
            // validated schema, the column exists
            let value = record.get(column).cloned().unwrap_or(Value::Null);
            (column.to_string(), value)
        };
        let hash_entry = || (HASHCODE_FIELD.to_string(), Value::Int(structural_hash(record)));

        let entries = match &self.layout {
            KeyLayout::Hash => vec![hash_entry()],
            KeyLayout::Sort(column) => vec![sort_entry(column)],
            KeyLayout::SortAndHash(column) => vec![sort_entry(column), hash_entry()],
        };

        OutputKey { entries }
    }
}

/// Validate `record` against `config` and derive its key.
pub fn derive_key(record: &Record, config: &ConfigurationContext) -> Result<OutputKey, Error> {
    KeyDeriver::new(config)?.derive_key(record)
}
