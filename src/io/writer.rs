//! Avro pair writer.
//!
//! Pairs are written as `{key, value}` records, the layout map output pairs have in Avro jobs.
use std::{fs::File, io::Write, path::Path};

use avro_rs::{types::Value as AvroValue, Codec, Schema as AvroSchema, Writer};
use log::error;
use serde_json::json;

use crate::error::Error;
use crate::processing::{Emit, OutputKey};
use crate::record::{Record, Schema};

use super::avro::{record_to_avro, schema_to_json, value_to_avro};

const PAIR_NAMESPACE: &str = "org.apache.avro.mapred";

/// Full name of a record nested in the pair schema.
fn nested_fullname(name: &str) -> String {
    if name.contains('.') {
        name.to_string()
    } else {
        format!("{PAIR_NAMESPACE}.{name}")
    }
}

/// Build the Avro schema of `(key, value)` pairs.
///
/// Errors if the key and value records end up with the same full name.
pub fn pair_schema(key_schema: &Schema, value_schema: &Schema) -> Result<AvroSchema, Error> {
    let key_name = nested_fullname(key_schema.name());
    if key_name == nested_fullname(value_schema.name()) {
        return Err(Error::Configuration(format!(
            "key and value records are both named {key_name}"
        )));
    }

    let pair = json!({
        "type": "record",
        "name": "Pair",
        "namespace": PAIR_NAMESPACE,
        "fields": [
            {"name": "key", "type": schema_to_json(key_schema)},
            {"name": "value", "type": schema_to_json(value_schema)},
        ]
    });
    Ok(AvroSchema::parse(&pair)?)
}

/// [Emit]s pairs into an Avro object container.
pub struct AvroPairEmitter<'a, W: Write> {
    key_schema: Schema,
    writer: Writer<'a, W>,
    written: usize,
}

impl<'a, W: Write> AvroPairEmitter<'a, W> {
    /// Create a new emitter writing pairs of `schema` (see [pair_schema]).
    pub fn new(schema: &'a AvroSchema, key_schema: Schema, writer: W, codec: Codec) -> Self {
        Self {
            key_schema,
            writer: Writer::with_codec(schema, writer, codec),
            written: 0,
        }
    }

    fn key_to_avro(&self, key: &OutputKey) -> AvroValue {
        AvroValue::Record(
            self.key_schema
                .fields()
                .iter()
                .zip(key.entries())
                .map(|(f, (name, v))| (name.clone(), value_to_avro(f.field_type(), v)))
                .collect(),
        )
    }

    /// number of pairs emitted so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush pending pairs.
    pub fn flush(&mut self) -> Result<usize, Error> {
        self.writer.flush().map_err(|e| e.into())
    }
}

impl<'a> AvroPairEmitter<'a, File> {
    /// Create a pair file at `path`, failing if it already exists.
    pub fn from_path(path: &Path, schema: &'a AvroSchema, key_schema: Schema) -> Result<Self, Error> {
        if path.exists() {
            error!("{:?} already exists!", path);
            Err(std::io::Error::new(std::io::ErrorKind::AlreadyExists, format!("{path:?}")).into())
        } else {
            let fh = File::create(path)?;
            Ok(Self::new(schema, key_schema, fh, Codec::Snappy))
        }
    }
}

impl<'a, W: Write> Emit for AvroPairEmitter<'a, W> {
    fn emit(&mut self, key: OutputKey, record: Record) -> Result<(), Error> {
        let pair = AvroValue::Record(vec![
            ("key".to_string(), self.key_to_avro(&key)),
            ("value".to_string(), record_to_avro(&record)),
        ]);
        self.writer.append(pair)?;
        self.written += 1;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::{io::Cursor, sync::Arc};

    use avro_rs::{types::Value as AvroValue, Codec};

    use crate::error::Error;
    use crate::processing::{Emit, KeyDeriver, KeyLayout};
    use crate::record::{Field, FieldType, Record, Schema, Value};

    use super::{pair_schema, AvroPairEmitter};

    #[test]
    fn key_and_value_names_clash() {
        let value_schema = Schema::new("OutputKey", vec![Field::new("a", FieldType::Long)]);
        let deriver =
            KeyDeriver::with_layout(KeyLayout::new(None, false), value_schema.clone(), None)
                .unwrap();
        assert!(pair_schema(deriver.key_schema(), &value_schema).is_ok());

        let declared = Schema::new("event", vec![Field::new("hashcode", FieldType::Int)]);
        let value_schema = Schema::new("event", vec![Field::new("a", FieldType::Long)]);
        let err = pair_schema(&declared, &value_schema).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let value_schema = Schema::new(
            "org.apache.avro.mapred.event",
            vec![Field::new("a", FieldType::Long)],
        );
        assert!(pair_schema(&declared, &value_schema).is_err());

        let value_schema = Schema::new("com.acme.event", vec![Field::new("a", FieldType::Long)]);
        assert!(pair_schema(&declared, &value_schema).is_ok());
    }

    #[test]
    fn test_simple() {
        let value_schema = Schema::new(
            "event",
            vec![
                Field::new("a", FieldType::Long),
                Field::new("b", FieldType::Nullable(Box::new(FieldType::String))),
            ],
        );
        let deriver =
            KeyDeriver::with_layout(KeyLayout::new(Some("b"), false), value_schema.clone(), None)
                .unwrap();
        let schema = pair_schema(deriver.key_schema(), &value_schema).unwrap();

        let shared = Arc::new(value_schema);
        let records: Vec<Record> = (0..10)
            .map(|i| {
                let b = if i % 2 == 0 {
                    Value::Null
                } else {
                    Value::String(format!("b{i}"))
                };
                Record::new(shared.clone(), vec![Value::Long(i), b]).unwrap()
            })
            .collect();

        let mut buf = vec![];
        let mut emitter =
            AvroPairEmitter::new(&schema, deriver.key_schema().clone(), &mut buf, Codec::Null);
        for r in &records {
            let key = deriver.derive_key(r).unwrap();
            emitter.emit(key, r.clone()).unwrap();
        }
        assert_eq!(emitter.written(), 10);
        emitter.flush().unwrap();
        drop(emitter);

        let mut c = Cursor::new(&mut buf);
        let reader = avro_rs::Reader::new(&mut c).unwrap();
        let pairs: Vec<AvroValue> = reader.map(|v| v.unwrap()).collect();
        assert_eq!(pairs.len(), 10);

        match &pairs[1] {
            AvroValue::Record(fields) => {
                assert_eq!(fields[0].0, "key");
                assert_eq!(fields[1].0, "value");
                match &fields[0].1 {
                    AvroValue::Record(key) => {
                        assert_eq!(key[0].0, "b");
                        assert_eq!(
                            key[0].1,
                            AvroValue::Union(Box::new(AvroValue::String("b1".to_string())))
                        );
                        assert_eq!(key[1].0, "hashcode");
                    }
                    other => panic!("unexpected key {other:?}"),
                }
            }
            other => panic!("unexpected pair {other:?}"),
        }
    }
}
