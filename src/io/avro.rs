//! Conversions between Avro schemas/values and the [crate::record] model.
use std::sync::Arc;

use avro_rs::types::Value as AvroValue;
use avro_rs::Schema as AvroSchema;
use serde_json::json;

use crate::error::Error;
use crate::record::{Field, FieldType, Record, Schema, Value};

/// Parse an Avro (JSON) record schema.
pub fn parse_schema(json: &str) -> Result<Schema, Error> {
    let avro = AvroSchema::parse_str(json)?;
    schema_from_avro(&avro)
}

/// Convert an Avro record schema.
///
/// Only primitive fields and `["null", primitive]` unions are supported.
/// The record keeps its full name, namespace included.
pub fn schema_from_avro(schema: &AvroSchema) -> Result<Schema, Error> {
    match schema {
        AvroSchema::Record { name, fields, .. } => {
            let fields = fields
                .iter()
                .map(|f| Ok(Field::new(f.name.clone(), field_type_from_avro(&f.schema)?)))
                .collect::<Result<Vec<_>, Error>>()?;
            Ok(Schema::new(name.fullname(None), fields))
        }
        other => Err(Error::Custom(format!(
            "expected a record schema, got {other:?}"
        ))),
    }
}

fn field_type_from_avro(schema: &AvroSchema) -> Result<FieldType, Error> {
    let t = match schema {
        AvroSchema::Null => FieldType::Null,
        AvroSchema::Boolean => FieldType::Boolean,
        AvroSchema::Int => FieldType::Int,
        AvroSchema::Long => FieldType::Long,
        AvroSchema::Float => FieldType::Float,
        AvroSchema::Double => FieldType::Double,
        AvroSchema::Bytes => FieldType::Bytes,
        AvroSchema::String => FieldType::String,
        AvroSchema::Union(union) => match union.variants() {
            [AvroSchema::Null, inner] if !matches!(inner, AvroSchema::Union(_)) => {
                FieldType::Nullable(Box::new(field_type_from_avro(inner)?))
            }
            variants => {
                return Err(Error::Custom(format!(
                    "unsupported union {variants:?}, only [\"null\", T] is supported"
                )))
            }
        },
        other => {
            return Err(Error::Custom(format!(
                "unsupported field type {other:?}"
            )))
        }
    };
    Ok(t)
}

fn field_type_json(field_type: &FieldType) -> serde_json::Value {
    match field_type {
        FieldType::Nullable(inner) => json!(["null", field_type_json(inner)]),
        primitive => json!(primitive.to_string()),
    }
}

/// Avro JSON representation of a schema.
pub fn schema_to_json(schema: &Schema) -> serde_json::Value {
    let fields: Vec<serde_json::Value> = schema
        .fields()
        .iter()
        .map(|f| json!({"name": f.name(), "type": field_type_json(f.field_type())}))
        .collect();
    json!({
        "type": "record",
        "name": schema.name(),
        "fields": fields,
    })
}

/// Convert an Avro value read with `schema`.
pub fn record_from_avro(schema: &Arc<Schema>, value: AvroValue) -> Result<Record, Error> {
    let fields = match value {
        AvroValue::Record(fields) => fields,
        other => {
            return Err(Error::Custom(format!(
                "expected an avro record, got {other:?}"
            )))
        }
    };

    let values = fields
        .into_iter()
        .map(|(_, v)| value_from_avro(v))
        .collect::<Result<Vec<_>, Error>>()?;

    Record::new(schema.clone(), values)
}

fn value_from_avro(value: AvroValue) -> Result<Value, Error> {
    let v = match value {
        AvroValue::Null => Value::Null,
        AvroValue::Boolean(b) => Value::Boolean(b),
        AvroValue::Int(i) => Value::Int(i),
        AvroValue::Long(l) => Value::Long(l),
        AvroValue::Float(f) => Value::Float(f),
        AvroValue::Double(d) => Value::Double(d),
        AvroValue::Bytes(b) => Value::Bytes(b),
        AvroValue::String(s) => Value::String(s),
        AvroValue::Union(inner) => value_from_avro(*inner)?,
        other => {
            return Err(Error::Custom(format!(
                "unsupported avro value {other:?}"
            )))
        }
    };
    Ok(v)
}

/// Convert a value to Avro, wrapping it in a union when `field_type` is nullable.
pub fn value_to_avro(field_type: &FieldType, value: &Value) -> AvroValue {
    if let FieldType::Nullable(_) = field_type {
        return AvroValue::Union(Box::new(plain_value_to_avro(value)));
    }
    plain_value_to_avro(value)
}

fn plain_value_to_avro(value: &Value) -> AvroValue {
    match value {
        Value::Null => AvroValue::Null,
        Value::Boolean(b) => AvroValue::Boolean(*b),
        Value::Int(i) => AvroValue::Int(*i),
        Value::Long(l) => AvroValue::Long(*l),
        Value::Float(f) => AvroValue::Float(*f),
        Value::Double(d) => AvroValue::Double(*d),
        Value::Bytes(b) => AvroValue::Bytes(b.clone()),
        Value::String(s) => AvroValue::String(s.clone()),
    }
}

/// Convert a record to an Avro record value.
pub fn record_to_avro(record: &Record) -> AvroValue {
    AvroValue::Record(
        record
            .schema()
            .fields()
            .iter()
            .zip(record.values())
            .map(|(f, v)| (f.name().to_string(), value_to_avro(f.field_type(), v)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use avro_rs::types::Value as AvroValue;

    use crate::record::{FieldType, Value};

    use super::{parse_schema, record_from_avro, record_to_avro, schema_to_json};

    const SCHEMA: &str = r#"
    {
        "type": "record",
        "name": "event",
        "fields": [
            {"name": "id", "type": "long"},
            {"name": "country", "type": ["null", "string"]},
            {"name": "ts", "type": "long"}
        ]
    }"#;

    #[test]
    fn parse() {
        let s = parse_schema(SCHEMA).unwrap();
        assert_eq!(s.name(), "event");
        assert_eq!(s.len(), 3);
        assert_eq!(
            s.field("country").unwrap().field_type(),
            &FieldType::Nullable(Box::new(FieldType::String))
        );
    }

    #[test]
    fn namespace_is_kept() {
        let s = r#"{"type": "record", "name": "event", "namespace": "com.acme", "fields": [
            {"name": "id", "type": "long"}
        ]}"#;
        let s = parse_schema(s).unwrap();
        assert_eq!(s.name(), "com.acme.event");

        let again = parse_schema(&schema_to_json(&s).to_string()).unwrap();
        assert_eq!(again.name(), "com.acme.event");
    }

    #[test]
    fn unsupported_types() {
        let s = r#"{"type": "record", "name": "r", "fields": [
            {"name": "tags", "type": {"type": "array", "items": "string"}}
        ]}"#;
        assert!(parse_schema(s).is_err());
        assert!(parse_schema(r#""string""#).is_err());
    }

    #[test]
    fn json_reparses_to_same_schema() {
        let s = parse_schema(SCHEMA).unwrap();
        let again = parse_schema(&schema_to_json(&s).to_string()).unwrap();
        assert_eq!(s, again);
    }

    #[test]
    fn union_values() {
        let schema = Arc::new(parse_schema(SCHEMA).unwrap());
        let avro = AvroValue::Record(vec![
            ("id".to_string(), AvroValue::Long(1)),
            (
                "country".to_string(),
                AvroValue::Union(Box::new(AvroValue::String("fr".to_string()))),
            ),
            ("ts".to_string(), AvroValue::Long(10)),
        ]);
        let record = record_from_avro(&schema, avro.clone()).unwrap();
        assert_eq!(record.get("country"), Some(&Value::from("fr")));
        assert_eq!(record_to_avro(&record), avro);
    }
}
