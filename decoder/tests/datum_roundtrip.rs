use apache_avro::{Schema as WriterSchema, to_avro_datum, types::Value as WriterValue};
use pretty_assertions::assert_eq;
use pubsub_avro_decoder::{ByteCursor, ResolvedSchema, decode_datum, types::Value};
use pubsub_avro_test_helper::TestResult;
use rstest::rstest;
use std::collections::HashMap;

/// The reference writer and this crate share the shape of their generic values.
fn from_writer(value: WriterValue) -> Value {
    match value {
        WriterValue::Null => Value::Null,
        WriterValue::Boolean(b) => Value::Boolean(b),
        WriterValue::Int(i) => Value::Int(i),
        WriterValue::Long(l) => Value::Long(l),
        WriterValue::Float(f) => Value::Float(f),
        WriterValue::Double(d) => Value::Double(d),
        WriterValue::Bytes(b) => Value::Bytes(b),
        WriterValue::String(s) => Value::String(s),
        WriterValue::Fixed(size, b) => Value::Fixed(size, b),
        WriterValue::Enum(i, s) => Value::Enum(i, s),
        WriterValue::Union(i, v) => Value::Union(i, Box::new(from_writer(*v))),
        WriterValue::Array(items) => Value::Array(items.into_iter().map(from_writer).collect()),
        WriterValue::Map(items) => Value::Map(
            items
                .into_iter()
                .map(|(k, v)| (k, from_writer(v)))
                .collect(),
        ),
        WriterValue::Record(fields) => Value::Record(
            fields
                .into_iter()
                .map(|(k, v)| (k, from_writer(v)))
                .collect(),
        ),
        other => panic!("No generic counterpart for {other:?}"),
    }
}

fn round_trip(schema: &str, value: WriterValue) -> TestResult {
    let writer_schema = WriterSchema::parse_str(schema)?;
    let encoded = to_avro_datum(&writer_schema, value.clone())?;

    let resolved = ResolvedSchema::parse_str(schema)?;
    let mut cursor = ByteCursor::new(&encoded);
    let decoded = decode_datum(resolved.schema(), resolved.names(), &mut cursor)?;
    assert_eq!(decoded, from_writer(value));
    assert!(cursor.is_empty(), "{} bytes left over", cursor.remaining());
    Ok(())
}

#[rstest]
#[case::zero(0)]
#[case::minus_one(-1)]
#[case::one_byte_max(63)]
#[case::one_byte_min(-64)]
#[case::two_bytes(127)]
#[case::two_bytes_boundary(128)]
#[case::i32_max(i32::MAX as i64)]
#[case::i32_min(i32::MIN as i64)]
#[case::i64_max(i64::MAX)]
#[case::i64_min(i64::MIN)]
fn long_boundaries(#[case] n: i64) -> TestResult {
    round_trip(r#""long""#, WriterValue::Long(n))
}

#[rstest]
#[case::zero(0)]
#[case::max(i32::MAX)]
#[case::min(i32::MIN)]
fn int_boundaries(#[case] n: i32) -> TestResult {
    round_trip(r#""int""#, WriterValue::Int(n))
}

#[test]
fn primitives() -> TestResult {
    round_trip(r#""null""#, WriterValue::Null)?;
    round_trip(r#""boolean""#, WriterValue::Boolean(true))?;
    round_trip(r#""float""#, WriterValue::Float(3.5))?;
    round_trip(r#""double""#, WriterValue::Double(-1e300))?;
    round_trip(r#""bytes""#, WriterValue::Bytes(vec![0, 1, 255]))?;
    round_trip(r#""string""#, WriterValue::String("grüße, 世界".into()))?;
    Ok(())
}

#[test]
fn empty_and_blocked_collections() -> TestResult {
    round_trip(
        r#"{"type": "array", "items": "long"}"#,
        WriterValue::Array(vec![]),
    )?;
    round_trip(
        r#"{"type": "array", "items": "long"}"#,
        WriterValue::Array((0..300).map(WriterValue::Long).collect()),
    )?;
    round_trip(
        r#"{"type": "map", "values": "string"}"#,
        WriterValue::Map(HashMap::new()),
    )?;
    round_trip(
        r#"{"type": "map", "values": "string"}"#,
        WriterValue::Map(
            [("a", "x"), ("b", "y")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), WriterValue::String(v.to_string())))
                .collect(),
        ),
    )?;
    Ok(())
}

#[test]
fn nested_record() -> TestResult {
    let schema = r#"{
        "type": "record",
        "name": "Order",
        "namespace": "com.example",
        "fields": [
            {"name": "id", "type": "long"},
            {"name": "status", "type": {"type": "enum", "name": "Status", "symbols": ["NEW", "PAID", "SHIPPED"]}},
            {"name": "checksum", "type": {"type": "fixed", "name": "Checksum", "size": 4}},
            {"name": "customer", "type": {
                "type": "record",
                "name": "Customer",
                "fields": [
                    {"name": "name", "type": "string"},
                    {"name": "email", "type": ["null", "string"]}
                ]
            }},
            {"name": "lines", "type": {"type": "array", "items": {
                "type": "record",
                "name": "Line",
                "fields": [
                    {"name": "sku", "type": "string"},
                    {"name": "quantity", "type": "int"},
                    {"name": "price", "type": "double"}
                ]
            }}},
            {"name": "attributes", "type": {"type": "map", "values": ["long", "string", "null"]}},
            {"name": "previous", "type": ["null", "Status"]},
            {"name": "raw", "type": "bytes"},
            {"name": "paid", "type": "boolean"}
        ]
    }"#;

    let line = |sku: &str, quantity: i32, price: f64| {
        WriterValue::Record(vec![
            ("sku".to_string(), WriterValue::String(sku.to_string())),
            ("quantity".to_string(), WriterValue::Int(quantity)),
            ("price".to_string(), WriterValue::Double(price)),
        ])
    };
    let value = WriterValue::Record(vec![
        ("id".to_string(), WriterValue::Long(9_000_000_001)),
        ("status".to_string(), WriterValue::Enum(1, "PAID".to_string())),
        ("checksum".to_string(), WriterValue::Fixed(4, vec![0xde, 0xad, 0xbe, 0xef])),
        (
            "customer".to_string(),
            WriterValue::Record(vec![
                ("name".to_string(), WriterValue::String("Ada".to_string())),
                (
                    "email".to_string(),
                    WriterValue::Union(1, Box::new(WriterValue::String("ada@example.com".into()))),
                ),
            ]),
        ),
        (
            "lines".to_string(),
            WriterValue::Array(vec![line("hammer", 1, 12.5), line("nail", 100, 0.05)]),
        ),
        (
            "attributes".to_string(),
            WriterValue::Map(
                [
                    ("weight".to_string(), WriterValue::Union(0, Box::new(WriterValue::Long(3)))),
                    (
                        "note".to_string(),
                        WriterValue::Union(1, Box::new(WriterValue::String("fragile".into()))),
                    ),
                    ("gift".to_string(), WriterValue::Union(2, Box::new(WriterValue::Null))),
                ]
                .into_iter()
                .collect(),
            ),
        ),
        (
            "previous".to_string(),
            WriterValue::Union(1, Box::new(WriterValue::Enum(0, "NEW".to_string()))),
        ),
        ("raw".to_string(), WriterValue::Bytes(vec![])),
        ("paid".to_string(), WriterValue::Boolean(true)),
    ]);
    round_trip(schema, value)
}

#[test]
fn recursive_record() -> TestResult {
    let schema = r#"{
        "type": "record",
        "name": "Node",
        "fields": [
            {"name": "label", "type": "string"},
            {"name": "children", "type": {"type": "array", "items": "Node"}}
        ]
    }"#;
    let node = |label: &str, children: Vec<WriterValue>| {
        WriterValue::Record(vec![
            ("label".to_string(), WriterValue::String(label.to_string())),
            ("children".to_string(), WriterValue::Array(children)),
        ])
    };
    round_trip(
        schema,
        node("root", vec![node("a", vec![node("a1", vec![])]), node("b", vec![])]),
    )
}

#[test]
fn logical_types_decode_as_underlying_type() -> TestResult {
    let schema = r#"{"type": "record", "name": "Event", "fields": [
        {"name": "at", "type": {"type": "long", "logicalType": "timestamp-millis"}},
        {"name": "day", "type": {"type": "int", "logicalType": "date"}}
    ]}"#;
    let resolved = ResolvedSchema::parse_str(schema)?;
    // at = 1_700_000_000_000, day = 19_000
    let mut encoded = Vec::new();
    for mut z in [3_400_000_000_000u64, 38_000u64] {
        while z >= 0x80 {
            encoded.push((z as u8 & 0x7f) | 0x80);
            z >>= 7;
        }
        encoded.push(z as u8);
    }
    let mut cursor = ByteCursor::new(&encoded);
    assert_eq!(
        decode_datum(resolved.schema(), resolved.names(), &mut cursor)?,
        Value::Record(vec![
            ("at".to_string(), Value::Long(1_700_000_000_000)),
            ("day".to_string(), Value::Int(19_000)),
        ])
    );
    Ok(())
}
