// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Decoding of Avro binary encoded datums against a parsed schema.

use crate::{
    AvroResult,
    cursor::ByteCursor,
    error::{Details, Error},
    schema::{Names, Schema, SchemaKind, resolve_ref},
    types::Value,
    util::safe_count,
};
use std::collections::HashMap;

/// Nested schemas deeper than this are refused. A record that contains itself without an
/// intervening union or collection would otherwise recurse without consuming input.
pub const MAX_DECODE_DEPTH: usize = 512;

/// Decode one datum of `schema` from `cursor`.
///
/// On success the cursor has advanced past exactly the bytes of the datum. On failure the
/// error is a [`Details::DecodeDatum`] naming the kind of the top-level schema and the
/// offset the datum started at; its source carries the offset the failure happened at.
pub fn decode_datum(schema: &Schema, names: &Names, cursor: &mut ByteCursor) -> AvroResult<Value> {
    let offset = cursor.position();
    decode_internal(schema, names, cursor, 0).map_err(|source| {
        Error::new(Details::DecodeDatum {
            kind: SchemaKind::from(schema),
            offset,
            source,
        })
    })
}

fn decode_internal(
    schema: &Schema,
    names: &Names,
    cursor: &mut ByteCursor,
    depth: usize,
) -> AvroResult<Value> {
    if depth > MAX_DECODE_DEPTH {
        return Err(Details::DecodeDepthExceeded(MAX_DECODE_DEPTH).into());
    }
    match schema {
        Schema::Null => Ok(Value::Null),
        Schema::Boolean => Ok(Value::Boolean(cursor.read_u8()? != 0)),
        Schema::Int => cursor.read_int().map(Value::Int),
        Schema::Long => cursor.read_long().map(Value::Long),
        Schema::Float => {
            let bytes = cursor.read_array::<4>()?;
            Ok(Value::Float(f32::from_le_bytes(bytes)))
        }
        Schema::Double => {
            let bytes = cursor.read_array::<8>()?;
            Ok(Value::Double(f64::from_le_bytes(bytes)))
        }
        Schema::Bytes => {
            let len = cursor.read_len()?;
            Ok(Value::Bytes(cursor.read_slice(len)?.to_vec()))
        }
        Schema::String => decode_string(cursor).map(Value::String),
        Schema::Fixed(fixed) => {
            let bytes = cursor.read_slice(fixed.size)?;
            Ok(Value::Fixed(fixed.size, bytes.to_vec()))
        }
        Schema::Enum(enum_schema) => {
            let index = cursor.read_long()?;
            let symbols = &enum_schema.symbols;
            usize::try_from(index)
                .ok()
                .and_then(|i| symbols.get(i).map(|symbol| (i, symbol)))
                .map(|(i, symbol)| Value::Enum(i as u32, symbol.clone()))
                .ok_or_else(|| {
                    Details::GetEnumValue {
                        index,
                        nsymbols: symbols.len(),
                    }
                    .into()
                })
        }
        Schema::Union(union) => {
            let index = cursor.read_long()?;
            let variants = union.variants();
            let (i, variant) = usize::try_from(index)
                .ok()
                .and_then(|i| variants.get(i).map(|variant| (i, variant)))
                .ok_or(Details::GetUnionVariant {
                    index,
                    num_variants: variants.len(),
                })?;
            let value = decode_internal(variant, names, cursor, depth + 1)?;
            Ok(Value::Union(i as u32, Box::new(value)))
        }
        Schema::Array(array) => {
            let mut items = Vec::new();
            loop {
                let len = decode_block_len(cursor)?;
                if len == 0 {
                    break;
                }
                items.reserve(len.min(cursor.remaining()));
                for _ in 0..len {
                    items.push(decode_internal(&array.items, names, cursor, depth + 1)?);
                }
            }
            Ok(Value::Array(items))
        }
        Schema::Map(map) => {
            let mut items = HashMap::new();
            loop {
                let len = decode_block_len(cursor)?;
                if len == 0 {
                    break;
                }
                items.reserve(len.min(cursor.remaining()));
                for _ in 0..len {
                    let key = decode_string(cursor)?;
                    let value = decode_internal(&map.types, names, cursor, depth + 1)?;
                    items.insert(key, value);
                }
            }
            Ok(Value::Map(items))
        }
        Schema::Record(record) => {
            let mut fields = Vec::with_capacity(record.fields.len());
            for field in &record.fields {
                let value = decode_internal(&field.schema, names, cursor, depth + 1)?;
                fields.push((field.name.clone(), value));
            }
            Ok(Value::Record(fields))
        }
        Schema::Ref { .. } => {
            let resolved = resolve_ref(schema, names)?;
            decode_internal(resolved, names, cursor, depth + 1)
        }
    }
}

fn decode_string(cursor: &mut ByteCursor) -> AvroResult<String> {
    let len = cursor.read_len()?;
    let bytes = cursor.read_slice(len)?;
    String::from_utf8(bytes.to_vec()).map_err(|e| Details::ConvertToUtf8(e).into())
}

/// Read the item count of the next array or map block.
///
/// A negative count is followed by the byte size of the block, which is read and dropped.
fn decode_block_len(cursor: &mut ByteCursor) -> AvroResult<usize> {
    let count = cursor.read_long()?;
    if count < 0 {
        // byte size of the block
        let _ = cursor.read_long()?;
    }
    safe_count(usize::try_from(count.unsigned_abs()).unwrap_or(usize::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ResolvedSchema;
    use pretty_assertions::assert_eq;
    use pubsub_avro_test_helper::TestResult;
    use rstest::rstest;

    fn decode_all(schema: &str, bytes: &[u8]) -> AvroResult<Value> {
        let resolved = ResolvedSchema::parse_str(schema)?;
        let mut cursor = ByteCursor::new(bytes);
        let value = decode_datum(resolved.schema(), resolved.names(), &mut cursor)?;
        assert_eq!(cursor.remaining(), 0, "datum left trailing bytes");
        Ok(value)
    }

    #[rstest]
    #[case::null(r#""null""#, &[], Value::Null)]
    #[case::false_(r#""boolean""#, &[0x00], Value::Boolean(false))]
    #[case::true_(r#""boolean""#, &[0x01], Value::Boolean(true))]
    #[case::nonzero_is_true(r#""boolean""#, &[0x02], Value::Boolean(true))]
    #[case::int(r#""int""#, &[0x96, 0x01], Value::Int(75))]
    #[case::long(r#""long""#, &[0x01], Value::Long(-1))]
    #[case::float(r#""float""#, &1.5f32.to_le_bytes(), Value::Float(1.5))]
    #[case::double(r#""double""#, &(-2.25f64).to_le_bytes(), Value::Double(-2.25))]
    #[case::bytes(r#""bytes""#, &[0x06, 1, 2, 3], Value::Bytes(vec![1, 2, 3]))]
    #[case::string(r#""string""#, &[0x06, b'f', b'o', b'o'], Value::String("foo".into()))]
    #[case::empty_string(r#""string""#, &[0x00], Value::String(String::new()))]
    fn test_decode_primitive(
        #[case] schema: &str,
        #[case] bytes: &[u8],
        #[case] expected: Value,
    ) -> TestResult {
        assert_eq!(decode_all(schema, bytes)?, expected);
        Ok(())
    }

    #[test]
    fn test_decode_record_follows_field_order() -> TestResult {
        let schema = r#"{"type": "record", "name": "test", "fields": [
            {"name": "b", "type": "string"},
            {"name": "a", "type": "long"}
        ]}"#;
        assert_eq!(
            decode_all(schema, &[0x02, b'x', 0x54])?,
            Value::Record(vec![
                ("b".to_string(), Value::String("x".into())),
                ("a".to_string(), Value::Long(42)),
            ])
        );
        Ok(())
    }

    #[test]
    fn test_decode_array_blocks() -> TestResult {
        let schema = r#"{"type": "array", "items": "int"}"#;
        assert_eq!(decode_all(schema, &[0x00])?, Value::Array(vec![]));
        // two blocks, the second one with a negative count and a byte size
        assert_eq!(
            decode_all(schema, &[0x04, 0x02, 0x04, 0x01, 0x02, 0x06, 0x00])?,
            Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        Ok(())
    }

    #[test]
    fn test_decode_map_blocks() -> TestResult {
        let schema = r#"{"type": "map", "values": "long"}"#;
        assert_eq!(decode_all(schema, &[0x00])?, Value::Map(HashMap::new()));
        let value = decode_all(schema, &[0x01, 0x08, 0x02, b'k', 0x0a, 0x00])?;
        assert_eq!(
            value,
            Value::Map([("k".to_string(), Value::Long(5))].into_iter().collect())
        );
        Ok(())
    }

    #[test]
    fn test_decode_enum() -> TestResult {
        let schema = r#"{"type": "enum", "name": "Suit", "symbols": ["diamonds", "spades", "clubs"]}"#;
        assert_eq!(decode_all(schema, &[0x04])?, Value::Enum(2, "clubs".into()));

        let err = decode_all(schema, &[0x06]).unwrap_err();
        let Details::DecodeDatum { kind, source, .. } = err.details() else {
            panic!("Expected a datum error, got {err:?}");
        };
        assert_eq!(*kind, SchemaKind::Enum);
        assert!(matches!(
            source.details(),
            Details::GetEnumValue {
                index: 3,
                nsymbols: 3
            }
        ));
        assert!(decode_all(schema, &[0x01]).is_err());
        Ok(())
    }

    #[test]
    fn test_decode_union() -> TestResult {
        let schema = r#"["null", "string"]"#;
        assert_eq!(decode_all(schema, &[0x00])?, Value::Union(0, Box::new(Value::Null)));
        assert_eq!(
            decode_all(schema, &[0x02, 0x02, b'a'])?,
            Value::Union(1, Box::new(Value::String("a".into())))
        );
        let err = decode_all(schema, &[0x04]).unwrap_err();
        let Details::DecodeDatum { source, .. } = err.details() else {
            panic!("Expected a datum error, got {err:?}");
        };
        assert!(matches!(
            source.details(),
            Details::GetUnionVariant {
                index: 2,
                num_variants: 2
            }
        ));
        Ok(())
    }

    #[test]
    fn test_decode_fixed() -> TestResult {
        let schema = r#"{"type": "fixed", "name": "four", "size": 4}"#;
        assert_eq!(
            decode_all(schema, &[1, 2, 3, 4])?,
            Value::Fixed(4, vec![1, 2, 3, 4])
        );
        Ok(())
    }

    #[test]
    fn test_decode_recursive_reference() -> TestResult {
        let schema = r#"{
            "type": "record",
            "name": "LongList",
            "fields": [
                {"name": "value", "type": "long"},
                {"name": "next", "type": ["null", "LongList"]}
            ]
        }"#;
        let value = decode_all(schema, &[0x02, 0x02, 0x04, 0x00])?;
        assert_eq!(
            value,
            Value::Record(vec![
                ("value".to_string(), Value::Long(1)),
                (
                    "next".to_string(),
                    Value::Union(
                        1,
                        Box::new(Value::Record(vec![
                            ("value".to_string(), Value::Long(2)),
                            ("next".to_string(), Value::Union(0, Box::new(Value::Null))),
                        ]))
                    )
                ),
            ])
        );
        Ok(())
    }

    #[test]
    fn test_self_containing_record_hits_depth_limit() -> TestResult {
        let resolved = ResolvedSchema::parse_str(
            r#"{"type": "record", "name": "Loop", "fields": [{"name": "again", "type": "Loop"}]}"#,
        )?;
        let mut cursor = ByteCursor::new(&[]);
        let err = decode_datum(resolved.schema(), resolved.names(), &mut cursor).unwrap_err();
        let Details::DecodeDatum { source, .. } = err.details() else {
            panic!("Expected a datum error, got {err:?}");
        };
        assert!(matches!(source.details(), Details::DecodeDepthExceeded(_)));
        Ok(())
    }

    #[test]
    fn test_truncated_datum_reports_eof_and_offset() -> TestResult {
        let resolved = ResolvedSchema::parse_str(
            r#"{"type": "record", "name": "test", "fields": [
                {"name": "a", "type": "long"},
                {"name": "b", "type": "string"}
            ]}"#,
        )?;
        // one leading byte belongs to a previous datum
        let bytes = [0x00, 0x02, 0x0a, b'a'];
        let mut cursor = ByteCursor::new(&bytes);
        cursor.read_u8()?;
        let err = decode_datum(resolved.schema(), resolved.names(), &mut cursor).unwrap_err();
        assert!(err.is_unexpected_eof());
        assert_eq!(err.stage(), crate::Stage::Decode);
        let Details::DecodeDatum {
            kind,
            offset,
            source,
        } = err.details()
        else {
            panic!("Expected a datum error, got {err:?}");
        };
        assert_eq!((*kind, *offset), (SchemaKind::Record, 1));
        assert!(matches!(
            source.details(),
            Details::UnexpectedEof {
                offset: 3,
                needed: 5,
                available: 1
            }
        ));
        Ok(())
    }

    #[test]
    fn test_invalid_utf8_string() {
        let err = decode_all(r#""string""#, &[0x04, 0xff, 0xfe]).unwrap_err();
        let Details::DecodeDatum { source, .. } = err.details() else {
            panic!("Expected a datum error, got {err:?}");
        };
        assert!(matches!(source.details(), Details::ConvertToUtf8(_)));
    }

    #[rstest]
    #[case::array(r#"{"type": "array", "items": "null"}"#, &[0x80, 0xb4, 0x89, 0x13, 0x00])]
    #[case::negative_count(r#"{"type": "array", "items": "null"}"#, &[0xff, 0xb3, 0x89, 0x13, 0x00, 0x00])]
    #[case::map(r#"{"type": "map", "values": "null"}"#, &[0x80, 0xb4, 0x89, 0x13, 0x00])]
    fn test_item_count_is_an_allocation(#[case] schema: &str, #[case] bytes: &[u8]) {
        // 20_000_000 zero-byte items from a five byte datum
        let err = decode_all(schema, bytes).unwrap_err();
        let Details::DecodeDatum { source, .. } = err.details() else {
            panic!("Expected a datum error, got {err:?}");
        };
        assert!(matches!(
            source.details(),
            Details::MemoryAllocation { .. }
        ));
    }

    #[test]
    fn test_negative_length() {
        let err = decode_all(r#""bytes""#, &[0x01]).unwrap_err();
        let Details::DecodeDatum { source, .. } = err.details() else {
            panic!("Expected a datum error, got {err:?}");
        };
        assert!(matches!(source.details(), Details::NegativeLength(-1)));
    }
}
