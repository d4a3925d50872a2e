use apache_avro::{Codec as WriterCodec, Schema as WriterSchema, Writer, types::Record};
use pretty_assertions::assert_eq;
use pubsub_avro_decoder::{Codec, Reader, Stage, error::Details, types::Value};
use pubsub_avro_test_helper::TestResult;

const E_SCHEMA: &str = r#"{"type":"record","name":"E","fields":[{"name":"id","type":"long"},{"name":"name","type":"string"}]}"#;

fn e(id: i64, name: &str) -> Value {
    Value::Record(vec![
        ("id".to_string(), Value::Long(id)),
        ("name".to_string(), Value::String(name.to_string())),
    ])
}

/// Write the `E` records with the reference writer, one block per slice.
fn write_blocks(codec: WriterCodec, blocks: &[&[(i64, &str)]]) -> anyhow::Result<Vec<u8>> {
    let schema = WriterSchema::parse_str(E_SCHEMA)?;
    let mut writer = Writer::with_codec(&schema, Vec::new(), codec);
    for block in blocks {
        for (id, name) in *block {
            let mut record = Record::new(writer.schema()).expect("E is a record schema");
            record.put("id", *id);
            record.put("name", *name);
            writer.append(record)?;
        }
        writer.flush()?;
    }
    Ok(writer.into_inner()?)
}

fn read_values(data: &[u8]) -> anyhow::Result<Vec<Value>> {
    Ok(Reader::new(data)?
        .map(|record| record.map(|r| r.value))
        .collect::<Result<_, _>>()?)
}

#[test]
fn two_records_in_one_block() -> TestResult {
    let data = write_blocks(WriterCodec::Null, &[&[(1, "a"), (2, "b")]])?;

    let mut reader = Reader::new(&data)?;
    let records = reader.by_ref().collect::<Result<Vec<_>, _>>()?;
    assert_eq!(
        records.iter().map(|r| r.value.clone()).collect::<Vec<_>>(),
        vec![e(1, "a"), e(2, "b")]
    );
    assert_eq!(reader.record_count(), 2);
    assert_eq!(reader.block_count(), 1);
    assert!(records.iter().all(|r| r.block == 0));
    Ok(())
}

#[test]
fn records_of_several_blocks_keep_their_order() -> TestResult {
    let data = write_blocks(
        WriterCodec::Null,
        &[&[(1, "a"), (2, "b")], &[(3, "c")], &[(4, "d"), (5, "e")]],
    )?;

    let mut reader = Reader::new(&data)?;
    let records = reader.by_ref().collect::<Result<Vec<_>, _>>()?;
    assert_eq!(
        records
            .iter()
            .map(|r| (r.block, r.index))
            .collect::<Vec<_>>(),
        vec![(0, 0), (0, 1), (1, 0), (2, 0), (2, 1)]
    );
    assert_eq!(records[3].value, e(4, "d"));
    assert_eq!(reader.block_count(), 3);
    Ok(())
}

#[test]
fn deflate_container() -> TestResult {
    let data = write_blocks(WriterCodec::Deflate, &[&[(7, "seven")], &[(8, "eight")]])?;
    assert_eq!(Reader::new(&data)?.header().codec(), Codec::Deflate);
    assert_eq!(read_values(&data)?, vec![e(7, "seven"), e(8, "eight")]);
    Ok(())
}

#[test]
fn header_exposes_schema_and_user_metadata() -> TestResult {
    let schema = WriterSchema::parse_str(E_SCHEMA)?;
    let mut writer = Writer::new(&schema, Vec::new());
    writer.add_user_metadata("origin".to_string(), b"store-42")?;
    let mut record = Record::new(writer.schema()).expect("E is a record schema");
    record.put("id", 1i64);
    record.put("name", "a");
    writer.append(record)?;
    let data = writer.into_inner()?;

    let reader = Reader::new(&data)?;
    let pubsub_avro_decoder::Schema::Record(record) = reader.writer_schema() else {
        panic!("Expected a record schema");
    };
    assert_eq!(record.name.fullname(), "E");
    assert_eq!(
        reader.user_metadata().get("origin").map(Vec::as_slice),
        Some(b"store-42".as_slice())
    );
    Ok(())
}

#[test]
fn corrupt_sync_marker_after_last_block() -> TestResult {
    let mut data = write_blocks(WriterCodec::Null, &[&[(1, "a"), (2, "b")]])?;
    let last = data.len() - 1;
    data[last] ^= 0x01;

    let mut reader = Reader::new(&data)?;
    let err = reader
        .next()
        .and_then(Result::err)
        .expect("the only block has a bad marker");
    assert!(matches!(err.details(), Details::SyncMarkerMismatch { block: 0, .. }));
    assert_eq!(err.stage(), Stage::Container);
    assert!(err.to_string().starts_with("sync marker mismatch"));
    assert!(reader.next().is_none());
    Ok(())
}

#[test]
fn corrupt_sync_marker_stops_further_blocks() -> TestResult {
    let mut data = write_blocks(WriterCodec::Null, &[&[(1, "a")], &[(2, "b")]])?;
    let marker = *Reader::new(&data)?.header().sync_marker();

    // the header carries the first copy of the marker, the first block the second one
    let positions = data
        .windows(marker.len())
        .enumerate()
        .filter(|(_, window)| *window == marker)
        .map(|(position, _)| position)
        .collect::<Vec<_>>();
    assert_eq!(positions.len(), 3);
    for byte in 0..marker.len() {
        let mut corrupt = data.clone();
        corrupt[positions[1] + byte] ^= 0xff;
        let results = Reader::new(&corrupt)?.collect::<Vec<_>>();
        assert_eq!(results.len(), 1, "corrupting marker byte {byte}");
        assert!(matches!(
            results[0].as_ref().map_err(|e| e.details()),
            Err(Details::SyncMarkerMismatch { block: 0, .. })
        ));
    }

    data[positions[2]] ^= 0xff;
    let results = Reader::new(&data)?.collect::<Vec<_>>();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    Ok(())
}

#[test]
fn short_block_is_reported_and_reading_continues() -> TestResult {
    let data = write_blocks(WriterCodec::Null, &[&[(1, "a"), (2, "b")], &[(3, "c")]])?;
    let marker = *Reader::new(&data)?.header().sync_marker();
    let header_end = data
        .windows(marker.len())
        .position(|window| window == marker)
        .expect("header marker")
        + marker.len();

    // The first block starts with its count: 2 records, zig-zag encoded as 0x04.
    assert_eq!(data[header_end], 0x04);
    let mut patched = data.clone();
    patched[header_end] = 0x06;

    let mut reader = Reader::new(&patched)?;
    let mut values = Vec::new();
    let mut issues = Vec::new();
    for result in reader.by_ref() {
        match result {
            Ok(record) => values.push(record.value),
            Err(e) => issues.push(e),
        }
    }
    assert_eq!(values, vec![e(1, "a"), e(2, "b"), e(3, "c")]);
    assert_eq!(issues.len(), 1);
    assert!(matches!(
        issues[0].details(),
        Details::ShortBlock {
            block: 0,
            decoded: 2,
            expected: 3,
            ..
        }
    ));
    assert_eq!(issues[0].stage(), Stage::Container);
    assert!(reader.is_finished());
    Ok(())
}

#[test]
fn garbage_is_not_a_container() {
    let err = Reader::new(b"PK\x03\x04 this is a zip file").err();
    assert!(matches!(
        err.as_ref().map(|e| e.details()),
        Some(Details::HeaderMagic)
    ));
}
