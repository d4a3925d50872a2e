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

//! Drives a message payload through every decoding stage into a [`RecordSink`].

use crate::{
    AvroResult, Error, Reader,
    error::Details,
    schema::SchemaKind,
    sink::RecordSink,
    transport,
    types::Value,
};
use log::{debug, info, warn};

/// Decodes message payloads: transport layers, then the object container they carry.
///
/// ```
/// # use pubsub_avro_decoder::{Pipeline, sink::CollectingSink};
/// let pipeline = Pipeline::builder()
///     .records_only(true)
///     .max_payload_bytes(10 * 1024 * 1024)
///     .build();
/// let mut sink = CollectingSink::new();
/// let report = pipeline.decode_batch([b"not a payload".as_slice()], &mut sink);
/// assert_eq!(report.skipped, 1);
/// ```
#[derive(bon::Builder, Debug, Clone, Default)]
pub struct Pipeline {
    /// Only hand records of a `record` schema to the sink. Other top-level values are
    /// reported as issues of their message.
    #[builder(default)]
    records_only: bool,
    /// Refuse raw payloads larger than this many bytes before decoding them.
    max_payload_bytes: Option<usize>,
}

/// What came out of one message.
#[derive(Debug, Default)]
pub struct MessageReport {
    /// Records handed to the sink.
    pub records: usize,
    /// Data blocks read from the container.
    pub blocks: usize,
    /// Records that could not be decoded or that the sink refused. They did not stop the
    /// message.
    pub issues: Vec<Error>,
}

/// What came out of a batch of messages.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub messages: usize,
    /// Messages decoded up to the end of their container.
    pub decoded: usize,
    pub skipped: usize,
    /// Records handed to the sink over all messages.
    pub records: usize,
    /// The error each skipped message failed with, by position in the batch.
    pub failures: Vec<(usize, Error)>,
}

impl Pipeline {
    /// Decode one message payload and hand its records to `sink`.
    ///
    /// Records reach the sink only once the whole container was read; a message that fails
    /// in its transport layers or container framing contributes no record at all. Records
    /// that fail to decode inside an intact block, and records the sink refuses, are listed
    /// in [`MessageReport::issues`].
    pub fn decode_message<S: RecordSink + ?Sized>(
        &self,
        raw: &[u8],
        sink: &mut S,
    ) -> AvroResult<MessageReport> {
        if let Some(maximum) = self.max_payload_bytes
            && raw.len() > maximum
        {
            return Err(Details::PayloadTooLarge {
                size: raw.len(),
                maximum,
            }
            .into());
        }

        let container = transport::decode(raw)?;
        let mut reader = Reader::new(&container)?;
        debug!("Writer schema: {:?}", reader.writer_schema());

        let mut records = Vec::new();
        let mut issues = Vec::new();
        while let Some(next) = reader.next() {
            match next {
                Ok(record) => {
                    if self.records_only && !matches!(record.value, Value::Record(_)) {
                        let kind = SchemaKind::from(&record.value);
                        warn!("Unable to map record {} of block {}", record.index, record.block);
                        issues.push(Details::NotARecord(kind).into());
                        continue;
                    }
                    records.push((record.block, record.value));
                }
                Err(e) if reader.has_failed() => return Err(e),
                Err(e) => {
                    warn!("Unable to read record: {e}");
                    issues.push(e);
                }
            }
        }

        let mut count = 0;
        for (block, value) in records {
            match sink.accept(block, value) {
                Ok(()) => count += 1,
                Err(e) => {
                    warn!("Sink refused a record of block {block}: {e}");
                    issues.push(e);
                }
            }
        }
        info!("{count} records");

        Ok(MessageReport {
            records: count,
            blocks: reader.block_count(),
            issues,
        })
    }

    /// Decode a batch of message payloads into `sink`.
    ///
    /// A message that fails is logged and skipped; it never stops the rest of the batch.
    pub fn decode_batch<I, P, S>(&self, messages: I, sink: &mut S) -> BatchReport
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
        S: RecordSink + ?Sized,
    {
        let mut report = BatchReport::default();
        for (position, message) in messages.into_iter().enumerate() {
            report.messages += 1;
            let raw = message.as_ref();
            debug!("Decoding message {position}: {} bytes", raw.len());
            match self.decode_message(raw, sink) {
                Ok(message) => {
                    report.decoded += 1;
                    report.records += message.records;
                }
                Err(e) => {
                    warn!("Skipping message {position} after {} error: {e}", e.stage());
                    report.skipped += 1;
                    report.failures.push((position, e));
                }
            }
        }
        info!(
            "{} messages total: {} decoded, {} skipped, {} records",
            report.messages, report.decoded, report.skipped, report.records
        );
        report
    }
}
