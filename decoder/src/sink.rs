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

//! Consumers of decoded records.

use crate::{AvroResult, error::Details, types::Value};
use log::warn;
use std::io::Write;

/// Receives the records of a message in the order they were decoded.
pub trait RecordSink {
    /// Take one record, together with the index of the data block it came from.
    fn accept(&mut self, block: usize, value: Value) -> AvroResult<()>;

    /// Number of records accepted so far.
    fn count(&self) -> usize;
}

/// Keeps every record in memory.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CollectingSink {
    records: Vec<(usize, Value)>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The accepted records with their block index.
    pub fn records(&self) -> &[(usize, Value)] {
        &self.records
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.records.iter().map(|(_, value)| value)
    }

    pub fn into_records(self) -> Vec<(usize, Value)> {
        self.records
    }
}

impl RecordSink for CollectingSink {
    fn accept(&mut self, block: usize, value: Value) -> AvroResult<()> {
        self.records.push((block, value));
        Ok(())
    }

    fn count(&self) -> usize {
        self.records.len()
    }
}

/// Pretty prints every record as a JSON document to a writer, one after the other.
///
/// A record JSON cannot represent (a `NaN` or infinite float) is written in its debug form
/// instead and still counted.
pub struct JsonSink<W> {
    writer: W,
    count: usize,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, count: 0 }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for JsonSink<W> {
    fn accept(&mut self, _block: usize, value: Value) -> AvroResult<()> {
        match serde_json::Value::try_from(value.clone()) {
            Ok(json) => {
                serde_json::to_writer_pretty(&mut self.writer, &json).map_err(Details::WriteJson)?
            }
            Err(e) => {
                warn!("Unable to pretty print record: {e}");
                write!(self.writer, "{value:?}")
                    .map_err(|e| Details::WriteJson(serde_json::Error::io(e)))?;
            }
        }
        self.writer
            .write_all(b"\n")
            .map_err(|e| Details::WriteJson(serde_json::Error::io(e)))?;
        self.count += 1;
        Ok(())
    }

    fn count(&self) -> usize {
        self.count
    }
}
