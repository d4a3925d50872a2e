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

//! Logic handling reading of Avro object container files held in memory.

mod block;
mod header;

pub use header::{ContainerHeader, MAGIC, SYNC_MARKER_SIZE};

use crate::{
    AvroResult, cursor::ByteCursor, decode::decode_datum, error::Details, schema::Schema,
    types::Value,
};
use block::{Block, read_block};
use log::debug;
use std::collections::HashMap;

/// A record taken out of a container, with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockRecord {
    /// Zero-based index of the data block holding the record.
    pub block: usize,
    /// Zero-based position of the record in its block.
    pub index: usize,
    pub value: Value,
}

/// Reads the records of an object container held in memory, block by block.
///
/// To be used as an iterator:
///
/// ```no_run
/// # use pubsub_avro_decoder::Reader;
/// # let container: Vec<u8> = Vec::new();
/// let reader = Reader::new(&container)?;
/// for record in reader {
///     match record {
///         Ok(record) => println!("block {}: {:?}", record.block, record.value),
///         Err(e) => println!("Error: {}", e),
///     };
/// }
/// # Ok::<(), pubsub_avro_decoder::Error>(())
/// ```
///
/// Errors come in two kinds. A record that fails to decode ends its block early: the error
/// is yielded (as [`Details::ShortBlock`] when the block ran out of bytes) and reading goes
/// on with the next block. A framing error (bad sync marker, truncated or undecompressable
/// block) ends the container: it is yielded once and the iterator is fused afterwards, see
/// [`Reader::has_failed`].
pub struct Reader<'a> {
    cursor: ByteCursor<'a>,
    header: ContainerHeader,
    block: Option<Block>,
    blocks: usize,
    records: usize,
    errored: bool,
    finished: bool,
}

impl<'a> Reader<'a> {
    /// Creates a `Reader` over the bytes of a container.
    ///
    /// **NOTE** The header is read upon creation of the `Reader`.
    pub fn new(data: &'a [u8]) -> AvroResult<Reader<'a>> {
        let mut cursor = ByteCursor::new(data);
        let header = ContainerHeader::read(&mut cursor)?;
        Ok(Reader {
            cursor,
            header,
            block: None,
            blocks: 0,
            records: 0,
            errored: false,
            finished: false,
        })
    }

    #[inline]
    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    /// Get a reference to the writer `Schema`.
    #[inline]
    pub fn writer_schema(&self) -> &Schema {
        self.header.schema()
    }

    /// Get a reference to the user metadata
    #[inline]
    pub fn user_metadata(&self) -> &HashMap<String, Vec<u8>> {
        self.header.user_metadata()
    }

    /// Number of records decoded so far.
    #[inline]
    pub fn record_count(&self) -> usize {
        self.records
    }

    /// Number of data blocks read so far.
    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks
    }

    /// Whether the container was read up to its end.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether reading stopped on a framing error.
    #[inline]
    pub fn has_failed(&self) -> bool {
        self.errored
    }

    fn read_next(&mut self) -> AvroResult<Option<BlockRecord>> {
        loop {
            if self.block.as_ref().is_none_or(Block::is_exhausted) {
                if let Some(done) = self.block.take() {
                    done.check_trailing();
                }
                match read_block(&mut self.cursor, &self.header, self.blocks) {
                    Ok(Some(block)) => {
                        self.blocks += 1;
                        self.block = Some(block);
                        continue;
                    }
                    Ok(None) => {
                        debug!(
                            "Container read: {} records in {} blocks",
                            self.records, self.blocks
                        );
                        self.finished = true;
                        return Ok(None);
                    }
                    Err(e) => {
                        self.errored = true;
                        return Err(e);
                    }
                }
            }

            let Some(block) = self.block.as_mut() else {
                continue;
            };
            let mut cursor = ByteCursor::new_at(&block.payload, block.position);
            let resolved = self.header.resolved_schema();
            return match decode_datum(resolved.schema(), resolved.names(), &mut cursor) {
                Ok(value) => {
                    let index = block.decoded;
                    block.position = cursor.position();
                    block.decoded += 1;
                    self.records += 1;
                    Ok(Some(BlockRecord {
                        block: block.index,
                        index,
                        value,
                    }))
                }
                Err(source) => {
                    // The rest of the block cannot be located any more.
                    let decoded = block.decoded;
                    block.decoded = block.count;
                    block.position = block.payload.len();
                    if source.is_unexpected_eof() {
                        Err(Details::ShortBlock {
                            block: block.index,
                            decoded,
                            expected: block.count,
                            source,
                        }
                        .into())
                    } else {
                        Err(source)
                    }
                }
            };
        }
    }
}

impl Iterator for Reader<'_> {
    type Item = AvroResult<BlockRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        // to prevent keep on reading after a framing error occurs
        if self.errored || self.finished {
            return None;
        };
        self.read_next().transpose()
    }
}
