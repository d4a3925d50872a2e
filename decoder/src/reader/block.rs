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

use super::header::{ContainerHeader, SYNC_MARKER_SIZE};
use crate::{AvroResult, cursor::ByteCursor, error::Details, util};
use log::{debug, warn};

/// A data block whose framing checked out and whose payload has been decompressed.
#[derive(Debug)]
pub(super) struct Block {
    /// Zero-based index of the block in its container.
    pub(super) index: usize,
    /// Number of records the block declares.
    pub(super) count: usize,
    /// Number of records taken out of the block so far.
    pub(super) decoded: usize,
    pub(super) payload: Vec<u8>,
    /// Offset of the next record in `payload`.
    pub(super) position: usize,
}

impl Block {
    pub(super) fn is_exhausted(&self) -> bool {
        self.decoded >= self.count
    }

    /// Warn about bytes the declared records did not account for.
    pub(super) fn check_trailing(&self) {
        let trailing = self.payload.len().saturating_sub(self.position);
        if trailing > 0 {
            warn!(
                "Block {} has {trailing} bytes left after its {} records",
                self.index, self.count
            );
        }
    }
}

/// Read the next block off `cursor`.
///
/// Returns `Ok(None)` once the container ends at a block boundary. The cursor is always left
/// after the sync marker of a block that was read, so that a block whose records fail to
/// decode does not disturb the framing of the next one.
pub(super) fn read_block(
    cursor: &mut ByteCursor,
    header: &ContainerHeader,
    index: usize,
) -> AvroResult<Option<Block>> {
    if cursor.is_empty() {
        return Ok(None);
    }

    let count = match cursor.read_long() {
        Ok(count) => count,
        Err(e) if e.is_unexpected_eof() => {
            warn!(
                "Container ends with {} stray bytes after block {index}",
                cursor.remaining()
            );
            return Ok(None);
        }
        Err(source) => {
            return Err(Details::ReadBlockHeader {
                block: index,
                source,
            }
            .into());
        }
    };
    if count < 0 {
        return Err(Details::BlockCountNegative {
            block: index,
            count,
        }
        .into());
    }
    let count = util::safe_count(usize::try_from(count).unwrap_or(usize::MAX)).map_err(
        |source| Details::ReadBlockHeader {
            block: index,
            source,
        },
    )?;

    let size = cursor.read_long().map_err(|source| Details::ReadBlockHeader {
        block: index,
        source,
    })?;
    if size < 0 {
        return Err(Details::BlockSizeNegative { block: index, size }.into());
    }

    let payload = util::safe_len(usize::try_from(size).unwrap_or(usize::MAX))
        .and_then(|len| cursor.read_slice(len))
        .map_err(|source| Details::ReadBlockPayload {
            block: index,
            source,
        })?;

    let offset = cursor.position();
    let marker = cursor
        .read_array::<SYNC_MARKER_SIZE>()
        .map_err(|source| Details::ReadBlockMarker {
            block: index,
            source,
        })?;
    if &marker != header.sync_marker() {
        return Err(Details::SyncMarkerMismatch {
            block: index,
            offset,
        }
        .into());
    }

    let mut payload = payload.to_vec();
    header.codec().decompress(&mut payload)?;
    debug!(
        "Read block {index}: {count} records, {size} bytes, {} bytes decompressed",
        payload.len()
    );

    Ok(Some(Block {
        index,
        count,
        decoded: 0,
        payload,
        position: 0,
    }))
}
