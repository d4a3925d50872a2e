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

//! A bounds-checked read position over an in-memory byte slice.

use crate::{AvroResult, error::Details, util};

/// Reads from a borrowed byte slice, tracking how far it got.
///
/// Every read is checked against the end of the slice and reports
/// [`Details::UnexpectedEof`] with the offset at which it ran dry instead of panicking.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Resume reading `data` at `position`, clamped to its end.
    pub fn new_at(data: &'a [u8], position: usize) -> Self {
        Self {
            data,
            position: position.min(data.len()),
        }
    }

    /// Offset of the next byte to be read, counted from the start of the slice.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The bytes that have not been consumed yet.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    fn eof(&self, needed: usize) -> Details {
        Details::UnexpectedEof {
            offset: self.position,
            needed,
            available: self.remaining(),
        }
    }

    pub fn read_u8(&mut self) -> AvroResult<u8> {
        let byte = *self.data.get(self.position).ok_or_else(|| self.eof(1))?;
        self.position += 1;
        Ok(byte)
    }

    /// Borrow the next `len` bytes and advance past them.
    pub fn read_slice(&mut self, len: usize) -> AvroResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(self.eof(len).into());
        }
        let slice = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> AvroResult<[u8; N]> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.read_slice(N)?);
        Ok(array)
    }

    /// Read a zig-zag encoded variable length `long`.
    #[inline]
    pub fn read_long(&mut self) -> AvroResult<i64> {
        util::zag_i64(self)
    }

    /// Read a zig-zag encoded variable length `int`, failing if it does not fit in 32 bits.
    #[inline]
    pub fn read_int(&mut self) -> AvroResult<i32> {
        util::zag_i32(self)
    }

    /// Read a `long` that prefixes a length and check it against the allocation limit.
    pub fn read_len(&mut self) -> AvroResult<usize> {
        let len = self.read_long()?;
        if len < 0 {
            return Err(Details::NegativeLength(len).into());
        }
        util::safe_len(len as usize)
    }
}
