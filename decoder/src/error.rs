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

//! Errors produced while decoding a message payload.
//!
//! Every failure is a [`Details`] variant wrapped into an [`Error`]. Use [`Error::stage`] to find
//! out which part of the pipeline gave up on the message.

use crate::schema::{Name, SchemaKind};
use std::{error::Error as _, fmt};
use strum_macros::Display;

/// Errors encountered while decoding a payload.
///
/// To inspect the details of the error use [`details`](Self::details) or
/// [`into_details`](Self::into_details).
#[derive(thiserror::Error, Debug)]
#[repr(transparent)]
#[error(transparent)]
pub struct Error {
    details: Box<Details>,
}

impl Error {
    pub fn new(details: Details) -> Self {
        Self {
            details: Box::new(details),
        }
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    pub fn into_details(self) -> Details {
        *self.details
    }

    /// The pipeline stage that produced this error.
    pub fn stage(&self) -> Stage {
        self.details.stage()
    }

    /// Whether this error means the cursor ran out of bytes, possibly nested in a datum error.
    pub(crate) fn is_unexpected_eof(&self) -> bool {
        match self.details() {
            Details::UnexpectedEof { .. } => true,
            Details::DecodeDatum { source, .. } => source.is_unexpected_eof(),
            _ => false,
        }
    }
}

impl From<Details> for Error {
    fn from(details: Details) -> Self {
        Self::new(details)
    }
}

/// The part of the pipeline an [`Error`] originates from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    /// The base64/gzip layers could not be removed.
    Transport,
    /// The embedded schema is malformed or uses an unsupported type.
    Schema,
    /// The Object Container File framing is broken.
    Container,
    /// A single value could not be decoded against its schema.
    Decode,
    /// The consumer of the records refused a record.
    Sink,
}

#[derive(thiserror::Error)]
pub enum Details {
    #[error("Payload of {size} bytes exceeds the configured maximum of {maximum} bytes")]
    PayloadTooLarge { size: usize, maximum: usize },

    #[error("Failed to base64 decode payload: {0}")]
    Base64Decode(#[source] base64::DecodeError),

    #[error("Not a gzip member: {0}")]
    GzipHeader(#[source] std::io::Error),

    #[error("Failed to decompress gzip payload: {0}")]
    GzipDecompress(#[source] std::io::Error),

    #[error("undecodable payload")]
    UndecodablePayload(#[source] Error),

    #[error("Failed to parse schema from JSON: {0}")]
    ParseSchemaJson(#[source] serde_json::Error),

    #[error("Must be a JSON string, object or array")]
    ParseSchemaFromValidJson,

    #[error("Unknown type or unresolved schema reference: {0}")]
    ParsePrimitive(String),

    #[error("Invalid schema: There is no type called '{0}', if you meant to define a non-primitive schema, it should be defined inside `type` attribute")]
    InvalidSchemaRecord(String),

    #[error("Unknown complex type: {0}")]
    GetComplexType(serde_json::Value),

    #[error("No `type` in complex type")]
    GetComplexTypeField,

    #[error("No `name` field")]
    GetNameField,

    #[error("No `name` in record field")]
    GetNameFieldFromRecord,

    #[error("No `fields` in record")]
    GetRecordFieldsJson,

    #[error("Duplicate field name {0}")]
    FieldNameDuplicate(String),

    #[error("Invalid field name {0}")]
    FieldName(String),

    #[error("No `symbols` field in enum")]
    GetEnumSymbolsField,

    #[error("Unable to parse `symbols` in enum")]
    GetEnumSymbols,

    #[error("Invalid enum symbol name {0}")]
    EnumSymbolName(String),

    #[error("Duplicate enum symbol {0}")]
    EnumSymbolDuplicate(String),

    #[error("No `items` in array")]
    GetArrayItemsField,

    #[error("No `values` in map")]
    GetMapValuesField,

    #[error("Fixed schema `size` value must be a positive integer: {0}")]
    GetFixedSizeFieldPositive(serde_json::Value),

    #[error("Fixed schema has no `size`")]
    GetFixedSizeField,

    #[error("Unions may not directly contain a union")]
    GetNestedUnion,

    #[error("Unions cannot contain duplicate types")]
    GetUnionDuplicate,

    #[error("Two named schema defined for same fullname: {0}")]
    NameCollision(String),

    #[error("Invalid schema name {0}. It must match the regex '{1}'")]
    InvalidSchemaName(String, &'static str),

    #[error("Invalid namespace {0}. It must match the regex '{1}'")]
    InvalidNamespace(String, &'static str),

    #[error("bad magic")]
    HeaderMagic,

    #[error("Failed to read header: {0}")]
    ReadHeader(#[source] Error),

    #[error("Failed to read header metadata: {0}")]
    GetHeaderMetadata(#[source] Error),

    #[error("missing avro.schema")]
    GetAvroSchemaFromMap,

    #[error("Codec name in header metadata is not valid utf-8")]
    BadCodecMetadata,

    #[error("unsupported codec: {0}")]
    CodecNotSupported(String),

    #[error("Failed to read sync marker: {0}")]
    ReadMarker(#[source] Error),

    #[error("Failed to read object count and size of block {block}: {source}")]
    ReadBlockHeader {
        block: usize,
        #[source]
        source: Error,
    },

    #[error("Block {block} declares a negative object count: {count}")]
    BlockCountNegative { block: usize, count: i64 },

    #[error("Block {block} declares a negative byte size: {size}")]
    BlockSizeNegative { block: usize, size: i64 },

    #[error("Failed to read payload of block {block}: {source}")]
    ReadBlockPayload {
        block: usize,
        #[source]
        source: Error,
    },

    #[error("Failed to read sync marker of block {block}: {source}")]
    ReadBlockMarker {
        block: usize,
        #[source]
        source: Error,
    },

    #[error("sync marker mismatch after block {block} at offset {offset}")]
    SyncMarkerMismatch { block: usize, offset: usize },

    #[error("short block: block {block} holds {decoded} of {expected} declared records")]
    ShortBlock {
        block: usize,
        decoded: usize,
        expected: usize,
        #[source]
        source: Error,
    },

    #[error("Failed to decompress with deflate: {0}")]
    DeflateDecompress(#[source] std::io::Error),

    #[cfg(feature = "snappy")]
    #[error("Snappy block of {0} bytes is too short to hold its CRC32 trailer")]
    SnappyTooShort(usize),

    #[cfg(feature = "snappy")]
    #[error("Failed to get snappy decompression length: {0}")]
    GetSnappyDecompressLen(#[source] snap::Error),

    #[cfg(feature = "snappy")]
    #[error("Failed to decompress with snappy: {0}")]
    SnappyDecompress(#[source] snap::Error),

    #[cfg(feature = "snappy")]
    #[error("Bad Snappy CRC32; expected {expected:x} but got {actual:x}")]
    SnappyCrc32 { expected: u32, actual: u32 },

    #[cfg(feature = "zstandard")]
    #[error("Failed to decompress with zstd: {0}")]
    ZstdDecompress(#[source] std::io::Error),

    #[cfg(feature = "bzip")]
    #[error("Failed to decompress with bzip2: {0}")]
    Bzip2Decompress(#[source] std::io::Error),

    #[cfg(feature = "xz")]
    #[error("Failed to decompress with xz: {0}")]
    XzDecompress(#[source] std::io::Error),

    #[error("Unexpected end of input at offset {offset}: needed {needed} bytes, {available} available")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Overflow when decoding integer value at offset {offset}")]
    IntegerOverflow { offset: usize },

    #[error("Decoded integer out of range for i32: {1}: {0}")]
    ZagI32(#[source] std::num::TryFromIntError, i64),

    #[error("Negative length {0} for bytes, string or block size")]
    NegativeLength(i64),

    #[error("Unable to allocate {desired} bytes (maximum allowed: {maximum})")]
    MemoryAllocation { desired: usize, maximum: usize },

    #[error("Invalid utf-8 string")]
    ConvertToUtf8(#[source] std::string::FromUtf8Error),

    #[error("Union index {index} out of bounds: {num_variants}")]
    GetUnionVariant { index: i64, num_variants: usize },

    #[error("Enum value index {index} is out of bounds {nsymbols}")]
    GetEnumValue { index: i64, nsymbols: usize },

    #[error("Schema nesting deeper than {0} levels while decoding")]
    DecodeDepthExceeded(usize),

    #[error("Unresolved schema reference: {0:?}")]
    SchemaResolutionError(Name),

    #[error("Failed to decode {kind:?} value at offset {offset}: {source}")]
    DecodeDatum {
        kind: SchemaKind,
        offset: usize,
        #[source]
        source: Error,
    },

    #[error("Expected a record at the top level, got a {0:?} value")]
    NotARecord(SchemaKind),

    #[error("failed to convert avro float to json: {0}")]
    ConvertF64ToJson(f64),

    #[error("Failed to write record as JSON: {0}")]
    WriteJson(#[source] serde_json::Error),
}

impl Details {
    fn stage(&self) -> Stage {
        use Details::*;
        match self {
            PayloadTooLarge { .. }
            | Base64Decode(_)
            | GzipHeader(_)
            | GzipDecompress(_)
            | UndecodablePayload(_) => Stage::Transport,

            ParseSchemaJson(_)
            | ParseSchemaFromValidJson
            | ParsePrimitive(_)
            | InvalidSchemaRecord(_)
            | GetComplexType(_)
            | GetComplexTypeField
            | GetNameField
            | GetNameFieldFromRecord
            | GetRecordFieldsJson
            | FieldNameDuplicate(_)
            | FieldName(_)
            | GetEnumSymbolsField
            | GetEnumSymbols
            | EnumSymbolName(_)
            | EnumSymbolDuplicate(_)
            | GetArrayItemsField
            | GetMapValuesField
            | GetFixedSizeFieldPositive(_)
            | GetFixedSizeField
            | GetNestedUnion
            | GetUnionDuplicate
            | NameCollision(_)
            | InvalidSchemaName(..)
            | InvalidNamespace(..) => Stage::Schema,

            HeaderMagic
            | ReadHeader(_)
            | GetHeaderMetadata(_)
            | GetAvroSchemaFromMap
            | BadCodecMetadata
            | CodecNotSupported(_)
            | ReadMarker(_)
            | ReadBlockHeader { .. }
            | BlockCountNegative { .. }
            | BlockSizeNegative { .. }
            | ReadBlockPayload { .. }
            | ReadBlockMarker { .. }
            | SyncMarkerMismatch { .. }
            | ShortBlock { .. }
            | DeflateDecompress(_) => Stage::Container,
            #[cfg(feature = "snappy")]
            SnappyTooShort(_) | GetSnappyDecompressLen(_) | SnappyDecompress(_) | SnappyCrc32 { .. } => {
                Stage::Container
            }
            #[cfg(feature = "zstandard")]
            ZstdDecompress(_) => Stage::Container,
            #[cfg(feature = "bzip")]
            Bzip2Decompress(_) => Stage::Container,
            #[cfg(feature = "xz")]
            XzDecompress(_) => Stage::Container,

            UnexpectedEof { .. }
            | IntegerOverflow { .. }
            | ZagI32(..)
            | NegativeLength(_)
            | MemoryAllocation { .. }
            | ConvertToUtf8(_)
            | GetUnionVariant { .. }
            | GetEnumValue { .. }
            | DecodeDepthExceeded(_)
            | SchemaResolutionError(_)
            | DecodeDatum { .. }
            | NotARecord(_) => Stage::Decode,

            ConvertF64ToJson(_) | WriteJson(_) => Stage::Sink,
        }
    }
}

impl fmt::Debug for Details {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut msg = self.to_string();
        if let Some(e) = self.source() {
            msg.extend([": ", &e.to_string()]);
        }
        write!(f, "{msg}")
    }
}
