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

use crate::{
    AvroResult, Codec,
    cursor::ByteCursor,
    decode::decode_datum,
    error::Details,
    schema::{MapSchema, Names, ResolvedSchema, Schema},
    types::Value,
};
use log::{debug, warn};
use std::{collections::HashMap, str::FromStr};

/// The four bytes every object container starts with: `Obj` and format version 1.
pub const MAGIC: [u8; 4] = [b'O', b'b', b'j', 1u8];
pub const SYNC_MARKER_SIZE: usize = 16;

const SCHEMA_KEY: &str = "avro.schema";
const CODEC_KEY: &str = "avro.codec";
const CODEC_LEVEL_KEY: &str = "avro.codec.compression_level";

/// The header of an object container: writer schema, codec, sync marker and the
/// metadata that is not reserved by Avro.
#[derive(Debug, Clone)]
pub struct ContainerHeader {
    schema: ResolvedSchema,
    codec: Codec,
    marker: [u8; SYNC_MARKER_SIZE],
    user_metadata: HashMap<String, Vec<u8>>,
}

impl ContainerHeader {
    /// Read the header off the front of a container.
    pub(super) fn read(cursor: &mut ByteCursor) -> AvroResult<Self> {
        let magic = cursor.read_array::<4>().map_err(Details::ReadHeader)?;
        if magic != MAGIC {
            return Err(Details::HeaderMagic.into());
        }

        let meta_schema = Schema::Map(MapSchema {
            types: Box::new(Schema::Bytes),
        });
        let Value::Map(metadata) = decode_datum(&meta_schema, &Names::new(), cursor)
            .map_err(Details::GetHeaderMetadata)?
        else {
            // a map schema only ever decodes to a map
            return Err(Details::GetAvroSchemaFromMap.into());
        };

        let mut schema = None;
        let mut codec = Codec::Null;
        let mut user_metadata = HashMap::new();
        for (key, value) in metadata {
            let bytes = match value {
                Value::Bytes(bytes) => bytes,
                wrong => {
                    warn!("Metadata values must be bytes, found {wrong:?} for {key}");
                    continue;
                }
            };
            match key.as_str() {
                SCHEMA_KEY => schema = Some(ResolvedSchema::parse_slice(&bytes)?),
                CODEC_KEY => codec = read_codec(&bytes)?,
                CODEC_LEVEL_KEY => {}
                _ if key.starts_with("avro.") => warn!("Ignoring unknown metadata key: {key}"),
                _ => {
                    user_metadata.insert(key, bytes);
                }
            }
        }
        let schema = schema.ok_or(Details::GetAvroSchemaFromMap)?;

        let marker = cursor
            .read_array::<SYNC_MARKER_SIZE>()
            .map_err(Details::ReadMarker)?;

        debug!(
            "Container header parsed: codec {}, {} user metadata keys",
            codec.name(),
            user_metadata.len()
        );
        Ok(ContainerHeader {
            schema,
            codec,
            marker,
            user_metadata,
        })
    }

    /// The writer schema the records of the container are encoded with.
    #[inline]
    pub fn schema(&self) -> &Schema {
        self.schema.schema()
    }

    /// The writer schema together with the named types it defines.
    #[inline]
    pub fn resolved_schema(&self) -> &ResolvedSchema {
        &self.schema
    }

    #[inline]
    pub fn codec(&self) -> Codec {
        self.codec
    }

    #[inline]
    pub fn sync_marker(&self) -> &[u8; SYNC_MARKER_SIZE] {
        &self.marker
    }

    /// Metadata entries whose keys are not in the reserved `avro.` namespace.
    #[inline]
    pub fn user_metadata(&self) -> &HashMap<String, Vec<u8>> {
        &self.user_metadata
    }
}

fn read_codec(bytes: &[u8]) -> AvroResult<Codec> {
    let name = std::str::from_utf8(bytes).map_err(|_| Details::BadCodecMetadata)?;
    Codec::from_str(name).map_err(|_| Details::CodecNotSupported(name.to_owned()).into())
}
