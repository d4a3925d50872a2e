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

//! Logic for all supported compression codecs in Avro.

use crate::{AvroResult, error::Details, error::Error, util};
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

/// The compression codec used to compress blocks.
///
/// The codec of a container is named by its `avro.codec` header metadata; an absent key
/// means `null`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab_case")]
pub enum Codec {
    /// The `Null` codec simply passes through data uncompressed.
    #[default]
    Null,
    /// The `Deflate` codec writes the data block using the deflate algorithm
    /// as specified in RFC 1951, and typically implemented using the zlib library.
    /// Note that this format (unlike the "zlib format" in RFC 1950) does not have a checksum.
    Deflate,
    #[cfg(feature = "snappy")]
    /// The `Snappy` codec uses Google's [Snappy](http://google.github.io/snappy/)
    /// compression library. Each compressed block is followed by the 4-byte, big-endian
    /// CRC32 checksum of the uncompressed data in the block.
    Snappy,
    #[cfg(feature = "zstandard")]
    /// The `Zstandard` codec uses Facebook's [Zstandard](https://facebook.github.io/zstd/)
    Zstandard,
    /// The `BZip2` codec uses [BZip2](https://sourceware.org/bzip2/)
    /// compression library.
    #[cfg(feature = "bzip")]
    Bzip2,
    /// The `Xz` codec uses [Xz utils](https://tukaani.org/xz/)
    /// compression library.
    #[cfg(feature = "xz")]
    Xz,
}

impl Codec {
    /// The name of the codec as it appears in `avro.codec`.
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Decompress a block payload in place.
    ///
    /// The decompressed size is held to [`util::max_allocation_bytes`].
    pub fn decompress(self, stream: &mut Vec<u8>) -> AvroResult<()> {
        *stream = match self {
            Codec::Null => return Ok(()),
            Codec::Deflate => {
                let limit = util::max_allocation_bytes(util::DEFAULT_MAX_ALLOCATION_BYTES);
                miniz_oxide::inflate::decompress_to_vec_with_limit(stream, limit).map_err(|e| {
                    let err = {
                        use miniz_oxide::inflate::TINFLStatus::*;
                        use std::io::{Error, ErrorKind};
                        match e.status {
                            FailedCannotMakeProgress | NeedsMoreInput => {
                                Error::from(ErrorKind::UnexpectedEof)
                            }
                            Adler32Mismatch | Failed => Error::from(ErrorKind::InvalidData),
                            HasMoreOutput => Error::other(format!(
                                "decompressed block exceeds the {limit} byte allocation limit"
                            )),
                            BadParam | Done => Error::other(format!("inflate failed: {:?}", e.status)),
                        }
                    };
                    Error::new(Details::DeflateDecompress(err))
                })?
            }
            #[cfg(feature = "snappy")]
            Codec::Snappy => {
                let Some(body_len) = stream.len().checked_sub(4) else {
                    return Err(Details::SnappyTooShort(stream.len()).into());
                };
                let (body, trailer) = stream.split_at(body_len);
                let decompressed_size =
                    snap::raw::decompress_len(body).map_err(Details::GetSnappyDecompressLen)?;
                let mut decoded = vec![0; util::safe_len(decompressed_size)?];
                snap::raw::Decoder::new()
                    .decompress(body, &mut decoded[..])
                    .map_err(Details::SnappyDecompress)?;

                let mut last_four: [u8; 4] = [0; 4];
                last_four.copy_from_slice(trailer);
                let expected: u32 = u32::from_be_bytes(last_four);

                let mut hasher = crc32fast::Hasher::new();
                hasher.update(&decoded);
                let actual = hasher.finalize();

                if expected != actual {
                    return Err(Details::SnappyCrc32 { expected, actual }.into());
                }
                decoded
            }
            #[cfg(feature = "zstandard")]
            Codec::Zstandard => {
                let decoder = zstd::Decoder::new(&stream[..]).map_err(Details::ZstdDecompress)?;
                read_limited(decoder, Details::ZstdDecompress)?
            }
            #[cfg(feature = "bzip")]
            Codec::Bzip2 => {
                let decoder = bzip2::read::BzDecoder::new(&stream[..]);
                read_limited(decoder, Details::Bzip2Decompress)?
            }
            #[cfg(feature = "xz")]
            Codec::Xz => {
                let decoder = xz2::read::XzDecoder::new(&stream[..]);
                read_limited(decoder, Details::XzDecompress)?
            }
        };
        Ok(())
    }
}

/// Drain a decompressing reader, refusing output beyond the allocation limit.
#[cfg(any(feature = "zstandard", feature = "bzip", feature = "xz"))]
fn read_limited<R: std::io::Read>(
    reader: R,
    to_details: impl FnOnce(std::io::Error) -> Details,
) -> AvroResult<Vec<u8>> {
    use std::io::Read;

    let limit = util::max_allocation_bytes(util::DEFAULT_MAX_ALLOCATION_BYTES);
    let mut decoded = Vec::new();
    reader
        .take(limit as u64 + 1)
        .read_to_end(&mut decoded)
        .map_err(to_details)?;
    util::safe_len(decoded.len())?;
    Ok(decoded)
}
