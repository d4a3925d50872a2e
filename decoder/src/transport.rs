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

//! Reverses the transport wrapping of a message payload.
//!
//! Producers base64 encode a gzip member, and some of them base64 encode it a second time
//! before it is published. [`decode`] peels whichever of the two layouts the payload has
//! and returns the bytes of the Avro object container inside.

use crate::{AvroResult, error::Details, util};
use base64::{Engine, engine::general_purpose::STANDARD};
use flate2::read::GzDecoder;
use log::debug;
use std::io::{self, Read};

/// Outcome of one gzip attempt.
enum Gunzip {
    Inflated(Vec<u8>),
    /// The input does not start with a gzip member header.
    NotGzip(io::Error),
}

/// Decode a raw message payload into the bytes of the container it carries.
///
/// The payload is base64 decoded with the standard padded alphabet, then gunzipped. When the
/// base64 output is not a gzip member it is assumed to be base64 a second time; that layer is
/// removed and gzip is tried once more. Nothing beyond these two attempts is tried.
///
/// Fails with [`Details::Base64Decode`] when the outer base64 layer is invalid,
/// [`Details::GzipDecompress`] when a gzip member is found but its body is corrupt, and
/// [`Details::UndecodablePayload`] when neither layout yields a gzip member.
pub fn decode(raw: &[u8]) -> AvroResult<Vec<u8>> {
    debug!("base64 decoding {} bytes", raw.len());
    let decoded = STANDARD.decode(raw).map_err(Details::Base64Decode)?;
    debug!("base64 decoding successful: {} bytes", decoded.len());

    debug!("gzip decompressing data");
    let err = match gunzip(&decoded)? {
        Gunzip::Inflated(inflated) => {
            debug!("gzip decompression successful: {} bytes", inflated.len());
            return Ok(inflated);
        }
        Gunzip::NotGzip(err) => err,
    };

    debug!("gzip decompression failed ({err}), trying a second base64 decode");
    let twice = match STANDARD.decode(&decoded) {
        Ok(twice) => twice,
        Err(source) => {
            debug!("second base64 decoding failed: {source}");
            return Err(Details::UndecodablePayload(Details::Base64Decode(source).into()).into());
        }
    };
    debug!("second base64 decoding successful: {} bytes", twice.len());

    match gunzip(&twice)? {
        Gunzip::Inflated(inflated) => {
            debug!("gzip decompression successful: {} bytes", inflated.len());
            Ok(inflated)
        }
        Gunzip::NotGzip(err) => {
            debug!("second gzip decompression failed: {err}");
            Err(Details::UndecodablePayload(Details::GzipHeader(err).into()).into())
        }
    }
}

/// Inflate a gzip member, telling a missing header apart from a corrupt body.
///
/// Only the former is recoverable by another base64 pass.
fn gunzip(bytes: &[u8]) -> AvroResult<Gunzip> {
    let limit = util::max_allocation_bytes(util::DEFAULT_MAX_ALLOCATION_BYTES);
    let mut decoder = GzDecoder::new(bytes);
    let mut inflated = Vec::new();
    let result = Read::by_ref(&mut decoder)
        .take(limit as u64 + 1)
        .read_to_end(&mut inflated);

    match result {
        Ok(_) if inflated.len() > limit => Err(Details::GzipDecompress(io::Error::other(
            format!("decompressed payload exceeds the {limit} byte allocation limit"),
        ))
        .into()),
        Ok(_) => Ok(Gunzip::Inflated(inflated)),
        Err(err) if decoder.header().is_none() => Ok(Gunzip::NotGzip(err)),
        Err(err) => Err(Details::GzipDecompress(err).into()),
    }
}
