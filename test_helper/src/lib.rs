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

//! Helpers shared by the tests of `pubsub-avro-decoder`.

pub mod logger;

use base64::{Engine, engine::general_purpose::STANDARD};
use flate2::{Compression, write::GzEncoder};
use std::io::Write;

/// A convenience type alias for tests that propagate errors with `?`.
pub type TestResult = anyhow::Result<()>;

/// Wrap `bytes` in a single gzip member.
pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .expect("writing to a Vec does not fail");
    encoder.finish().expect("writing to a Vec does not fail")
}

/// Encode `bytes` with the standard, padded base64 alphabet.
pub fn base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// A payload the way producers publish it: base64 over gzip.
pub fn wrap(container: &[u8]) -> Vec<u8> {
    base64(&gzip(container)).into_bytes()
}

/// A payload from a producer that base64 encodes one time too many.
pub fn wrap_twice(container: &[u8]) -> Vec<u8> {
    base64(base64(&gzip(container)).as_bytes()).into_bytes()
}
