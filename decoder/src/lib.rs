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

//! Decodes message payloads that carry an **[Apache Avro](https://avro.apache.org/)** object
//! container file wrapped in gzip and base64.
//!
//! A payload goes through these stages:
//!
//! 1. [`transport`]: base64, then gzip. Producers that base64 encode twice are handled too.
//! 2. [`Reader`]: the container header (magic, metadata, sync marker) is read and the writer
//!    [`Schema`] parsed, then data blocks are checked against the sync marker and decompressed.
//! 3. [`decode_datum`]: the records of a block are decoded against the writer schema into the
//!    generic [`Value`](types::Value) type.
//! 4. [`sink::RecordSink`]: decoded records are handed over in order.
//!
//! [`Pipeline`] strings these together and keeps a failing message from affecting the others:
//!
//! ```no_run
//! use pubsub_avro_decoder::{Pipeline, sink::JsonSink};
//!
//! # let messages: Vec<Vec<u8>> = Vec::new();
//! let pipeline = Pipeline::builder().build();
//! let mut sink = JsonSink::new(std::io::stdout());
//! let report = pipeline.decode_batch(&messages, &mut sink);
//! println!("{} records from {} messages", report.records, report.decoded);
//! ```
//!
//! Every failure is an [`Error`] whose [`Stage`] tells which of the stages above gave up.
//!
//! # Features
//!
//! - `snappy`: enable support for the Snappy codec
//! - `zstandard`: enable support for the Zstandard codec
//! - `bzip`: enable support for the Bzip2 codec
//! - `xz`: enable support for the Xz codec
//!
//! # MSRV
//!
//! The current MSRV is 1.88.0.

mod codec;
mod cursor;
mod decode;
mod pipeline;
mod reader;
mod validator;

pub mod error;
pub mod schema;
pub mod sink;
pub mod transport;
pub mod types;
pub mod util;

pub use codec::Codec;
pub use cursor::ByteCursor;
pub use decode::{MAX_DECODE_DEPTH, decode_datum};
pub use error::{Error, Stage};
pub use pipeline::{BatchReport, MessageReport, Pipeline};
pub use reader::{BlockRecord, ContainerHeader, MAGIC, Reader, SYNC_MARKER_SIZE};
pub use schema::{ResolvedSchema, Schema};

/// A convenience type alias for `Result`s with `Error`s.
pub type AvroResult<T> = Result<T, Error>;
