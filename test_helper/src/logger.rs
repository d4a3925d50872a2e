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

//! A logger that keeps what it is given, so tests can assert on log output.
//!
//! Messages are kept per thread, which matches how the test harness runs every test on a
//! thread of its own.

use log::{LevelFilter, Log, Metadata, Record};
use std::{cell::RefCell, sync::Once};

thread_local! {
    static LOG_MESSAGES: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

struct TestLogger;

impl Log for TestLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let message = format!("{}", record.args());
            LOG_MESSAGES.with(|messages| messages.borrow_mut().push(message));
        }
    }

    fn flush(&self) {}
}

static INIT: Once = Once::new();

/// Install the capturing logger. Calling this more than once is harmless.
pub fn init() {
    INIT.call_once(|| {
        if log::set_boxed_logger(Box::new(TestLogger)).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });
}

#[track_caller]
pub fn assert_logged(expected_message: &str) {
    let found = LOG_MESSAGES.with(|messages| {
        messages
            .borrow()
            .iter()
            .any(|message| message.contains(expected_message))
    });
    if !found {
        let logged = LOG_MESSAGES.with(|messages| messages.borrow().join("\n"));
        panic!("Expected log message containing '{expected_message}', logged:\n{logged}");
    }
}

#[track_caller]
pub fn assert_not_logged(unexpected_message: &str) {
    LOG_MESSAGES.with(|messages| {
        if let Some(message) = messages
            .borrow()
            .iter()
            .find(|message| message.contains(unexpected_message))
        {
            panic!("The following log message should not have been logged: '{message}'");
        }
    });
}
