/*
 * Licensed to the Apache Software Foundation (ASF) under one or more
 * contributor license agreements.  See the NOTICE file distributed with
 * this work for additional information regarding copyright ownership.
 * The ASF licenses this file to You under the Apache License, Version 2.0
 * (the "License"); you may not use this file except in compliance with
 * the License.  You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::fmt;

/// Stable numeric codes carried by every user visible failure and by
/// structured errors on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    // Not an error; returned on success
    Ok = 0,

    // Bad method signature, missing serializer or compressor, bad options.
    // Raised at import time, never retried.
    Config = 100,

    // The transport could not reach a candidate instance.
    Connect = 200,

    // Connect retry exhausted, or no candidate instance at all.
    Access = 201,

    // A send exceeded its deadline.
    Timeout = 300,

    // A send was cancelled before it completed.
    Cancelled = 301,

    // Serialization or compression failure on either side.
    Codec = 400,

    // The remote implementation itself failed.
    Business = 500,

    // The remote framework failed before or after the implementation ran.
    Remote = 600,

    // Anything else.
    Invoke = 900,
}

impl Code {
    pub fn from_i32(i: i32) -> Code {
        Code::from(i)
    }

    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn description(&self) -> &'static str {
        match self {
            Code::Ok => "The operation completed successfully",
            Code::Config => "Invalid configuration",
            Code::Connect => "Failed to connect to a service instance",
            Code::Access => "No service instance could be reached",
            Code::Timeout => "The call timed out",
            Code::Cancelled => "The call was cancelled",
            Code::Codec => "Failed to encode or decode a message",
            Code::Business => "The remote service raised an error",
            Code::Remote => "The remote framework raised an error",
            Code::Invoke => "Unknown invocation error",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.description(), f)
    }
}

impl From<i32> for Code {
    fn from(i: i32) -> Self {
        match i {
            0 => Code::Ok,
            100 => Code::Config,
            200 => Code::Connect,
            201 => Code::Access,
            300 => Code::Timeout,
            301 => Code::Cancelled,
            400 => Code::Codec,
            500 => Code::Business,
            600 => Code::Remote,

            _ => Code::Invoke,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for code in [
            Code::Ok,
            Code::Config,
            Code::Connect,
            Code::Access,
            Code::Timeout,
            Code::Cancelled,
            Code::Codec,
            Code::Business,
            Code::Remote,
            Code::Invoke,
        ] {
            assert_eq!(Code::from_i32(code.as_i32()), code);
        }
        assert_eq!(Code::from_i32(42), Code::Invoke);
    }
}
