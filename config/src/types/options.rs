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

use serde::{Deserialize, Serialize};

/// Per-call options recognized at service and method level.
///
/// Every field is optional; an unset or non-positive value falls back to the
/// next level (method, then service, then client).
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallOptions {
    #[serde(default)]
    pub timeout_millis: Option<i64>,
    #[serde(default)]
    pub timeout_retry: Option<i32>,
    #[serde(default)]
    pub connect_retry: Option<i32>,
    #[serde(default)]
    pub serializer: Option<String>,
    #[serde(default)]
    pub compressor: Option<String>,
    #[serde(default)]
    pub compress_threshold: Option<i64>,
}

impl CallOptions {
    pub fn timeout_millis(self, timeout_millis: i64) -> Self {
        Self {
            timeout_millis: Some(timeout_millis),
            ..self
        }
    }

    pub fn timeout_retry(self, timeout_retry: i32) -> Self {
        Self {
            timeout_retry: Some(timeout_retry),
            ..self
        }
    }

    pub fn connect_retry(self, connect_retry: i32) -> Self {
        Self {
            connect_retry: Some(connect_retry),
            ..self
        }
    }

    pub fn serializer(self, serializer: impl Into<String>) -> Self {
        Self {
            serializer: Some(serializer.into()),
            ..self
        }
    }

    pub fn compressor(self, compressor: impl Into<String>) -> Self {
        Self {
            compressor: Some(compressor.into()),
            ..self
        }
    }

    pub fn compress_threshold(self, compress_threshold: i64) -> Self {
        Self {
            compress_threshold: Some(compress_threshold),
            ..self
        }
    }
}
