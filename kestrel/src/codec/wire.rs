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

use std::collections::HashMap;

use bytes::Bytes;

/// Call metadata that accompanies a request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireHeader {
    pub service: String,
    pub method: String,
    pub consumer: String,
    pub provider: String,
    pub timeout_millis: i64,
    pub attributes: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub header: WireHeader,
    pub body: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireStatus {
    Success,
    Failure,
}

/// A response as handed back by the transport. On `Failure` the body holds
/// a serialized [`ErrorDescriptor`](crate::invocation::ErrorDescriptor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    pub status: WireStatus,
    pub attributes: HashMap<String, String>,
    pub body: Bytes,
}

impl WireResponse {
    pub fn success(body: impl Into<Bytes>) -> Self {
        WireResponse {
            status: WireStatus::Success,
            attributes: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn failure(body: impl Into<Bytes>) -> Self {
        WireResponse {
            status: WireStatus::Failure,
            attributes: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn empty() -> Self {
        WireResponse::success(Bytes::new())
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}
