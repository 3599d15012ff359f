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

use kestrel_config::{
    types::client::{
        DEFAULT_COMPRESS_THRESHOLD, DEFAULT_CONNECT_RETRY, DEFAULT_SERIALIZER,
        DEFAULT_TIMEOUT_MILLIS, DEFAULT_TIMEOUT_RETRY,
    },
    CallOptions, ClientConfig,
};

use crate::{codec::CodecOptions, error::RpcError};

/// Options after falling back method, then service, then client.
/// Unset or non-positive numbers and empty names fall through to the next
/// level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub timeout_millis: i64,
    pub timeout_retry: u32,
    pub connect_retry: u32,
    pub serializer: String,
    pub compressor: Option<String>,
    pub compress_threshold: usize,
}

fn first_positive(levels: [Option<i64>; 3], default: i64) -> i64 {
    levels
        .into_iter()
        .flatten()
        .find(|v| *v > 0)
        .unwrap_or(default)
}

fn first_named(levels: [Option<&String>; 3]) -> Option<String> {
    levels
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(|s| s.to_string())
}

impl ResolvedOptions {
    pub fn resolve(method: Option<&CallOptions>, service: &CallOptions, client: &ClientConfig) -> Self {
        let method = method.cloned().unwrap_or_default();

        let timeout_millis = first_positive(
            [method.timeout_millis, service.timeout_millis, Some(client.timeout_millis)],
            DEFAULT_TIMEOUT_MILLIS,
        );
        let timeout_retry = first_positive(
            [
                method.timeout_retry.map(i64::from),
                service.timeout_retry.map(i64::from),
                Some(i64::from(client.timeout_retry)),
            ],
            i64::from(DEFAULT_TIMEOUT_RETRY),
        );
        let connect_retry = first_positive(
            [
                method.connect_retry.map(i64::from),
                service.connect_retry.map(i64::from),
                Some(i64::from(client.connect_retry)),
            ],
            i64::from(DEFAULT_CONNECT_RETRY),
        );
        let compress_threshold = first_positive(
            [method.compress_threshold, service.compress_threshold, Some(client.compress_threshold)],
            DEFAULT_COMPRESS_THRESHOLD,
        );

        ResolvedOptions {
            timeout_millis,
            timeout_retry: u32::try_from(timeout_retry).unwrap_or(u32::MAX),
            connect_retry: u32::try_from(connect_retry).unwrap_or(u32::MAX),
            serializer: first_named([
                method.serializer.as_ref(),
                service.serializer.as_ref(),
                Some(&client.serializer),
            ])
            .unwrap_or_else(|| DEFAULT_SERIALIZER.to_string()),
            compressor: first_named([
                method.compressor.as_ref(),
                service.compressor.as_ref(),
                client.compressor.as_ref(),
            ]),
            compress_threshold: usize::try_from(compress_threshold).unwrap_or(usize::MAX),
        }
    }

    pub fn codec(&self) -> Result<CodecOptions, RpcError> {
        CodecOptions::resolve(&self.serializer, self.compressor.as_deref(), self.compress_threshold)
    }
}
