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

use kestrel_config::types::client::{
    DEFAULT_CONNECT_RETRY, DEFAULT_TIMEOUT_MILLIS, DEFAULT_TIMEOUT_RETRY,
};

use crate::{
    codec::{get_serializer, CodecOptions, JSON},
    error::RpcError,
};

use super::{MethodDescriptor, ResolvedOptions};

/// Resolved, immutable settings of one remote method.
#[derive(Debug, Clone)]
pub struct MethodConfig {
    method_name: String,
    param_type: Option<&'static str>,
    return_type: &'static str,
    async_invoke: bool,
    timeout_millis: i64,
    timeout_retry: u32,
    connect_retry: u32,
    codec: CodecOptions,
}

impl MethodConfig {
    pub fn builder(descriptor: MethodDescriptor) -> MethodConfigBuilder {
        MethodConfigBuilder {
            descriptor,
            timeout_millis: DEFAULT_TIMEOUT_MILLIS,
            timeout_retry: DEFAULT_TIMEOUT_RETRY as u32,
            connect_retry: DEFAULT_CONNECT_RETRY as u32,
            codec: None,
        }
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn param_type(&self) -> Option<&'static str> {
        self.param_type
    }

    pub fn return_type(&self) -> &'static str {
        self.return_type
    }

    pub fn is_async(&self) -> bool {
        self.async_invoke
    }

    pub fn timeout_millis(&self) -> i64 {
        self.timeout_millis
    }

    /// Number of full connect cycles a call may run when cycles time out.
    pub fn timeout_retry(&self) -> u32 {
        self.timeout_retry
    }

    /// Number of instances a single connect cycle may try.
    pub fn connect_retry(&self) -> u32 {
        self.connect_retry
    }

    pub fn codec(&self) -> &CodecOptions {
        &self.codec
    }
}

pub struct MethodConfigBuilder {
    descriptor: MethodDescriptor,
    timeout_millis: i64,
    timeout_retry: u32,
    connect_retry: u32,
    codec: Option<CodecOptions>,
}

impl MethodConfigBuilder {
    pub fn timeout_millis(self, timeout_millis: i64) -> Self {
        Self {
            timeout_millis,
            ..self
        }
    }

    pub fn timeout_retry(self, timeout_retry: u32) -> Self {
        Self {
            timeout_retry,
            ..self
        }
    }

    pub fn connect_retry(self, connect_retry: u32) -> Self {
        Self {
            connect_retry,
            ..self
        }
    }

    pub fn codec(self, codec: CodecOptions) -> Self {
        Self {
            codec: Some(codec),
            ..self
        }
    }

    /// Applies every resolved option, looking the codec plugins up by name.
    pub fn options(self, options: &ResolvedOptions) -> Result<Self, RpcError> {
        Ok(Self {
            timeout_millis: options.timeout_millis,
            timeout_retry: options.timeout_retry,
            connect_retry: options.connect_retry,
            codec: Some(options.codec()?),
            ..self
        })
    }

    /// Fails when the method declares more than one parameter.
    pub fn build(self) -> Result<MethodConfig, RpcError> {
        let descriptor = self.descriptor;
        if descriptor.params().len() > 1 {
            return Err(RpcError::Config(format!(
                "method '{}' declares {} parameters, at most one is supported",
                descriptor.name(),
                descriptor.params().len()
            )));
        }

        let codec = match self.codec {
            Some(codec) => codec,
            None => CodecOptions::new(
                get_serializer(JSON)
                    .ok_or_else(|| RpcError::Config("json serializer is not registered".into()))?,
            ),
        };

        Ok(MethodConfig {
            method_name: descriptor.name().to_string(),
            param_type: descriptor.params().first().copied(),
            return_type: descriptor.return_type(),
            async_invoke: descriptor.is_async(),
            timeout_millis: self.timeout_millis.max(1),
            timeout_retry: self.timeout_retry.max(1),
            connect_retry: self.connect_retry.max(1),
            codec,
        })
    }
}
