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

use anyhow::Error;
use serde::{Deserialize, Serialize};

use super::ConfigValidator;

pub const DEFAULT_TIMEOUT_MILLIS: i64 = 3000;
pub const DEFAULT_CONNECT_RETRY: i32 = 1;
pub const DEFAULT_TIMEOUT_RETRY: i32 = 1;
pub const DEFAULT_SERIALIZER: &str = "json";
pub const DEFAULT_COMPRESS_THRESHOLD: i64 = 2048;

/// Client level defaults, the last stop of option resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub consumer: String,
    #[serde(default = "default_timeout_millis")]
    pub timeout_millis: i64,
    #[serde(default = "default_connect_retry")]
    pub connect_retry: i32,
    #[serde(default = "default_timeout_retry")]
    pub timeout_retry: i32,
    #[serde(default = "default_serializer")]
    pub serializer: String,
    #[serde(default)]
    pub compressor: Option<String>,
    #[serde(default = "default_compress_threshold")]
    pub compress_threshold: i64,
}

fn default_timeout_millis() -> i64 {
    DEFAULT_TIMEOUT_MILLIS
}

fn default_connect_retry() -> i32 {
    DEFAULT_CONNECT_RETRY
}

fn default_timeout_retry() -> i32 {
    DEFAULT_TIMEOUT_RETRY
}

fn default_serializer() -> String {
    DEFAULT_SERIALIZER.to_string()
}

fn default_compress_threshold() -> i64 {
    DEFAULT_COMPRESS_THRESHOLD
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            consumer: String::new(),
            timeout_millis: DEFAULT_TIMEOUT_MILLIS,
            connect_retry: DEFAULT_CONNECT_RETRY,
            timeout_retry: DEFAULT_TIMEOUT_RETRY,
            serializer: default_serializer(),
            compressor: None,
            compress_threshold: DEFAULT_COMPRESS_THRESHOLD,
        }
    }
}

impl ClientConfig {
    pub fn consumer(self, consumer: String) -> Self {
        Self { consumer, ..self }
    }

    pub fn timeout_millis(self, timeout_millis: i64) -> Self {
        Self {
            timeout_millis,
            ..self
        }
    }

    pub fn connect_retry(self, connect_retry: i32) -> Self {
        Self {
            connect_retry,
            ..self
        }
    }

    pub fn timeout_retry(self, timeout_retry: i32) -> Self {
        Self {
            timeout_retry,
            ..self
        }
    }

    pub fn serializer(self, serializer: String) -> Self {
        Self { serializer, ..self }
    }

    pub fn compressor(self, compressor: Option<String>) -> Self {
        Self { compressor, ..self }
    }

    pub fn compress_threshold(self, compress_threshold: i64) -> Self {
        Self {
            compress_threshold,
            ..self
        }
    }
}

impl ConfigValidator for ClientConfig {
    fn validate(&self) -> Result<(), Error> {
        if self.timeout_millis <= 0 {
            return Err(anyhow::anyhow!(
                "client timeout_millis must be positive, got {}",
                self.timeout_millis
            ));
        }
        if self.connect_retry <= 0 || self.timeout_retry <= 0 {
            return Err(anyhow::anyhow!(
                "client retry budgets must be positive, got connect_retry={} timeout_retry={}",
                self.connect_retry,
                self.timeout_retry
            ));
        }
        if self.serializer.trim().is_empty() {
            return Err(anyhow::anyhow!("client serializer must not be empty"));
        }
        Ok(())
    }
}
