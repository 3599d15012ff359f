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

use anyhow::Error;
use serde::{Deserialize, Serialize};

use super::{options::CallOptions, ConfigValidator};

/// A consumer side import of one service.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// comma separated `host:port` list, bypasses discovery when present
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub options: CallOptions,
    #[serde(default)]
    pub methods: HashMap<String, CallOptions>,
}

impl ReferenceConfig {
    /// Splits `url` into its `host:port` entries.
    pub fn direct_urls(&self) -> Vec<String> {
        match &self.url {
            None => Vec::new(),
            Some(url) => url
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn method_options(&self, method: &str) -> Option<&CallOptions> {
        self.methods.get(method)
    }
}

impl ConfigValidator for ReferenceConfig {
    fn validate(&self) -> Result<(), Error> {
        for url in self.direct_urls() {
            let (host, port) = url
                .rsplit_once(':')
                .ok_or_else(|| anyhow::anyhow!("direct url {} has no port", url))?;
            if host.is_empty() {
                return Err(anyhow::anyhow!("direct url {} has no host", url));
            }
            port.parse::<u16>()
                .map_err(|e| anyhow::anyhow!("direct url {} has a bad port: {}", url, e))?;
        }
        Ok(())
    }
}
