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

use std::{collections::HashMap, path::PathBuf, str::FromStr};

use anyhow::Error;
use serde::{Deserialize, Serialize};

use kestrel_logger::tracing;
use kestrel_utils::yaml_util::yaml_file_parser;

use crate::{get_config_location, KESTREL_KEY};

pub mod client;
pub mod logger;
pub mod options;
pub mod reference;

use client::ClientConfig;
use logger::LoggerConfig;
use reference::ReferenceConfig;

/// used to storage all structed config, from some source: file, api..;
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct RootConfig {
    #[serde(skip)]
    pub location: PathBuf,

    #[serde(default)]
    pub logger: LoggerConfig,

    #[serde(default)]
    pub client: ClientConfig,

    /// keyed by service name
    #[serde(default)]
    pub references: HashMap<String, ReferenceConfig>,
}

impl RootConfig {
    pub fn load() -> Result<Self, Error> {
        let location = get_config_location();
        tracing::info!("load kestrel config from {:?}", location);
        let mut conf: HashMap<String, RootConfig> = yaml_file_parser(location.clone())?;
        let mut root_config = conf
            .remove(KESTREL_KEY)
            .ok_or_else(|| anyhow::anyhow!("missing top level key '{}'", KESTREL_KEY))?;
        root_config.location = location;
        root_config.validate()?;
        Ok(root_config)
    }

    pub fn reference(&self, service: &str) -> Option<&ReferenceConfig> {
        self.references.get(service)
    }
}

impl FromStr for RootConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut conf: HashMap<String, RootConfig> = serde_yaml::from_str(s)?;
        let root_config = conf
            .remove(KESTREL_KEY)
            .ok_or_else(|| anyhow::anyhow!("missing top level key '{}'", KESTREL_KEY))?;
        root_config.validate()?;
        Ok(root_config)
    }
}

pub trait ConfigValidator {
    fn validate(&self) -> Result<(), Error>;
}

impl ConfigValidator for RootConfig {
    fn validate(&self) -> Result<(), Error> {
        self.client.validate()?;
        for (name, reference) in self.references.iter() {
            reference
                .validate()
                .map_err(|e| anyhow::anyhow!("reference {}: {}", name, e))?;
        }
        Ok(())
    }
}
