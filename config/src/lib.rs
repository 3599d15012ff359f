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

use once_cell::sync::Lazy;

use kestrel_logger::tracing;

pub use crate::types::{
    client::ClientConfig, logger::LoggerConfig, options::CallOptions,
    reference::ReferenceConfig, RootConfig,
};
pub use location::{get_config_location, set_config_file_path};

pub mod location;
pub mod types;

pub const KESTREL_KEY: &str = "kestrel";
pub const DEFAULT_CONFIG_FILE: &str = "kestrel.yaml";
pub const ENV_KESTREL_CONFIG_PATH: &str = "KESTREL_CONFIG_PATH";
pub const ENV_KESTREL_CONFIG_FILE: &str = "KESTREL_CONFIG_FILE";

static ROOT_CONFIG: Lazy<RootConfig> = Lazy::new(|| match RootConfig::load() {
    Ok(config) => config,
    Err(err) => {
        tracing::warn!("failed to load kestrel config, fall back to defaults: {}", err);
        RootConfig::default()
    }
});

/// The process-wide configuration, loaded once from [`get_config_location`].
pub fn get_root_config() -> &'static RootConfig {
    &ROOT_CONFIG
}
