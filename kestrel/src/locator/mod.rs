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

//! Finding a live instance for a call.
//!
//! A [`ServiceLocator`] owns a snapshot of candidate instances per logical
//! provider. For each attempt it drops the excluded instances, applies its
//! routers, and lets a [`LoadBalance`] pick one. The retry loop reports every
//! attempt's outcome back through [`ServiceLocator::feedback`].

mod direct;
mod discovery;
pub mod loadbalance;
mod registry;
mod router;
mod status;

use std::{
    collections::HashMap,
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use direct::DirectLocator;
pub use discovery::{Discovery, MemoryDiscovery};
pub use loadbalance::{BoxLoadBalance, LoadBalance, RandomLoadBalance, RoundRobinLoadBalance};
pub use registry::{RegistryLocator, DEFAULT_REFRESH_INTERVAL};
pub use router::{exclude, BoxRouter, GroupRouter, Router, GROUP_KEY};
pub use status::{RpcStatus, StatusBook};

use crate::{
    error::RpcError,
    invocation::{Invocation, Reply},
};

/// One reachable provider endpoint. Two instances are the same instance
/// when their instance codes match, whatever else differs.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServiceInstance {
    instance_code: String,
    service_name: String,
    host: String,
    port: u16,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl ServiceInstance {
    /// The instance code defaults to `host:port`.
    pub fn new(service_name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        ServiceInstance {
            instance_code: format!("{}:{}", host, port),
            service_name: service_name.into(),
            host,
            port,
            metadata: HashMap::new(),
        }
    }

    /// Parses a `host:port` address.
    pub fn from_address(service_name: impl Into<String>, address: &str) -> Result<Self, RpcError> {
        let (host, port) = address
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| RpcError::Config(format!("address '{}' has no port", address)))?;
        if host.is_empty() {
            return Err(RpcError::Config(format!("address '{}' has no host", address)));
        }
        let port = port
            .parse::<u16>()
            .map_err(|e| RpcError::Config(format!("address '{}' has a bad port: {}", address, e)))?;
        Ok(ServiceInstance::new(service_name, host, port))
    }

    pub fn with_code(self, instance_code: impl Into<String>) -> Self {
        ServiceInstance {
            instance_code: instance_code.into(),
            ..self
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn instance_code(&self) -> &str {
        &self.instance_code
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }
}

impl PartialEq for ServiceInstance {
    fn eq(&self, other: &Self) -> bool {
        self.instance_code == other.instance_code
    }
}

impl Eq for ServiceInstance {}

impl Hash for ServiceInstance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.instance_code.hash(state);
    }
}

impl fmt::Debug for ServiceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.instance_code, self.host, self.port)
    }
}

#[async_trait]
pub trait ServiceLocator: Send + Sync + 'static {
    /// Picks one instance for the invocation, never one of `exclusions`.
    /// `None` when nothing is left.
    async fn locate(&self, invocation: &Invocation, exclusions: &[ServiceInstance]) -> Option<ServiceInstance>;

    /// Called exactly once per network attempt with how it went.
    fn feedback(
        &self,
        _instance: &ServiceInstance,
        _invocation: &Invocation,
        _outcome: Result<&Reply, &RpcError>,
        _elapsed: Duration,
    ) {
    }

    /// Starts tracking a logical provider. Subscribing twice is a no-op.
    async fn subscribe(&self, _service_name: &str) -> Result<(), RpcError> {
        Ok(())
    }

    /// Stops all background refreshing and releases the discovery backend.
    async fn destroy(&self) {}
}

pub type BoxLocator = Arc<dyn ServiceLocator>;

/// Exclusion, then routing, then balancing.
#[derive(Debug)]
pub struct Selector {
    routers: Vec<BoxRouter>,
    loadbalance: BoxLoadBalance,
}

impl Selector {
    pub fn new(loadbalance: BoxLoadBalance) -> Self {
        Selector {
            routers: vec![Box::new(GroupRouter)],
            loadbalance,
        }
    }

    pub fn with_router(mut self, router: BoxRouter) -> Self {
        self.routers.push(router);
        self
    }

    pub fn select(
        &self,
        invocation: &Invocation,
        candidates: &[ServiceInstance],
        exclusions: &[ServiceInstance],
    ) -> Option<ServiceInstance> {
        let routed = self
            .routers
            .iter()
            .fold(exclude(candidates, exclusions), |routed, router| {
                router.route(invocation, routed)
            });
        self.loadbalance.select(invocation.target_name(), &routed)
    }
}

impl Default for Selector {
    fn default() -> Self {
        Selector::new(Box::<RoundRobinLoadBalance>::default())
    }
}
