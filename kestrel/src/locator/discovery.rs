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

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use kestrel_logger::tracing::debug;

use crate::StdError;

use super::ServiceInstance;

/// A service registry the locator can poll.
#[async_trait]
pub trait Discovery: Send + Sync + 'static {
    /// Healthy instances of a logical provider. An unknown provider is an
    /// empty list, not an error.
    async fn list_healthy(&self, service_name: &str) -> Result<Vec<ServiceInstance>, StdError>;

    /// Hint that `service_name` will be polled from now on.
    async fn subscribe(&self, _service_name: &str) -> Result<(), StdError> {
        Ok(())
    }

    async fn destroy(&self) {}
}

#[derive(Debug, Clone)]
struct Entry {
    instance: ServiceInstance,
    healthy: bool,
}

/// In process registry, handy for tests and single binary deployments.
#[derive(Debug, Default, Clone)]
pub struct MemoryDiscovery {
    services: Arc<DashMap<String, Vec<Entry>>>,
}

impl MemoryDiscovery {
    pub fn new() -> MemoryDiscovery {
        MemoryDiscovery::default()
    }

    /// Adds a healthy instance under its service name, replacing an instance
    /// with the same code.
    pub fn register(&self, instance: ServiceInstance) {
        debug!("register {:?} for {}", instance, instance.service_name());
        let mut entries = self.services.entry(instance.service_name().to_string()).or_default();
        entries.retain(|e| e.instance != instance);
        entries.push(Entry {
            instance,
            healthy: true,
        });
    }

    pub fn unregister(&self, service_name: &str, instance_code: &str) -> bool {
        match self.services.get_mut(service_name) {
            None => false,
            Some(mut entries) => {
                let before = entries.len();
                entries.retain(|e| e.instance.instance_code() != instance_code);
                entries.len() != before
            }
        }
    }

    pub fn set_healthy(&self, service_name: &str, instance_code: &str, healthy: bool) {
        if let Some(mut entries) = self.services.get_mut(service_name) {
            for entry in entries.iter_mut() {
                if entry.instance.instance_code() == instance_code {
                    entry.healthy = healthy;
                }
            }
        }
    }
}

#[async_trait]
impl Discovery for MemoryDiscovery {
    async fn list_healthy(&self, service_name: &str) -> Result<Vec<ServiceInstance>, StdError> {
        Ok(self
            .services
            .get(service_name)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.healthy)
                    .map(|e| e.instance.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_health() {
        let discovery = MemoryDiscovery::new();
        discovery.register(ServiceInstance::new("greeter", "10.0.0.1", 8001));
        discovery.register(ServiceInstance::new("greeter", "10.0.0.2", 8001));
        // same code replaces
        discovery.register(ServiceInstance::new("greeter", "10.0.0.2", 8001).with_metadata("zone", "b"));

        let listed = discovery.list_healthy("greeter").await.unwrap();
        assert_eq!(listed.len(), 2);

        discovery.set_healthy("greeter", "10.0.0.1:8001", false);
        let listed = discovery.list_healthy("greeter").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].metadata().get("zone").map(String::as_str), Some("b"));

        assert!(discovery.unregister("greeter", "10.0.0.2:8001"));
        assert!(!discovery.unregister("greeter", "10.0.0.2:8001"));
        assert!(discovery.list_healthy("greeter").await.unwrap().is_empty());
        assert!(discovery.list_healthy("unknown").await.unwrap().is_empty());
    }
}
