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

use std::time::Duration;

use async_trait::async_trait;
use kestrel_logger::tracing;

use crate::{
    error::RpcError,
    invocation::{Invocation, Reply},
};

use super::{BoxLoadBalance, Selector, ServiceInstance, ServiceLocator, StatusBook};

/// A fixed list of instances, for direct links that bypass discovery.
#[derive(Debug)]
pub struct DirectLocator {
    instances: Vec<ServiceInstance>,
    selector: Selector,
    status: StatusBook,
}

impl DirectLocator {
    pub fn new(instances: Vec<ServiceInstance>) -> Self {
        DirectLocator {
            instances,
            selector: Selector::default(),
            status: StatusBook::default(),
        }
    }

    /// From `host:port` addresses.
    pub fn from_addresses<S: AsRef<str>>(service_name: &str, addresses: &[S]) -> Result<Self, RpcError> {
        let instances = addresses
            .iter()
            .map(|address| ServiceInstance::from_address(service_name, address.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DirectLocator::new(instances))
    }

    pub fn with_loadbalance(self, loadbalance: BoxLoadBalance) -> Self {
        DirectLocator {
            selector: Selector::new(loadbalance),
            ..self
        }
    }

    pub fn instances(&self) -> &[ServiceInstance] {
        &self.instances
    }

    pub fn status(&self) -> &StatusBook {
        &self.status
    }
}

#[async_trait]
impl ServiceLocator for DirectLocator {
    async fn locate(&self, invocation: &Invocation, exclusions: &[ServiceInstance]) -> Option<ServiceInstance> {
        self.selector.select(invocation, &self.instances, exclusions)
    }

    fn feedback(
        &self,
        instance: &ServiceInstance,
        _invocation: &Invocation,
        outcome: Result<&Reply, &RpcError>,
        elapsed: Duration,
    ) {
        if let Err(err) = outcome {
            tracing::debug!("direct instance {:?} failed after {:?}: {}", instance, elapsed, err);
        }
        self.status.record(instance.instance_code(), elapsed, outcome.is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::invocation;

    #[tokio::test]
    async fn test_locate_skips_exclusions() {
        let locator = DirectLocator::from_addresses("demo.Echo", &["127.0.0.1:8001", "127.0.0.1:8002"]).unwrap();
        let inv = invocation();
        let [a, b] = [locator.instances()[0].clone(), locator.instances()[1].clone()];

        for _ in 0..4 {
            assert_eq!(locator.locate(&inv, &[a.clone()]).await, Some(b.clone()));
        }
        assert_eq!(locator.locate(&inv, &[a, b]).await, None);
    }

    #[tokio::test]
    async fn test_feedback_feeds_status() {
        let locator = DirectLocator::from_addresses("demo.Echo", &["127.0.0.1:8001"]).unwrap();
        let inv = invocation();
        let instance = locator.locate(&inv, &[]).await.unwrap();

        let failure = RpcError::Timeout("slow".into());
        locator.feedback(&instance, &inv, Err(&failure), Duration::from_millis(12));
        locator.feedback(&instance, &inv, Ok(&Reply::new(None)), Duration::from_millis(4));

        let status = locator.status().get("127.0.0.1:8001").unwrap();
        assert_eq!(status.total(), 2);
        assert_eq!(status.failed(), 1);
        assert_eq!(status.max_elapsed(), 12);
    }

    #[test]
    fn test_bad_address() {
        assert!(DirectLocator::from_addresses("demo.Echo", &["nowhere"]).is_err());
    }
}
