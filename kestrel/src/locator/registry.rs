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

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use dashmap::DashMap;
use kestrel_logger::tracing::{debug, warn};
use tokio::{
    select,
    sync::{watch, Notify, OnceCell},
    time::{interval_at, Instant, MissedTickBehavior},
};

use crate::{
    error::RpcError,
    invocation::{Invocation, Reply},
};

use super::{BoxLoadBalance, Discovery, Selector, ServiceInstance, ServiceLocator, StatusBook};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

type Snapshot = Arc<Vec<ServiceInstance>>;

struct Subscription {
    snapshot: Arc<watch::Sender<Snapshot>>,
    loaded: Arc<OnceCell<()>>,
    close: Arc<Notify>,
}

/// Locates instances through a [`Discovery`] backend.
///
/// The first lookup of a provider subscribes to it: the instance list is
/// loaded right away, then refreshed on a fixed interval by a background
/// task. Every refresh swaps in a whole new snapshot, so readers never see a
/// half updated list. A failed refresh keeps the previous snapshot.
pub struct RegistryLocator {
    discovery: Arc<dyn Discovery>,
    refresh_interval: Duration,
    selector: Selector,
    status: StatusBook,
    services: DashMap<String, Subscription>,
    destroyed: AtomicBool,
}

impl RegistryLocator {
    pub fn new(discovery: Arc<dyn Discovery>) -> Self {
        RegistryLocator {
            discovery,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            selector: Selector::default(),
            status: StatusBook::default(),
            services: DashMap::new(),
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn with_refresh_interval(mut self, refresh_interval: Duration) -> Self {
        self.refresh_interval = refresh_interval;
        self
    }

    pub fn with_loadbalance(mut self, loadbalance: BoxLoadBalance) -> Self {
        self.selector = Selector::new(loadbalance);
        self
    }

    pub fn status(&self) -> &StatusBook {
        &self.status
    }

    /// The cached instances of a provider, empty when not subscribed.
    pub fn snapshot(&self, service_name: &str) -> Snapshot {
        self.services
            .get(service_name)
            .map(|s| s.snapshot.borrow().clone())
            .unwrap_or_default()
    }

    fn start(&self, service_name: &str) -> Subscription {
        let (tx, _) = watch::channel(Snapshot::default());
        let snapshot = Arc::new(tx);
        let close = Arc::new(Notify::new());

        let discovery = self.discovery.clone();
        let service_name = service_name.to_string();
        let period = self.refresh_interval;
        let (tx, notified) = (snapshot.clone(), close.clone());

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                select! {
                    _ = notified.notified() => {
                        debug!("stop refreshing {}", service_name);
                        break;
                    }
                    _ = ticker.tick() => refresh(discovery.as_ref(), &service_name, &tx).await,
                }
            }
        });

        Subscription {
            snapshot,
            loaded: Arc::new(OnceCell::new()),
            close,
        }
    }

    fn stop_all(&self) {
        self.services.retain(|_, subscription| {
            subscription.close.notify_one();
            false
        });
    }
}

impl Drop for RegistryLocator {
    fn drop(&mut self) {
        self.stop_all();
    }
}

async fn refresh(discovery: &dyn Discovery, service_name: &str, snapshot: &watch::Sender<Snapshot>) {
    match discovery.list_healthy(service_name).await {
        Ok(instances) => {
            debug!("refreshed {}: {} healthy instance(s)", service_name, instances.len());
            snapshot.send_replace(Arc::new(instances));
        }
        Err(err) => warn!(
            "refresh of {} failed, keeping {} cached instance(s): {}",
            service_name,
            snapshot.borrow().len(),
            err
        ),
    }
}

#[async_trait]
impl ServiceLocator for RegistryLocator {
    async fn locate(&self, invocation: &Invocation, exclusions: &[ServiceInstance]) -> Option<ServiceInstance> {
        let service_name = invocation.target_name();
        if let Err(err) = self.subscribe(service_name).await {
            warn!("cannot locate {}: {}", service_name, err);
            return None;
        }
        let snapshot = self.snapshot(service_name);
        self.selector.select(invocation, &snapshot, exclusions)
    }

    fn feedback(
        &self,
        instance: &ServiceInstance,
        invocation: &Invocation,
        outcome: Result<&Reply, &RpcError>,
        elapsed: Duration,
    ) {
        if let Err(err) = outcome {
            debug!(
                "{:?} failed {}.{} after {:?}: {}",
                instance,
                invocation.service_name(),
                invocation.method_name(),
                elapsed,
                err
            );
        }
        self.status.record(instance.instance_code(), elapsed, outcome.is_ok());
    }

    async fn subscribe(&self, service_name: &str) -> Result<(), RpcError> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(RpcError::Invoke("service locator has been destroyed".into()));
        }

        let (snapshot, loaded, close) = {
            let subscription = self
                .services
                .entry(service_name.to_string())
                .or_insert_with(|| self.start(service_name));
            (
                subscription.snapshot.clone(),
                subscription.loaded.clone(),
                subscription.close.clone(),
            )
        };

        // destroyed while subscribing, the refresher may have been missed
        if self.destroyed.load(Ordering::SeqCst) {
            self.services.remove(service_name);
            close.notify_one();
            return Err(RpcError::Invoke("service locator has been destroyed".into()));
        }

        loaded
            .get_or_init(|| async {
                if let Err(err) = self.discovery.subscribe(service_name).await {
                    warn!("discovery subscribe of {} failed: {}", service_name, err);
                }
                refresh(self.discovery.as_ref(), service_name, &snapshot).await;
            })
            .await;
        Ok(())
    }

    async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_all();
        self.discovery.destroy().await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::{filter::tests::invocation, locator::MemoryDiscovery, StdError};

    #[derive(Default)]
    struct Flaky {
        inner: MemoryDiscovery,
        calls: AtomicUsize,
        failing: AtomicBool,
    }

    #[async_trait]
    impl Discovery for Flaky {
        async fn list_healthy(&self, service_name: &str) -> Result<Vec<ServiceInstance>, StdError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err("registry unavailable".into());
            }
            self.inner.list_healthy(service_name).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_locate_loads_immediately() {
        let discovery = Arc::new(Flaky::default());
        discovery.inner.register(ServiceInstance::new("demo.Echo", "10.0.0.1", 8001));
        let locator = RegistryLocator::new(discovery.clone()).with_refresh_interval(Duration::from_secs(10));

        let picked = locator.locate(&invocation(), &[]).await;
        assert_eq!(picked.map(|i| i.address()).as_deref(), Some("10.0.0.1:8001"));
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 1);

        // subscribing again does not reload
        locator.subscribe("demo.Echo").await.unwrap();
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_refresh_and_failure_keeps_snapshot() {
        let discovery = Arc::new(Flaky::default());
        discovery.inner.register(ServiceInstance::new("demo.Echo", "10.0.0.1", 8001));
        let locator = RegistryLocator::new(discovery.clone()).with_refresh_interval(Duration::from_secs(10));
        locator.subscribe("demo.Echo").await.unwrap();
        assert_eq!(locator.snapshot("demo.Echo").len(), 1);

        discovery.inner.register(ServiceInstance::new("demo.Echo", "10.0.0.2", 8001));
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(locator.snapshot("demo.Echo").len(), 2);

        discovery.failing.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(discovery.calls.load(Ordering::SeqCst) >= 3);
        assert_eq!(locator.snapshot("demo.Echo").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_stops_refreshing() {
        let discovery = Arc::new(Flaky::default());
        let locator = RegistryLocator::new(discovery.clone()).with_refresh_interval(Duration::from_secs(1));
        locator.subscribe("demo.Echo").await.unwrap();

        locator.destroy().await;
        let calls = discovery.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(discovery.calls.load(Ordering::SeqCst), calls);

        assert!(locator.subscribe("demo.Echo").await.is_err());
        assert!(locator.locate(&invocation(), &[]).await.is_none());
        // idempotent
        locator.destroy().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_refreshing() {
        let discovery = Arc::new(Flaky::default());
        let locator = RegistryLocator::new(discovery.clone()).with_refresh_interval(Duration::from_secs(1));
        locator.subscribe("demo.Echo").await.unwrap();
        locator.subscribe("demo.Other").await.unwrap();

        drop(locator);
        let calls = discovery.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(discovery.calls.load(Ordering::SeqCst), calls);
        // both refreshers are gone along with their handles on the backend
        assert_eq!(Arc::strong_count(&discovery), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_registry_locates_nothing() {
        let locator = RegistryLocator::new(Arc::new(MemoryDiscovery::new()));
        assert!(locator.locate(&invocation(), &[]).await.is_none());
    }
}
