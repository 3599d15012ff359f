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
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use dashmap::DashMap;

/// Call statistics of one instance, fed by locator feedback.
#[derive(Debug, Default)]
pub struct RpcStatus {
    total: AtomicU64,
    failed: AtomicU64,
    total_elapsed: AtomicU64,
    failed_elapsed: AtomicU64,
    max_elapsed: AtomicU64,
    failed_max_elapsed: AtomicU64,
    succeeded_max_elapsed: AtomicU64,
}

impl RpcStatus {
    pub fn record(&self, elapsed: Duration, succeeded: bool) {
        let millis = elapsed.as_millis() as u64;
        self.total.fetch_add(1, Ordering::SeqCst);
        self.total_elapsed.fetch_add(millis, Ordering::SeqCst);
        self.max_elapsed.fetch_max(millis, Ordering::SeqCst);
        if succeeded {
            self.succeeded_max_elapsed.fetch_max(millis, Ordering::SeqCst);
        } else {
            self.failed.fetch_add(1, Ordering::SeqCst);
            self.failed_elapsed.fetch_add(millis, Ordering::SeqCst);
            self.failed_max_elapsed.fetch_max(millis, Ordering::SeqCst);
        }
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn succeeded(&self) -> u64 {
        self.total().saturating_sub(self.failed())
    }

    pub fn total_elapsed(&self) -> u64 {
        self.total_elapsed.load(Ordering::SeqCst)
    }

    pub fn failed_elapsed(&self) -> u64 {
        self.failed_elapsed.load(Ordering::SeqCst)
    }

    pub fn max_elapsed(&self) -> u64 {
        self.max_elapsed.load(Ordering::SeqCst)
    }

    pub fn failed_max_elapsed(&self) -> u64 {
        self.failed_max_elapsed.load(Ordering::SeqCst)
    }

    pub fn succeeded_max_elapsed(&self) -> u64 {
        self.succeeded_max_elapsed.load(Ordering::SeqCst)
    }

    pub fn average_elapsed(&self) -> u64 {
        match self.total() {
            0 => 0,
            total => self.total_elapsed() / total,
        }
    }
}

/// Statistics keyed by instance code.
#[derive(Debug, Default)]
pub struct StatusBook {
    instances: DashMap<String, Arc<RpcStatus>>,
}

impl StatusBook {
    pub fn record(&self, instance_code: &str, elapsed: Duration, succeeded: bool) {
        self.get_or_create(instance_code).record(elapsed, succeeded);
    }

    pub fn get(&self, instance_code: &str) -> Option<Arc<RpcStatus>> {
        self.instances.get(instance_code).map(|s| s.value().clone())
    }

    pub fn remove(&self, instance_code: &str) -> Option<Arc<RpcStatus>> {
        self.instances.remove(instance_code).map(|(_, s)| s)
    }

    fn get_or_create(&self, instance_code: &str) -> Arc<RpcStatus> {
        if let Some(status) = self.get(instance_code) {
            return status;
        }
        self.instances
            .entry(instance_code.to_string())
            .or_default()
            .value()
            .clone()
    }
}
