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

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;

use super::{LoadBalance, ServiceInstance};

/// One monotonically increasing counter per logical service; the pick is
/// `counter % candidates`.
#[derive(Debug, Default)]
pub struct RoundRobinLoadBalance {
    counters: DashMap<String, AtomicUsize>,
}

impl RoundRobinLoadBalance {
    fn next(&self, service_name: &str) -> usize {
        if let Some(counter) = self.counters.get(service_name) {
            return counter.fetch_add(1, Ordering::Relaxed);
        }
        self.counters
            .entry(service_name.to_string())
            .or_default()
            .fetch_add(1, Ordering::Relaxed)
    }
}

impl LoadBalance for RoundRobinLoadBalance {
    fn do_select(&self, service_name: &str, candidates: &[ServiceInstance]) -> Option<ServiceInstance> {
        let index = self.next(service_name) % candidates.len();
        candidates.get(index).cloned()
    }
}
