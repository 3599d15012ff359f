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

use std::fmt::Debug;

mod random;
mod round_robin;

pub use random::RandomLoadBalance;
pub use round_robin::RoundRobinLoadBalance;

use super::ServiceInstance;

pub type BoxLoadBalance = Box<dyn LoadBalance>;

pub trait LoadBalance: Debug + Send + Sync + 'static {
    /// No candidates yields `None` and a single candidate is returned as is;
    /// neither case touches balancing state.
    fn select(&self, service_name: &str, candidates: &[ServiceInstance]) -> Option<ServiceInstance> {
        match candidates {
            [] => None,
            [only] => Some(only.clone()),
            _ => self.do_select(service_name, candidates),
        }
    }

    /// Picks among two or more candidates.
    fn do_select(&self, service_name: &str, candidates: &[ServiceInstance]) -> Option<ServiceInstance>;
}

/// A fresh balancer by name. Each locator owns its own, so balancing state
/// is never shared between locators.
pub fn get_loadbalance(name: &str) -> Option<BoxLoadBalance> {
    match name.trim().to_ascii_lowercase().as_str() {
        "roundrobin" | "round_robin" | "round-robin" => {
            Some(Box::<RoundRobinLoadBalance>::default())
        }
        "random" => Some(Box::<RandomLoadBalance>::default()),
        _ => None,
    }
}
