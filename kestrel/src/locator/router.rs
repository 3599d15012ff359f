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

use crate::invocation::Invocation;

use super::ServiceInstance;

/// Instance metadata key matched against the service's configured group.
pub const GROUP_KEY: &str = "group";

pub trait Router: Debug + Send + Sync + 'static {
    fn route(&self, invocation: &Invocation, candidates: Vec<ServiceInstance>) -> Vec<ServiceInstance>;
}

pub type BoxRouter = Box<dyn Router>;

/// Candidates minus the excluded instances, compared by instance code.
pub fn exclude(candidates: &[ServiceInstance], exclusions: &[ServiceInstance]) -> Vec<ServiceInstance> {
    candidates
        .iter()
        .filter(|candidate| !exclusions.contains(candidate))
        .cloned()
        .collect()
}

/// Keeps instances whose `group` metadata matches the group the service was
/// imported with. Services imported without a group see every instance.
#[derive(Debug, Default, Clone, Copy)]
pub struct GroupRouter;

impl Router for GroupRouter {
    fn route(&self, invocation: &Invocation, candidates: Vec<ServiceInstance>) -> Vec<ServiceInstance> {
        match invocation.service_config().group() {
            None => candidates,
            Some(group) => candidates
                .into_iter()
                .filter(|instance| instance.metadata().get(GROUP_KEY).map(String::as_str) == Some(group))
                .collect(),
        }
    }
}
