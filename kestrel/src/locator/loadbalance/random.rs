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

use rand::Rng;

use super::{LoadBalance, ServiceInstance};

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomLoadBalance;

impl LoadBalance for RandomLoadBalance {
    fn do_select(&self, _service_name: &str, candidates: &[ServiceInstance]) -> Option<ServiceInstance> {
        let index = rand::thread_rng().gen_range(0..candidates.len());
        candidates.get(index).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_picks_a_candidate() {
        let candidates: Vec<_> = (0..4)
            .map(|i| ServiceInstance::new("greeter", "10.0.0.1", 8000 + i))
            .collect();
        for _ in 0..32 {
            let picked = RandomLoadBalance.select("greeter", &candidates).unwrap();
            assert!(candidates.contains(&picked));
        }
    }
}
