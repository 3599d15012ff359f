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

use crate::{
    error::RpcError,
    invocation::{Invocation, Reply},
};

use super::{Interceptor, Next};

pub const BAGGAGE_PREFIX: &str = "baggage.";

/// Copies request context entries whose key starts with a prefix into the
/// invocation attributes, so they travel in the wire header. Attributes set
/// explicitly on the invocation win.
#[derive(Debug, Clone)]
pub struct BaggageInterceptor {
    prefix: String,
}

impl BaggageInterceptor {
    pub fn new(prefix: impl Into<String>) -> Self {
        BaggageInterceptor {
            prefix: prefix.into(),
        }
    }
}

impl Default for BaggageInterceptor {
    fn default() -> Self {
        BaggageInterceptor::new(BAGGAGE_PREFIX)
    }
}

#[async_trait]
impl Interceptor for BaggageInterceptor {
    async fn intercept(&self, invocation: Arc<Invocation>, next: Next) -> Result<Reply, RpcError> {
        if let Some(context) = invocation.context() {
            for (key, value) in context.entries() {
                if key.starts_with(&self.prefix) {
                    invocation.attributes().entry(key).or_insert(value);
                }
            }
        }
        next.run(invocation).await
    }
}
