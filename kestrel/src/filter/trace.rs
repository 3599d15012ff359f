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

use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use kestrel_logger::tracing::{self, Instrument};

use crate::{
    error::RpcError,
    invocation::{Invocation, Reply},
};

use super::{Interceptor, Next};

/// Runs the rest of the chain inside a span and logs the outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingInterceptor;

#[async_trait]
impl Interceptor for TracingInterceptor {
    async fn intercept(&self, invocation: Arc<Invocation>, next: Next) -> Result<Reply, RpcError> {
        let span = tracing::info_span!(
            "call",
            service = %invocation.service_name(),
            method = %invocation.method_name(),
        );
        let start = Instant::now();
        let result = next.run(invocation.clone()).instrument(span).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(reply) if reply.is_error() => tracing::debug!(
                "{}.{} answered with an error after {:?}",
                invocation.service_name(),
                invocation.method_name(),
                elapsed
            ),
            Ok(_) => tracing::debug!(
                "{}.{} completed in {:?} via {:?}",
                invocation.service_name(),
                invocation.method_name(),
                elapsed,
                invocation.remote_address()
            ),
            Err(err) => tracing::warn!(
                "{}.{} failed after {:?}: {}",
                invocation.service_name(),
                invocation.method_name(),
                elapsed,
                err
            ),
        }
        result
    }
}
