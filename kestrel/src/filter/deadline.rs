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
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use kestrel_logger::tracing;

use crate::{
    error::RpcError,
    invocation::{Invocation, Reply},
};

use super::{Interceptor, Next};

pub const TIMEOUT_KEY: &str = "kestrel.timeout-millis";
pub const DEADLINE_KEY: &str = "kestrel.deadline-millis";

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

/// Stamps the call's timeout and absolute deadline into the attributes.
///
/// 1. the deadline is `now + timeout_millis`
/// 2. if the request context carries an earlier deadline under
///    [`DEADLINE_KEY`], that one is kept
/// 3. if the inherited deadline has already passed, the call fails with a
///    timeout before reaching the network
///
/// The deadline bounds one connect cycle. The retry orchestrator stamps it
/// again before every timeout retry, so each cycle gets a full timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeadlineInterceptor;

#[async_trait]
impl Interceptor for DeadlineInterceptor {
    async fn intercept(&self, invocation: Arc<Invocation>, next: Next) -> Result<Reply, RpcError> {
        stamp_deadline(&invocation)?;
        next.run(invocation).await
    }
}

pub(crate) fn stamp_deadline(invocation: &Invocation) -> Result<(), RpcError> {
    let now = now_millis();
    let mut deadline = now + invocation.timeout_millis().max(0) as u128;

    let inherited = invocation
        .context()
        .and_then(|context| context.get(DEADLINE_KEY))
        .and_then(|value| value.parse::<u128>().ok());
    if let Some(inherited) = inherited {
        if inherited <= now {
            tracing::debug!(
                "inherited deadline {} passed before {}.{} was sent",
                inherited,
                invocation.service_name(),
                invocation.method_name()
            );
            return Err(RpcError::Timeout(format!(
                "deadline exceeded before calling {}.{}",
                invocation.service_name(),
                invocation.method_name()
            )));
        }
        deadline = deadline.min(inherited);
    }

    invocation.set_attribute(TIMEOUT_KEY, invocation.timeout_millis().to_string());
    invocation.set_attribute(DEADLINE_KEY, deadline.to_string());
    Ok(())
}
