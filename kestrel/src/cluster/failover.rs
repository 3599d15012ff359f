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

use kestrel_logger::tracing::{debug, error, warn};

use crate::{
    codec::{self, WireRequest},
    connector::Connector,
    error::RpcError,
    filter::{stamp_deadline, Handler, DEADLINE_KEY},
    invocation::{Invocation, Reply},
    locator::{BoxLocator, ServiceInstance},
    BoxFuture,
};

/// Terminal handler of every chain: locate, send, and retry.
///
/// Two nested budgets drive a call. A connect cycle tries up to
/// `connect_retry` distinct instances, excluding each one that could not be
/// reached, and ends in an access error when the budget or the candidates
/// run out. A timed out or cancelled send ends the cycle; the call then
/// starts a fresh cycle with empty exclusions, up to `timeout_retry` cycles
/// in total. Any other outcome, including a business error reply, completes
/// the call as is.
///
/// The worst case is `connect_retry * timeout_retry` sends, each bounded by
/// the connector's timeout. A deadline stamped into the attributes is
/// renewed at the start of every retried cycle.
#[derive(Clone)]
pub struct Failover {
    locator: BoxLocator,
    connector: Arc<dyn Connector>,
}

impl Failover {
    pub fn new(locator: BoxLocator, connector: Arc<dyn Connector>) -> Self {
        Failover { locator, connector }
    }

    pub async fn invoke(&self, invocation: Arc<Invocation>) -> Result<Reply, RpcError> {
        let mut request = codec::encode_call(&invocation)?;
        let timeout_retry = invocation.method_config().timeout_retry();

        let mut cycle = 1;
        loop {
            match self.connect_cycle(&invocation, &request).await {
                Err(err) if err.is_timeout() && cycle < timeout_retry => {
                    warn!(
                        "{}.{} timed out in cycle {}/{}, retrying: {}",
                        invocation.service_name(),
                        invocation.method_name(),
                        cycle,
                        timeout_retry,
                        err
                    );
                    cycle += 1;
                    if invocation.attribute(DEADLINE_KEY).is_some() {
                        stamp_deadline(&invocation)?;
                        request = codec::encode_call(&invocation)?;
                    }
                }
                outcome => return outcome,
            }
        }
    }

    async fn connect_cycle(&self, invocation: &Invocation, request: &WireRequest) -> Result<Reply, RpcError> {
        let connect_retry = invocation.method_config().connect_retry();
        let mut exclusions: Vec<ServiceInstance> = Vec::new();
        let mut last_error = None;

        for attempt in 1..=connect_retry {
            let instance = match self.locator.locate(invocation, &exclusions).await {
                Some(instance) => instance,
                None => break,
            };
            invocation.set_remote_address(instance.address());

            let start = Instant::now();
            let sent = self.connector.send(invocation, &instance, request.clone()).await;
            let elapsed = start.elapsed();

            let outcome = match sent {
                Ok(response) => codec::decode_reply(invocation, response).map_err(RpcError::from),
                Err(err) => Err(RpcError::from_transport(err, &instance.address())),
            };
            self.locator.feedback(&instance, invocation, outcome.as_ref(), elapsed);

            match outcome {
                Err(err) if err.is_connect() => {
                    warn!(
                        "attempt {}/{} of {}.{} could not reach {:?}: {}",
                        attempt,
                        connect_retry,
                        invocation.service_name(),
                        invocation.method_name(),
                        instance,
                        err
                    );
                    exclusions.push(instance);
                    last_error = Some(err);
                }
                outcome => {
                    debug!(
                        "{}.{} settled on {:?} after {:?}",
                        invocation.service_name(),
                        invocation.method_name(),
                        instance,
                        elapsed
                    );
                    return outcome;
                }
            }
        }

        error!(
            "no instance of {}.{} reachable after {} attempt(s)",
            invocation.service_name(),
            invocation.method_name(),
            exclusions.len()
        );
        Err(RpcError::Access {
            provider: invocation.provider().to_string(),
            service: invocation.service_name().to_string(),
            attempts: exclusions.len() as u32,
            cause: last_error.map(|e| e.to_string()),
        })
    }
}

impl Handler for Failover {
    fn handle(&self, invocation: Arc<Invocation>) -> BoxFuture<Reply, RpcError> {
        let failover = self.clone();
        Box::pin(async move { failover.invoke(invocation).await })
    }
}
