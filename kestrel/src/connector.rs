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

use async_trait::async_trait;

use crate::{
    codec::{WireRequest, WireResponse},
    error::TransportError,
    invocation::Invocation,
    locator::ServiceInstance,
};

/// The network transport. Owns connection pooling and enforces the per call
/// timeout; the pipeline adds no deadline of its own.
///
/// Implementations report a failed send through [`TransportError`]:
/// `Connect` when the instance was never reached, `Timeout`/`Cancelled`
/// when the deadline passed or the send was abandoned, `Other` for anything
/// that happened after the connection was established.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn send(
        &self,
        invocation: &Invocation,
        instance: &ServiceInstance,
        request: WireRequest,
    ) -> Result<WireResponse, TransportError>;
}
