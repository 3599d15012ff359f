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

#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use kestrel::{
    codec::{self, CodecOptions, WireRequest, WireResponse, JSON},
    connector::Connector,
    error::TransportError,
    invocation::ErrorDescriptor,
    locator::{DirectLocator, ServiceLocator},
    Invocation, MethodDescriptor, Reply, RpcError, ServiceDescriptor, ServiceInstance,
};
use serde_json::Value;

pub struct Greeter;

impl ServiceDescriptor for Greeter {
    const NAME: &'static str = "demo.Greeter";

    fn methods() -> Vec<MethodDescriptor> {
        vec![
            MethodDescriptor::new("sayHello").param::<String>().returns::<String>(),
            MethodDescriptor::new("countGreetings").returns_future::<u64>(),
        ]
    }
}

/// What a fake instance does with one request.
#[derive(Debug, Clone)]
pub enum Behavior {
    Echo,
    Answer(Value),
    Refuse,
    Timeout,
    Cancel,
    Business(&'static str),
    Broken,
}

/// A connector driven by per address scripts. Once an address's script is
/// used up it falls back to its default behavior, `Echo` unless set.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    scripts: Arc<Mutex<HashMap<String, VecDeque<Behavior>>>>,
    defaults: Arc<Mutex<HashMap<String, Behavior>>>,
    sent: Arc<Mutex<Vec<(String, WireRequest)>>>,
    remotes: Arc<Mutex<Vec<Option<String>>>>,
}

impl ScriptedConnector {
    pub fn script(&self, address: &str, behaviors: Vec<Behavior>) -> &Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(address.to_string(), behaviors.into());
        self
    }

    pub fn always(&self, address: &str, behavior: Behavior) -> &Self {
        self.defaults
            .lock()
            .unwrap()
            .insert(address.to_string(), behavior);
        self
    }

    /// Addresses in send order.
    pub fn sent_to(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(a, _)| a.clone()).collect()
    }

    /// The invocation's remote address as seen by each send.
    pub fn remote_addresses(&self) -> Vec<Option<String>> {
        self.remotes.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<WireRequest> {
        self.sent.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
    }

    fn next_behavior(&self, address: &str) -> Behavior {
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(address)
            .and_then(|script| script.pop_front());
        scripted.unwrap_or_else(|| {
            self.defaults
                .lock()
                .unwrap()
                .get(address)
                .cloned()
                .unwrap_or(Behavior::Echo)
        })
    }
}

fn plain_json() -> CodecOptions {
    CodecOptions::resolve(JSON, None, 0).unwrap()
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn send(
        &self,
        invocation: &Invocation,
        instance: &ServiceInstance,
        request: WireRequest,
    ) -> Result<WireResponse, TransportError> {
        let address = instance.address();
        self.sent.lock().unwrap().push((address.clone(), request.clone()));
        self.remotes.lock().unwrap().push(invocation.remote_address());
        invocation.set_local_address("127.0.0.1:40000");

        match self.next_behavior(&address) {
            Behavior::Echo => {
                let call = codec::decode_call(request).map_err(|e| TransportError::Other(e.into()))?;
                let reply = Reply::new(call.parameter).attach("served-by", address);
                codec::encode_reply(&reply, &plain_json()).map_err(|e| TransportError::Other(e.into()))
            }
            Behavior::Answer(value) => codec::encode_reply(&Reply::new(Some(value)), &plain_json())
                .map_err(|e| TransportError::Other(e.into())),
            Behavior::Refuse => Err(TransportError::Connect(format!("{} refused", address))),
            Behavior::Timeout => Err(TransportError::Timeout(format!(
                "{} did not answer in {}ms",
                address,
                invocation.timeout_millis()
            ))),
            Behavior::Cancel => Err(TransportError::Cancelled(format!("{} reset", address))),
            Behavior::Business(message) => {
                let reply = Reply::failure(ErrorDescriptor::business(message));
                codec::encode_reply(&reply, &plain_json()).map_err(|e| TransportError::Other(e.into()))
            }
            Behavior::Broken => Err(TransportError::Other("stream closed mid response".into())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Feedback {
    pub address: String,
    pub ok: bool,
    pub elapsed: Duration,
}

/// A direct locator that records every feedback it receives.
pub struct RecordingLocator {
    inner: DirectLocator,
    pub feedback: Arc<Mutex<Vec<Feedback>>>,
    pub destroyed: Arc<Mutex<u32>>,
}

impl RecordingLocator {
    pub fn new(addresses: &[&str]) -> Self {
        RecordingLocator {
            inner: DirectLocator::from_addresses("demo.Greeter", addresses).unwrap(),
            feedback: Default::default(),
            destroyed: Default::default(),
        }
    }
}

#[async_trait]
impl ServiceLocator for RecordingLocator {
    async fn locate(&self, invocation: &Invocation, exclusions: &[ServiceInstance]) -> Option<ServiceInstance> {
        self.inner.locate(invocation, exclusions).await
    }

    fn feedback(
        &self,
        instance: &ServiceInstance,
        invocation: &Invocation,
        outcome: Result<&Reply, &RpcError>,
        elapsed: Duration,
    ) {
        self.feedback.lock().unwrap().push(Feedback {
            address: instance.address(),
            ok: outcome.is_ok(),
            elapsed,
        });
        self.inner.feedback(instance, invocation, outcome, elapsed);
    }

    async fn destroy(&self) {
        *self.destroyed.lock().unwrap() += 1;
    }
}
