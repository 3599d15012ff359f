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

//! Client side invocation pipeline.
//!
//! A call travels through an immutable interceptor chain whose terminal
//! handler is the [`cluster::Failover`] retry orchestrator. The orchestrator
//! asks a [`locator::ServiceLocator`] for candidates, encodes the call with the
//! [`codec`], and hands it to an external [`connector::Connector`].

pub mod client;
pub mod cluster;
pub mod codec;
pub mod config;
pub mod connector;
pub mod context;
pub mod error;
pub mod filter;
pub mod invocation;
pub mod locator;
pub mod status;

use std::{future::Future, pin::Pin};

pub use kestrel_config::{CallOptions, ClientConfig, ReferenceConfig};
pub use kestrel_logger as logger;

pub use client::{CallFuture, Client, ClientBuilder, GenericService, ServiceProxy};
pub use config::{MethodDescriptor, ServiceDescriptor};
pub use context::RequestContext;
pub use error::RpcError;
pub use invocation::{Invocation, Reply};
pub use locator::ServiceInstance;

pub type StdError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type BoxFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'static>>;
