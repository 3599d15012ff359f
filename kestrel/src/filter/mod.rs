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

//! Interceptors which can preprocess or postprocess a call.
//!
//! An [`Interceptor`] is turned into a tower [`Layer`] over [`BoxHandler`],
//! so a chain is just the terminal handler with every interceptor layered on
//! top. The first interceptor in the list is the outermost one; any of them
//! can answer without calling [`Next::run`].
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use kestrel::{
//!     filter::{build_chain, handler_fn, Interceptor, Next},
//!     Invocation, Reply, RpcError,
//! };
//!
//! struct Tenant;
//!
//! #[async_trait::async_trait]
//! impl Interceptor for Tenant {
//!     async fn intercept(&self, invocation: Arc<Invocation>, next: Next) -> Result<Reply, RpcError> {
//!         invocation.set_attribute("tenant", "acme");
//!         next.run(invocation).await
//!     }
//! }
//!
//! let terminal = handler_fn(|_invocation: Arc<Invocation>| async { Ok::<_, RpcError>(Reply::new(None)) });
//! let chain = build_chain(terminal, &[Arc::new(Tenant)]);
//! ```
//!
//! [`Layer`]: https://docs.rs/tower/latest/tower/trait.Layer.html

mod baggage;
mod deadline;
mod trace;

use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use tower_layer::Layer;

pub use baggage::{BaggageInterceptor, BAGGAGE_PREFIX};
pub use deadline::{DeadlineInterceptor, DEADLINE_KEY, TIMEOUT_KEY};
pub(crate) use deadline::stamp_deadline;
pub use trace::TracingInterceptor;

use crate::{
    error::RpcError,
    invocation::{Invocation, Reply},
    BoxFuture,
};

/// Anything that can complete a call.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, invocation: Arc<Invocation>) -> BoxFuture<Reply, RpcError>;
}

pub type BoxHandler = Arc<dyn Handler>;

#[async_trait]
pub trait Interceptor: Send + Sync + 'static {
    async fn intercept(&self, invocation: Arc<Invocation>, next: Next) -> Result<Reply, RpcError>;
}

pub type BoxInterceptor = Arc<dyn Interceptor>;

/// The rest of the chain after the current interceptor.
#[derive(Clone)]
pub struct Next {
    inner: BoxHandler,
}

impl Next {
    pub async fn run(self, invocation: Arc<Invocation>) -> Result<Reply, RpcError> {
        self.inner.handle(invocation).await
    }
}

#[derive(Clone)]
pub struct InterceptorLayer {
    interceptor: BoxInterceptor,
}

impl InterceptorLayer {
    pub fn new(interceptor: BoxInterceptor) -> Self {
        InterceptorLayer { interceptor }
    }
}

impl Layer<BoxHandler> for InterceptorLayer {
    type Service = BoxHandler;

    fn layer(&self, inner: BoxHandler) -> Self::Service {
        Arc::new(Intercepted {
            interceptor: self.interceptor.clone(),
            next: Next { inner },
        })
    }
}

struct Intercepted {
    interceptor: BoxInterceptor,
    next: Next,
}

impl Handler for Intercepted {
    fn handle(&self, invocation: Arc<Invocation>) -> BoxFuture<Reply, RpcError> {
        let interceptor = self.interceptor.clone();
        let next = self.next.clone();
        Box::pin(async move { interceptor.intercept(invocation, next).await })
    }
}

/// Wraps `terminal` with `interceptors`, first one outermost. The chain is
/// immutable once built.
pub fn build_chain(terminal: BoxHandler, interceptors: &[BoxInterceptor]) -> BoxHandler {
    interceptors
        .iter()
        .rev()
        .fold(terminal, |inner, interceptor| {
            InterceptorLayer::new(interceptor.clone()).layer(inner)
        })
}

pub struct HandlerFn<F> {
    f: F,
}

impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Arc<Invocation>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Reply, RpcError>> + Send + 'static,
{
    fn handle(&self, invocation: Arc<Invocation>) -> BoxFuture<Reply, RpcError> {
        Box::pin((self.f)(invocation))
    }
}

/// A handler from an async closure.
pub fn handler_fn<F, Fut>(f: F) -> BoxHandler
where
    F: Fn(Arc<Invocation>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Reply, RpcError>> + Send + 'static,
{
    Arc::new(HandlerFn { f })
}
