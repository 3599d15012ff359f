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

mod call;
mod generic;
mod proxy;

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use kestrel_config::{ClientConfig, ReferenceConfig, RootConfig};
use kestrel_logger::tracing::{debug, info};
use serde_json::Value;
use tokio::runtime::Handle;

pub use call::CallFuture;
pub use generic::GenericService;
pub use proxy::ServiceProxy;

use crate::{
    cluster::Failover,
    config::{MethodConfig, ServiceConfig, ServiceDescriptor},
    connector::Connector,
    context::{ContextExt, RequestContext},
    error::RpcError,
    filter::{build_chain, BoxInterceptor, Interceptor},
    invocation::Invocation,
    locator::{BoxLocator, DirectLocator, ServiceLocator},
};

/// Entry point for importing remote services.
///
/// Cloning is cheap; clones share the locator, the connector and the
/// closed state.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    references: HashMap<String, ReferenceConfig>,
    connector: Arc<dyn Connector>,
    locator: Option<BoxLocator>,
    interceptors: Vec<BoxInterceptor>,
    runtime: Handle,
    closed: AtomicBool,
}

#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    references: HashMap<String, ReferenceConfig>,
    connector: Option<Arc<dyn Connector>>,
    locator: Option<BoxLocator>,
    interceptors: Vec<BoxInterceptor>,
    runtime: Option<Handle>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        ClientBuilder::default()
    }

    /// Client defaults and per service references from a loaded config.
    pub fn from_config(root: &RootConfig) -> Self {
        ClientBuilder {
            config: root.client.clone(),
            references: root.references.clone(),
            ..Default::default()
        }
    }

    /// Like [`from_config`](Self::from_config) with the process wide config,
    /// also installing the logger at the configured level.
    pub fn from_root_config() -> Self {
        let root = kestrel_config::get_root_config();
        kestrel_logger::init_with_level(&root.logger.level);
        ClientBuilder::from_config(root)
    }

    pub fn config(self, config: ClientConfig) -> Self {
        ClientBuilder { config, ..self }
    }

    pub fn reference(mut self, service_name: impl Into<String>, reference: ReferenceConfig) -> Self {
        self.references.insert(service_name.into(), reference);
        self
    }

    pub fn connector(self, connector: impl Connector) -> Self {
        ClientBuilder {
            connector: Some(Arc::new(connector)),
            ..self
        }
    }

    /// Used for every service imported without a direct url.
    pub fn locator(self, locator: impl ServiceLocator) -> Self {
        ClientBuilder {
            locator: Some(Arc::new(locator)),
            ..self
        }
    }

    /// Appends an interceptor. Earlier interceptors wrap later ones.
    pub fn interceptor(mut self, interceptor: impl Interceptor) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// The runtime calls are spawned on. Defaults to the runtime `build` is
    /// called from.
    pub fn runtime(self, runtime: Handle) -> Self {
        ClientBuilder {
            runtime: Some(runtime),
            ..self
        }
    }

    pub fn build(self) -> Result<Client, RpcError> {
        let connector = self
            .connector
            .ok_or_else(|| RpcError::Config("a connector is required".into()))?;
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| {
                RpcError::Config("no tokio runtime; build inside one or pass a runtime handle".into())
            })?,
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                config: self.config,
                references: self.references,
                connector,
                locator: self.locator,
                interceptors: self.interceptors,
                runtime,
                closed: AtomicBool::new(false),
            }),
        })
    }
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Imports `S` as a typed proxy. Without an explicit reference the one
    /// configured under `S::NAME` is used, if any.
    ///
    /// Fails when a method is declared twice or takes more than one
    /// parameter, when a configured serializer or compressor is unknown, or
    /// when the service has neither a direct url nor a locator to use.
    pub fn importing<S: ServiceDescriptor>(
        &self,
        reference: Option<ReferenceConfig>,
    ) -> Result<ServiceProxy<S>, RpcError> {
        let reference = reference.unwrap_or_else(|| self.configured_reference(S::NAME));
        let service = self.service_config(S::NAME, reference)?;
        service.register_methods(S::methods())?;
        info!("imported {} with methods {:?}", S::NAME, service.method_names());
        Ok(ServiceProxy::new(self.clone(), service))
    }

    /// An untyped handle on `service_name` as served by `application`.
    /// Methods are registered on first use.
    pub fn generic(&self, application: &str, service_name: &str) -> Result<GenericService, RpcError> {
        let mut reference = self.configured_reference(service_name);
        if !application.is_empty() {
            reference.provider = application.to_string();
        }
        let service = self.service_config(service_name, reference)?;
        info!("generic import of {} from {}", service_name, service.provider());
        Ok(GenericService::new(self.clone(), service))
    }

    /// Stops the locator's background work. Calls made afterwards fail
    /// immediately. Closing twice is a no-op.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("closing client");
        if let Some(locator) = &self.inner.locator {
            locator.destroy().await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn configured_reference(&self, service_name: &str) -> ReferenceConfig {
        self.inner
            .references
            .get(service_name)
            .cloned()
            .unwrap_or_default()
    }

    fn service_config(&self, service_name: &str, reference: ReferenceConfig) -> Result<Arc<ServiceConfig>, RpcError> {
        let urls = reference.direct_urls();
        let locator: BoxLocator = if urls.is_empty() {
            self.inner.locator.clone().ok_or_else(|| {
                RpcError::Config(format!(
                    "service '{}' has no direct url and the client has no locator",
                    service_name
                ))
            })?
        } else {
            debug!("{} links directly to {:?}", service_name, urls);
            Arc::new(DirectLocator::from_addresses(service_name, &urls)?)
        };

        let terminal = Arc::new(Failover::new(locator, self.inner.connector.clone()));
        let handler = build_chain(terminal, &self.inner.interceptors);

        Ok(Arc::new(ServiceConfig::new(
            service_name,
            self.inner.config.clone(),
            reference,
            handler,
        )?))
    }

    /// Runs one call on the client runtime.
    ///
    /// A request context is created on the calling thread, becoming a child
    /// of whatever context is active there, and is carried explicitly into
    /// the spawned call before being closed again on the calling thread.
    pub(crate) fn invoke<T, F>(
        &self,
        service: &Arc<ServiceConfig>,
        method: Arc<MethodConfig>,
        parameter: Option<Value>,
        convert: F,
    ) -> CallFuture<T>
    where
        T: Send + 'static,
        F: FnOnce(Option<Value>) -> Result<T, RpcError> + Send + 'static,
    {
        if self.is_closed() {
            return CallFuture::ready(Err(RpcError::Invoke("client is closed".into())));
        }

        let context = RequestContext::create();
        let invocation = Arc::new(
            Invocation::new(service.clone(), method, parameter).with_context(context.clone()),
        );
        let handler = service.handler().clone();

        let call = async move {
            let reply = handler.handle(invocation).await?;
            convert(reply.into_result()?)
        };
        let handle = self.inner.runtime.spawn(call.with_context(context.clone()));
        context.close();

        CallFuture::spawned(handle)
    }
}
