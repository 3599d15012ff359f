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

use std::{fmt, marker::PhantomData, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    config::{MethodConfig, ServiceConfig, ServiceDescriptor},
    error::{CodecError, RpcError},
};

use super::{CallFuture, Client};

pub(crate) fn from_reply<R: DeserializeOwned>(data: Option<Value>) -> Result<R, RpcError> {
    serde_json::from_value(data.unwrap_or(Value::Null))
        .map_err(|e| RpcError::Codec(CodecError::Serialize(e)))
}

/// A typed handle on an imported service.
pub struct ServiceProxy<S> {
    client: Client,
    service: Arc<ServiceConfig>,
    _marker: PhantomData<fn() -> S>,
}

impl<S> Clone for ServiceProxy<S> {
    fn clone(&self) -> Self {
        ServiceProxy {
            client: self.client.clone(),
            service: self.service.clone(),
            _marker: PhantomData,
        }
    }
}

impl<S: ServiceDescriptor> fmt::Debug for ServiceProxy<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProxy").field("service", &S::NAME).finish()
    }
}

impl<S: ServiceDescriptor> ServiceProxy<S> {
    pub(crate) fn new(client: Client, service: Arc<ServiceConfig>) -> Self {
        ServiceProxy {
            client,
            service,
            _marker: PhantomData,
        }
    }

    pub fn service_config(&self) -> &Arc<ServiceConfig> {
        &self.service
    }

    fn method(&self, name: &str, with_param: bool) -> Result<Arc<MethodConfig>, RpcError> {
        let method = self.service.method_config(name).ok_or_else(|| {
            RpcError::Config(format!("'{}' is not a method of {}", name, S::NAME))
        })?;
        match (method.param_type(), with_param) {
            (Some(declared), false) => Err(RpcError::Config(format!(
                "{}.{} expects a {} parameter",
                S::NAME,
                name,
                declared
            ))),
            (None, true) => Err(RpcError::Config(format!("{}.{} takes no parameter", S::NAME, name))),
            _ => Ok(method),
        }
    }

    /// Starts a call and hands back its pending result.
    pub fn invoke<P, R>(&self, method: &str, parameter: &P) -> CallFuture<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned + Send + 'static,
    {
        let prepared = self.method(method, true).and_then(|method| {
            let value = serde_json::to_value(parameter).map_err(|e| RpcError::Codec(CodecError::Serialize(e)))?;
            Ok((method, value))
        });
        match prepared {
            Ok((method, value)) => self.client.invoke(&self.service, method, Some(value), from_reply::<R>),
            Err(err) => CallFuture::ready(Err(err)),
        }
    }

    /// [`invoke`](Self::invoke) for methods declared without a parameter.
    pub fn invoke_empty<R>(&self, method: &str) -> CallFuture<R>
    where
        R: DeserializeOwned + Send + 'static,
    {
        match self.method(method, false) {
            Ok(method) => self.client.invoke(&self.service, method, None, from_reply::<R>),
            Err(err) => CallFuture::ready(Err(err)),
        }
    }

    pub async fn call<P, R>(&self, method: &str, parameter: &P) -> Result<R, RpcError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned + Send + 'static,
    {
        self.invoke(method, parameter).await
    }

    /// Blocks until the call completes. Only for methods not declared to
    /// return a future, and never from a thread that drives the runtime.
    pub fn call_blocking<P, R>(&self, method: &str, parameter: &P) -> Result<R, RpcError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned + Send + 'static,
    {
        if let Some(config) = self.service.method_config(method) {
            if config.is_async() {
                return Err(RpcError::Config(format!(
                    "{}.{} is declared async, use invoke",
                    S::NAME,
                    method
                )));
            }
        }
        self.invoke(method, parameter).get()
    }
}
