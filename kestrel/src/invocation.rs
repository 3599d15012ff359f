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
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    config::{MethodConfig, ServiceConfig},
    context::RequestContext,
    error::RpcError,
    status::Code,
};

/// One logical remote call.
///
/// Shared by reference between the interceptor chain, the retry loop and
/// the connector; attributes and addresses are the only mutable parts.
pub struct Invocation {
    service_name: String,
    method_name: String,
    parameter: Option<Value>,
    consumer: String,
    provider: String,
    timeout_millis: i64,
    attributes: DashMap<String, String>,
    remote_address: Mutex<Option<String>>,
    local_address: Mutex<Option<String>>,
    service_config: Arc<ServiceConfig>,
    method_config: Arc<MethodConfig>,
    context: Option<Arc<RequestContext>>,
}

impl Invocation {
    pub fn new(
        service_config: Arc<ServiceConfig>,
        method_config: Arc<MethodConfig>,
        parameter: Option<Value>,
    ) -> Self {
        Invocation {
            service_name: service_config.name().to_string(),
            method_name: method_config.method_name().to_string(),
            parameter,
            consumer: service_config.consumer().to_string(),
            provider: service_config.provider().to_string(),
            timeout_millis: method_config.timeout_millis(),
            attributes: DashMap::new(),
            remote_address: Mutex::new(None),
            local_address: Mutex::new(None),
            service_config,
            method_config,
            context: None,
        }
    }

    pub fn with_context(self, context: Arc<RequestContext>) -> Self {
        Invocation {
            context: Some(context),
            ..self
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn parameter(&self) -> Option<&Value> {
        self.parameter.as_ref()
    }

    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// The name discovery is keyed on: the provider when one is configured,
    /// the service name otherwise.
    pub fn target_name(&self) -> &str {
        if self.provider.is_empty() {
            &self.service_name
        } else {
            &self.provider
        }
    }

    pub fn timeout_millis(&self) -> i64 {
        self.timeout_millis
    }

    pub fn attributes(&self) -> &DashMap<String, String> {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<String> {
        self.attributes.get(key).map(|v| v.value().clone())
    }

    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn remote_address(&self) -> Option<String> {
        self.remote_address
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_remote_address(&self, address: impl Into<String>) {
        *self
            .remote_address
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(address.into());
    }

    pub fn local_address(&self) -> Option<String> {
        self.local_address
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_local_address(&self, address: impl Into<String>) {
        *self
            .local_address
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(address.into());
    }

    pub fn service_config(&self) -> &Arc<ServiceConfig> {
        &self.service_config
    }

    pub fn method_config(&self) -> &Arc<MethodConfig> {
        &self.method_config
    }

    pub fn context(&self) -> Option<&Arc<RequestContext>> {
        self.context.as_ref()
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("service", &self.service_name)
            .field("method", &self.method_name)
            .field("consumer", &self.consumer)
            .field("provider", &self.provider)
            .field("timeout_millis", &self.timeout_millis)
            .field("remote_address", &self.remote_address())
            .finish()
    }
}

/// Structured error carried by a failed reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl ErrorDescriptor {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        ErrorDescriptor {
            code: code.as_i32(),
            message: message.into(),
            trace: None,
        }
    }

    /// An error raised by the remote implementation itself.
    pub fn business(message: impl Into<String>) -> Self {
        ErrorDescriptor::new(Code::Business, message)
    }

    pub fn with_trace(self, trace: impl Into<String>) -> Self {
        ErrorDescriptor {
            trace: Some(trace.into()),
            ..self
        }
    }

    pub fn is_business(&self) -> bool {
        Code::from_i32(self.code) == Code::Business
    }

    pub fn into_error(self) -> RpcError {
        if self.is_business() {
            RpcError::Business {
                code: self.code,
                message: self.message,
                trace: self.trace,
            }
        } else {
            RpcError::Remote {
                code: self.code,
                message: self.message,
                trace: self.trace,
            }
        }
    }
}

/// Outcome of a call: either a value (possibly none) or an error
/// descriptor, never both. Attachments ride along either way.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    outcome: Result<Option<Value>, ErrorDescriptor>,
    attachments: HashMap<String, String>,
}

impl Reply {
    pub fn new(data: Option<Value>) -> Self {
        Reply {
            outcome: Ok(data),
            attachments: HashMap::new(),
        }
    }

    pub fn failure(error: ErrorDescriptor) -> Self {
        Reply {
            outcome: Err(error),
            attachments: HashMap::new(),
        }
    }

    pub fn attach(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attachments.insert(key.into(), value.into());
        self
    }

    pub fn with_attachments(mut self, attachments: HashMap<String, String>) -> Self {
        self.attachments.extend(attachments);
        self
    }

    pub fn data(&self) -> Option<&Value> {
        self.outcome.as_ref().ok().and_then(Option::as_ref)
    }

    pub fn error(&self) -> Option<&ErrorDescriptor> {
        self.outcome.as_ref().err()
    }

    pub fn is_error(&self) -> bool {
        self.outcome.is_err()
    }

    pub fn attachments(&self) -> &HashMap<String, String> {
        &self.attachments
    }

    pub fn into_result(self) -> Result<Option<Value>, RpcError> {
        self.outcome.map_err(ErrorDescriptor::into_error)
    }
}
