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

use std::sync::Arc;

use serde_json::Value;

use crate::{
    config::{MethodDescriptor, ServiceConfig},
    error::RpcError,
};

use super::{CallFuture, Client};

/// Calls any method of a service by name with untyped values.
#[derive(Clone)]
pub struct GenericService {
    client: Client,
    service: Arc<ServiceConfig>,
}

impl GenericService {
    pub(crate) fn new(client: Client, service: Arc<ServiceConfig>) -> Self {
        GenericService { client, service }
    }

    pub fn service_config(&self) -> &Arc<ServiceConfig> {
        &self.service
    }

    pub fn invoke(&self, method: &str, parameter: Option<Value>) -> CallFuture<Option<Value>> {
        match self.service.register_method(MethodDescriptor::generic(method)) {
            Ok(method) => self.client.invoke(&self.service, method, parameter, Ok),
            Err(err) => CallFuture::ready(Err(err)),
        }
    }

    pub async fn call(&self, method: &str, parameter: Option<Value>) -> Result<Option<Value>, RpcError> {
        self.invoke(method, parameter).await
    }
}
