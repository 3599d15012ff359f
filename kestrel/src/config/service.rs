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

use std::{collections::HashSet, sync::Arc};

use dashmap::DashMap;
use kestrel_config::{ClientConfig, ReferenceConfig};

use crate::{codec::CodecOptions, error::RpcError, filter::BoxHandler};

use super::{MethodConfig, MethodDescriptor, ResolvedOptions};

/// An imported remote service.
///
/// Method configs are append only: once a method is registered its config
/// never changes, and registering it again is a no-op.
pub struct ServiceConfig {
    name: String,
    consumer: String,
    provider: String,
    group: Option<String>,
    reference: ReferenceConfig,
    client: ClientConfig,
    codec: CodecOptions,
    connect_retry: u32,
    timeout_retry: u32,
    method_configs: DashMap<String, Arc<MethodConfig>>,
    handler: BoxHandler,
}

impl ServiceConfig {
    pub fn new(
        name: impl Into<String>,
        client: ClientConfig,
        reference: ReferenceConfig,
        handler: BoxHandler,
    ) -> Result<Self, RpcError> {
        let name = name.into();
        let resolved = ResolvedOptions::resolve(None, &reference.options, &client);
        let codec = resolved.codec()?;

        Ok(ServiceConfig {
            consumer: client.consumer.clone(),
            provider: reference.provider.clone(),
            group: reference.group.clone(),
            connect_retry: resolved.connect_retry,
            timeout_retry: resolved.timeout_retry,
            codec,
            name,
            reference,
            client,
            method_configs: DashMap::new(),
            handler,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn codec(&self) -> &CodecOptions {
        &self.codec
    }

    pub fn connect_retry(&self) -> u32 {
        self.connect_retry
    }

    pub fn timeout_retry(&self) -> u32 {
        self.timeout_retry
    }

    /// Entry point of the interceptor chain for calls to this service.
    pub fn handler(&self) -> &BoxHandler {
        &self.handler
    }

    pub fn method_config(&self, method: &str) -> Option<Arc<MethodConfig>> {
        self.method_configs.get(method).map(|m| m.value().clone())
    }

    pub fn method_names(&self) -> Vec<String> {
        self.method_configs.iter().map(|m| m.key().clone()).collect()
    }

    /// Registers a batch of declared methods. Two descriptors sharing a name
    /// are rejected, as only one signature per method name is supported.
    pub fn register_methods(&self, descriptors: Vec<MethodDescriptor>) -> Result<(), RpcError> {
        let mut seen = HashSet::new();
        for descriptor in &descriptors {
            if !seen.insert(descriptor.name()) {
                return Err(RpcError::Config(format!(
                    "method '{}' of service '{}' is declared more than once",
                    descriptor.name(),
                    self.name
                )));
            }
        }

        for descriptor in descriptors {
            self.register_method(descriptor)?;
        }
        Ok(())
    }

    /// Returns the registered config for the method, building and
    /// registering one from `descriptor` if it is absent.
    pub fn register_method(&self, descriptor: MethodDescriptor) -> Result<Arc<MethodConfig>, RpcError> {
        if let Some(existing) = self.method_config(descriptor.name()) {
            return Ok(existing);
        }

        let resolved = ResolvedOptions::resolve(
            self.reference.method_options(descriptor.name()),
            &self.reference.options,
            &self.client,
        );
        let method = Arc::new(MethodConfig::builder(descriptor).options(&resolved)?.build()?);

        let entry = self
            .method_configs
            .entry(method.method_name().to_string())
            .or_insert(method);
        Ok(entry.value().clone())
    }
}

#[cfg(test)]
impl ServiceConfig {
    pub(crate) fn for_test(name: &str) -> Arc<ServiceConfig> {
        use crate::{filter::Handler, invocation::Invocation, invocation::Reply, BoxFuture};

        struct Unreachable;

        impl Handler for Unreachable {
            fn handle(&self, _: Arc<Invocation>) -> BoxFuture<Reply, RpcError> {
                Box::pin(async { Err(RpcError::Invoke("no handler in tests".into())) })
            }
        }

        let service = ServiceConfig::new(
            name,
            ClientConfig::default(),
            ReferenceConfig::default(),
            Arc::new(Unreachable),
        );
        match service {
            Ok(service) => Arc::new(service),
            Err(err) => panic!("{}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use kestrel_config::CallOptions;

    use super::*;

    fn service_with(reference: ReferenceConfig) -> ServiceConfig {
        let base = ServiceConfig::for_test("demo.Greeter");
        ServiceConfig::new(
            "demo.Greeter",
            ClientConfig::default().consumer("order-service".into()),
            reference,
            base.handler().clone(),
        )
        .unwrap()
    }

    #[test]
    fn test_registration_is_idempotent() {
        let service = service_with(ReferenceConfig::default());
        let first = service
            .register_method(MethodDescriptor::new("sayHello").param::<String>().returns::<String>())
            .unwrap();
        let second = service.register_method(MethodDescriptor::generic("sayHello")).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.return_type(), std::any::type_name::<String>());
        assert_eq!(service.method_names(), vec!["sayHello".to_string()]);
    }

    #[test]
    fn test_overloads_are_rejected() {
        let service = service_with(ReferenceConfig::default());
        let err = service
            .register_methods(vec![
                MethodDescriptor::new("get").param::<u32>(),
                MethodDescriptor::new("get").param::<String>(),
            ])
            .unwrap_err();
        assert!(matches!(err, RpcError::Config(_)));
        assert!(service.method_config("get").is_none());
    }

    #[test]
    fn test_method_options_are_applied() {
        let mut reference = ReferenceConfig {
            provider: "greeter-provider".into(),
            options: CallOptions::default().timeout_millis(500).connect_retry(3),
            ..Default::default()
        };
        reference
            .methods
            .insert("sayHello".into(), CallOptions::default().timeout_millis(200).timeout_retry(2));

        let service = service_with(reference);
        service
            .register_methods(vec![
                MethodDescriptor::new("sayHello").param::<String>().returns::<String>(),
                MethodDescriptor::new("ping"),
            ])
            .unwrap();

        let say_hello = service.method_config("sayHello").unwrap();
        assert_eq!(say_hello.timeout_millis(), 200);
        assert_eq!(say_hello.timeout_retry(), 2);
        assert_eq!(say_hello.connect_retry(), 3);

        let ping = service.method_config("ping").unwrap();
        assert_eq!(ping.timeout_millis(), 500);
        assert_eq!(ping.timeout_retry(), 1);

        assert_eq!(service.consumer(), "order-service");
        assert_eq!(service.provider(), "greeter-provider");
        assert_eq!(service.connect_retry(), 3);
    }
}
