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

use std::any::type_name;

use serde_json::Value;

/// Declared shape of one remote method.
///
/// Types are recorded by name; the typed proxy checks call sites against
/// them before anything is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    name: String,
    params: Vec<&'static str>,
    return_type: &'static str,
    async_invoke: bool,
}

impl MethodDescriptor {
    /// A method that takes nothing and returns nothing.
    pub fn new(name: impl Into<String>) -> Self {
        MethodDescriptor {
            name: name.into(),
            params: Vec::new(),
            return_type: type_name::<()>(),
            async_invoke: false,
        }
    }

    /// A method taking and returning untyped values, used by generic calls.
    pub fn generic(name: impl Into<String>) -> Self {
        MethodDescriptor::new(name).param::<Value>().returns::<Value>()
    }

    pub fn param<P: ?Sized>(mut self) -> Self {
        self.params.push(type_name::<P>());
        self
    }

    pub fn returns<R: ?Sized>(self) -> Self {
        MethodDescriptor {
            return_type: type_name::<R>(),
            async_invoke: false,
            ..self
        }
    }

    /// The method completes through a future handed back to the caller
    /// instead of blocking it; `R` is the future's output.
    pub fn returns_future<R: ?Sized>(self) -> Self {
        MethodDescriptor {
            return_type: type_name::<R>(),
            async_invoke: true,
            ..self
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[&'static str] {
        &self.params
    }

    pub fn return_type(&self) -> &'static str {
        self.return_type
    }

    pub fn is_async(&self) -> bool {
        self.async_invoke
    }
}

/// A remote service interface that can be imported into a typed proxy.
///
/// ```
/// use kestrel::{MethodDescriptor, ServiceDescriptor};
///
/// struct Greeter;
///
/// impl ServiceDescriptor for Greeter {
///     const NAME: &'static str = "demo.Greeter";
///
///     fn methods() -> Vec<MethodDescriptor> {
///         vec![
///             MethodDescriptor::new("sayHello").param::<String>().returns::<String>(),
///             MethodDescriptor::new("ping").returns_future::<()>(),
///         ]
///     }
/// }
/// ```
pub trait ServiceDescriptor: Send + Sync + 'static {
    const NAME: &'static str;

    fn methods() -> Vec<MethodDescriptor>;
}
