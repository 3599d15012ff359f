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

use bytes::Bytes;
use dashmap::DashMap;
use lazy_static::lazy_static;
use serde_json::Value;

use crate::error::CodecError;

pub const JSON: &str = "json";

/// Turns parameter and return payloads into bytes and back.
///
/// Payloads travel through the pipeline as [`Value`]; the typed proxy
/// converts them from and to the declared Rust types with serde.
pub trait Serializer: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn serialize(&self, value: &Value) -> Result<Bytes, CodecError>;

    fn deserialize(&self, bytes: &[u8]) -> Result<Value, CodecError>;
}

pub type BoxSerializer = Arc<dyn Serializer>;

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn name(&self) -> &str {
        JSON
    }

    fn serialize(&self, value: &Value) -> Result<Bytes, CodecError> {
        Ok(Bytes::from(serde_json::to_vec(value)?))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

lazy_static! {
    static ref SERIALIZERS: DashMap<String, BoxSerializer> = {
        let map: DashMap<String, BoxSerializer> = DashMap::new();
        map.insert(JSON.to_string(), Arc::new(JsonSerializer));
        map
    };
}

/// Registers a serializer under its own name, replacing any previous one.
pub fn register_serializer(serializer: BoxSerializer) -> Option<BoxSerializer> {
    SERIALIZERS.insert(serializer.name().to_ascii_lowercase(), serializer)
}

pub fn get_serializer(name: &str) -> Option<BoxSerializer> {
    SERIALIZERS
        .get(&name.trim().to_ascii_lowercase())
        .map(|entry| entry.value().clone())
}
