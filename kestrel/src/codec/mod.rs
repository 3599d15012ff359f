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

//! Message encoding for calls and replies.
//!
//! The request side serializes the parameter with the method's serializer and
//! compresses the result only when it is strictly longer than the configured
//! threshold. The compressor id is recorded in the invocation attributes and
//! copied into the wire header, so the peer can pick the matching inflater.

mod compression;
mod serialization;
mod wire;

use std::{collections::HashMap, fmt};

use bytes::Bytes;
use serde_json::Value;

pub use compression::{
    get_compressor, register_compressor, BoxCompressor, CompressionEncoding, Compressor, DEFLATE,
    GZIP,
};
pub use serialization::{
    get_serializer, register_serializer, BoxSerializer, JsonSerializer, Serializer, JSON,
};
pub use wire::{WireHeader, WireRequest, WireResponse, WireStatus};

use crate::{
    error::{CodecError, RpcError},
    invocation::{ErrorDescriptor, Invocation, Reply},
};

pub const SERIALIZER_KEY: &str = "kestrel.serializer";
pub const COMPRESSOR_KEY: &str = "kestrel.compressor";

/// The serializer and compression policy in effect for one method.
#[derive(Clone)]
pub struct CodecOptions {
    serializer: BoxSerializer,
    compressor: Option<BoxCompressor>,
    compress_threshold: usize,
}

impl CodecOptions {
    pub fn new(serializer: BoxSerializer) -> Self {
        CodecOptions {
            serializer,
            compressor: None,
            compress_threshold: 0,
        }
    }

    pub fn with_compressor(self, compressor: BoxCompressor, compress_threshold: usize) -> Self {
        CodecOptions {
            compressor: Some(compressor),
            compress_threshold,
            ..self
        }
    }

    /// Looks both plugins up by name. `None`, an empty name or `"none"`
    /// disables compression.
    pub fn resolve(
        serializer: &str,
        compressor: Option<&str>,
        compress_threshold: usize,
    ) -> Result<Self, RpcError> {
        let serializer = get_serializer(serializer)
            .ok_or_else(|| RpcError::Config(format!("serializer '{}' is not registered", serializer)))?;
        let options = CodecOptions::new(serializer);

        match compressor.map(str::trim) {
            None | Some("") => Ok(options),
            Some(id) if id.eq_ignore_ascii_case("none") => Ok(options),
            Some(id) => {
                let compressor = get_compressor(id)
                    .ok_or_else(|| RpcError::Config(format!("compressor '{}' is not registered", id)))?;
                Ok(options.with_compressor(compressor, compress_threshold))
            }
        }
    }

    pub fn serializer(&self) -> &BoxSerializer {
        &self.serializer
    }

    pub fn compressor(&self) -> Option<&BoxCompressor> {
        self.compressor.as_ref()
    }

    pub fn compress_threshold(&self) -> usize {
        self.compress_threshold
    }

    /// Compresses `body` when a compressor is configured and the body is
    /// longer than the threshold. Returns the compressor id that was applied.
    fn deflate(&self, body: Bytes) -> Result<(Bytes, Option<&str>), CodecError> {
        match &self.compressor {
            Some(compressor) if body.len() > self.compress_threshold => {
                Ok((compressor.compress(&body)?, Some(compressor.id())))
            }
            _ => Ok((body, None)),
        }
    }
}

impl fmt::Debug for CodecOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecOptions")
            .field("serializer", &self.serializer.name())
            .field("compressor", &self.compressor.as_ref().map(|c| c.id().to_string()))
            .field("compress_threshold", &self.compress_threshold)
            .finish()
    }
}

fn inflate(attributes: &HashMap<String, String>, body: Bytes) -> Result<Bytes, CodecError> {
    match attributes.get(COMPRESSOR_KEY) {
        None => Ok(body),
        Some(id) => {
            let compressor =
                get_compressor(id).ok_or_else(|| CodecError::UnknownCompressor(id.clone()))?;
            Ok(compressor.decompress(&body)?)
        }
    }
}

fn negotiated_serializer(
    attributes: &HashMap<String, String>,
    fallback: &BoxSerializer,
) -> Result<BoxSerializer, CodecError> {
    match attributes.get(SERIALIZER_KEY) {
        None => Ok(fallback.clone()),
        Some(name) => get_serializer(name).ok_or_else(|| CodecError::UnknownSerializer(name.clone())),
    }
}

/// Builds the wire request for an invocation.
///
/// A missing parameter encodes to an empty body.
pub fn encode_call(invocation: &Invocation) -> Result<WireRequest, CodecError> {
    let options = invocation.method_config().codec();

    let body = match invocation.parameter() {
        None => Bytes::new(),
        Some(parameter) => options.serializer().serialize(parameter)?,
    };
    let (body, compressed_with) = options.deflate(body)?;

    let attributes = invocation.attributes();
    attributes.insert(SERIALIZER_KEY.to_string(), options.serializer().name().to_string());
    match compressed_with {
        Some(id) => {
            attributes.insert(COMPRESSOR_KEY.to_string(), id.to_string());
        }
        None => {
            attributes.remove(COMPRESSOR_KEY);
        }
    }

    let header = WireHeader {
        service: invocation.service_name().to_string(),
        method: invocation.method_name().to_string(),
        consumer: invocation.consumer().to_string(),
        provider: invocation.provider().to_string(),
        timeout_millis: invocation.timeout_millis(),
        attributes: attributes
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect(),
    };

    Ok(WireRequest { header, body })
}

/// Turns a transport response into a [`Reply`].
///
/// A zero length success body decodes to "no value". A failure body is a
/// structured [`ErrorDescriptor`].
pub fn decode_reply(invocation: &Invocation, response: WireResponse) -> Result<Reply, CodecError> {
    let options = invocation.method_config().codec();
    let serializer = negotiated_serializer(&response.attributes, options.serializer())?;
    let body = inflate(&response.attributes, response.body)?;

    let reply = match response.status {
        WireStatus::Success => {
            if body.is_empty() {
                Reply::new(None)
            } else {
                Reply::new(Some(serializer.deserialize(&body)?))
            }
        }
        WireStatus::Failure => {
            if body.is_empty() {
                return Err(CodecError::Malformed("failure response without an error body".into()));
            }
            let descriptor: ErrorDescriptor = serde_json::from_value(serializer.deserialize(&body)?)?;
            Reply::failure(descriptor)
        }
    };

    Ok(reply.with_attachments(response.attributes))
}

/// A request as seen by the receiving side.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCall {
    pub header: WireHeader,
    pub parameter: Option<Value>,
}

/// Receiving side mirror of [`encode_call`].
pub fn decode_call(request: WireRequest) -> Result<DecodedCall, CodecError> {
    let attributes = &request.header.attributes;
    let serializer = match attributes.get(SERIALIZER_KEY) {
        Some(name) => get_serializer(name).ok_or_else(|| CodecError::UnknownSerializer(name.clone()))?,
        None => get_serializer(JSON).ok_or_else(|| CodecError::UnknownSerializer(JSON.to_string()))?,
    };
    let body = inflate(attributes, request.body)?;

    let parameter = if body.is_empty() {
        None
    } else {
        Some(serializer.deserialize(&body)?)
    };

    Ok(DecodedCall {
        header: request.header,
        parameter,
    })
}

/// Receiving side mirror of [`decode_reply`]. Reply attachments become
/// response attributes.
pub fn encode_reply(reply: &Reply, options: &CodecOptions) -> Result<WireResponse, CodecError> {
    let (status, body) = match reply.error() {
        Some(descriptor) => {
            let value = serde_json::to_value(descriptor)?;
            (WireStatus::Failure, options.serializer().serialize(&value)?)
        }
        None => match reply.data() {
            None => (WireStatus::Success, Bytes::new()),
            Some(value) => (WireStatus::Success, options.serializer().serialize(value)?),
        },
    };
    let (body, compressed_with) = options.deflate(body)?;

    let mut attributes = reply.attachments().clone();
    attributes.insert(SERIALIZER_KEY.to_string(), options.serializer().name().to_string());
    match compressed_with {
        Some(id) => attributes.insert(COMPRESSOR_KEY.to_string(), id.to_string()),
        None => attributes.remove(COMPRESSOR_KEY),
    };

    Ok(WireResponse {
        status,
        attributes,
        body,
    })
}
