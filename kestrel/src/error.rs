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

use std::io;

use thiserror::Error;

use crate::{status::Code, StdError};

/// Errors surfaced to callers of the invocation pipeline.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to connect to {instance}: {message}")]
    Connect { instance: String, message: String },

    #[error("no reachable instance of provider '{provider}' for service '{service}' after {attempts} attempt(s){}", suffix(.cause))]
    Access {
        provider: String,
        service: String,
        attempts: u32,
        cause: Option<String>,
    },

    #[error("call timed out: {0}")]
    Timeout(String),

    #[error("call cancelled: {0}")]
    Cancelled(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("business error ({code}): {message}")]
    Business {
        code: i32,
        message: String,
        trace: Option<String>,
    },

    #[error("remote error ({code}): {message}")]
    Remote {
        code: i32,
        message: String,
        trace: Option<String>,
    },

    #[error("invoke error: {0}")]
    Invoke(String),
}

impl RpcError {
    pub fn code(&self) -> Code {
        match self {
            RpcError::Config(_) => Code::Config,
            RpcError::Connect { .. } => Code::Connect,
            RpcError::Access { .. } => Code::Access,
            RpcError::Timeout(_) => Code::Timeout,
            RpcError::Cancelled(_) => Code::Cancelled,
            RpcError::Codec(_) => Code::Codec,
            RpcError::Business { .. } => Code::Business,
            RpcError::Remote { .. } => Code::Remote,
            RpcError::Invoke(_) => Code::Invoke,
        }
    }

    /// The transport never reached the instance.
    pub fn is_connect(&self) -> bool {
        matches!(self, RpcError::Connect { .. })
    }

    /// Timed out or cancelled. These are the only failures that restart a
    /// whole connect cycle.
    pub fn is_timeout(&self) -> bool {
        matches!(self, RpcError::Timeout(_) | RpcError::Cancelled(_))
    }

    pub fn is_business(&self) -> bool {
        matches!(self, RpcError::Business { .. })
    }

    pub(crate) fn from_transport(err: TransportError, instance: &str) -> Self {
        match err {
            TransportError::Connect(message) => RpcError::Connect {
                instance: instance.to_string(),
                message,
            },
            TransportError::Timeout(message) => RpcError::Timeout(message),
            TransportError::Cancelled(message) => RpcError::Cancelled(message),
            TransportError::Other(e) => RpcError::Invoke(e.to_string()),
        }
    }
}

fn suffix(cause: &Option<String>) -> String {
    cause.as_ref().map(|c| format!(": {c}")).unwrap_or_default()
}

/// Outcome of a single failed send, as reported by a [`Connector`].
///
/// [`Connector`]: crate::connector::Connector
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("{0}")]
    Other(StdError),
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unknown serializer '{0}'")]
    UnknownSerializer(String),

    #[error("unknown compressor '{0}'")]
    UnknownCompressor(String),

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("compression failed: {0}")]
    Compress(#[from] io::Error),

    #[error("malformed message: {0}")]
    Malformed(String),
}
