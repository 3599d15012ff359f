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
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use futures::ready;
use pin_project::pin_project;
use tokio::task::JoinHandle;

use crate::error::RpcError;

#[pin_project(project = CallStateProj)]
enum CallState<T> {
    Ready(Option<Result<T, RpcError>>),
    Spawned(#[pin] JoinHandle<Result<T, RpcError>>),
}

/// The pending result of a call.
///
/// The call itself runs on the client's runtime whether or not this future
/// is polled. Await it from async code, or use [`get`](Self::get) to block a
/// thread that is not driving a runtime.
#[pin_project]
#[must_use = "dropping a CallFuture discards the result of the call"]
pub struct CallFuture<T> {
    #[pin]
    state: CallState<T>,
}

impl<T> CallFuture<T> {
    pub(crate) fn ready(result: Result<T, RpcError>) -> Self {
        CallFuture {
            state: CallState::Ready(Some(result)),
        }
    }

    pub(crate) fn spawned(handle: JoinHandle<Result<T, RpcError>>) -> Self {
        CallFuture {
            state: CallState::Spawned(handle),
        }
    }

    /// Abandons the call; awaiting afterwards yields a cancellation error
    /// unless the call had already finished.
    pub fn abort(&self) {
        if let CallState::Spawned(handle) = &self.state {
            handle.abort();
        }
    }

    /// Blocks the current thread until the call completes.
    pub fn get(self) -> Result<T, RpcError> {
        futures::executor::block_on(self)
    }
}

impl<T> Future for CallFuture<T> {
    type Output = Result<T, RpcError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project().state.project() {
            CallStateProj::Ready(result) => Poll::Ready(
                result
                    .take()
                    .unwrap_or_else(|| Err(RpcError::Invoke("call future polled after completion".into()))),
            ),
            CallStateProj::Spawned(handle) => match ready!(handle.poll(cx)) {
                Ok(result) => Poll::Ready(result),
                Err(err) if err.is_cancelled() => {
                    Poll::Ready(Err(RpcError::Cancelled("the call was aborted".into())))
                }
                Err(err) => Poll::Ready(Err(RpcError::Invoke(format!("the call panicked: {}", err)))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_ready() {
        let call = CallFuture::ready(Ok(7));
        assert_eq!(call.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_abort() {
        let call: CallFuture<()> = CallFuture::spawned(tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }));
        call.abort();
        assert!(matches!(call.await, Err(RpcError::Cancelled(_))));
    }

    #[test]
    fn test_get_blocks_outside_runtime() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let call = CallFuture::spawned(rt.spawn(async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok("done")
        }));
        assert_eq!(call.get().unwrap(), "done");
    }
}
