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

//! Nested per request key/value context.
//!
//! At most one context is active per thread. Creating a context makes the
//! currently active one its parent; reads fall back through the parent chain
//! while writes stay local. A context can be carried into async
//! continuations with [`WithContext`], which re-activates it around every poll
//! of the wrapped future so it never leaks onto a runtime worker thread.
//! Contexts the wrapped future creates itself stay with that future across
//! polls and are swapped out while it is suspended.

use std::{
    cell::RefCell,
    collections::HashMap,
    future::Future,
    marker::PhantomData,
    ops::Deref,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use dashmap::DashMap;
use pin_project::pin_project;

thread_local! {
    static CURRENT: RefCell<Option<Arc<RequestContext>>> = RefCell::new(None);
}

fn is_active(active: &Option<Arc<RequestContext>>, context: &Arc<RequestContext>) -> bool {
    matches!(active, Some(active) if Arc::ptr_eq(active, context))
}

#[derive(Debug, Default)]
pub struct RequestContext {
    parent: Option<Arc<RequestContext>>,
    values: DashMap<String, String>,
}

impl RequestContext {
    /// Creates a context whose parent is the one active on this thread, and
    /// makes the new context active.
    pub fn create() -> Arc<RequestContext> {
        CURRENT.with(|current| {
            let mut current = current.borrow_mut();
            let context = Arc::new(RequestContext {
                parent: current.clone(),
                values: DashMap::new(),
            });
            *current = Some(context.clone());
            context
        })
    }

    /// Like [`create`](Self::create), closing the context when the returned
    /// scope is dropped.
    pub fn scope() -> ContextScope {
        ContextScope {
            context: RequestContext::create(),
            _not_send: PhantomData,
        }
    }

    pub fn current() -> Option<Arc<RequestContext>> {
        CURRENT.with(|current| current.borrow().clone())
    }

    pub fn parent(&self) -> Option<&Arc<RequestContext>> {
        self.parent.as_ref()
    }

    /// Local value first, then the nearest ancestor that has one.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut context = Some(self);
        while let Some(c) = context {
            if let Some(value) = c.values.get(key) {
                return Some(value.value().clone());
            }
            context = c.parent.as_deref();
        }
        None
    }

    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(key.into(), value.into())
    }

    /// Stores `value` unless this context already holds the key locally.
    /// Returns the value already present, if any.
    pub fn put_if_absent(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let mut existing = None;
        self.values
            .entry(key.into())
            .and_modify(|v| existing = Some(v.clone()))
            .or_insert_with(|| value.into());
        existing
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.values.remove(key).map(|(_, v)| v)
    }

    /// Every visible key, with nearer contexts shadowing their ancestors.
    pub fn entries(&self) -> HashMap<String, String> {
        let mut chain = Vec::new();
        let mut context = Some(self);
        while let Some(c) = context {
            chain.push(c);
            context = c.parent.as_deref();
        }

        let mut entries = HashMap::new();
        for c in chain.into_iter().rev() {
            for entry in c.values.iter() {
                entries.insert(entry.key().clone(), entry.value().clone());
            }
        }
        entries
    }

    /// Restores the parent as the active context, but only when this
    /// context is the active one on the calling thread. Closing twice, or
    /// closing while a child is active, does nothing.
    pub fn close(self: &Arc<Self>) {
        let _ = CURRENT.try_with(|current| {
            let mut current = current.borrow_mut();
            if is_active(&current, self) {
                *current = self.parent.clone();
            }
        });
    }

    /// Makes this context active until the guard is dropped. Dropping the
    /// guard reinstates whatever was active before `enter`, including when
    /// contexts created in between were never closed.
    pub fn enter(self: &Arc<Self>) -> EnterGuard {
        EnterGuard {
            previous: swap_current(Some(self.clone())),
            _not_send: PhantomData,
        }
    }
}

fn swap_current(context: Option<Arc<RequestContext>>) -> Option<Arc<RequestContext>> {
    CURRENT
        .try_with(|current| current.replace(context))
        .unwrap_or_default()
}

#[must_use]
pub struct EnterGuard {
    previous: Option<Arc<RequestContext>>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for EnterGuard {
    fn drop(&mut self) {
        swap_current(self.previous.take());
    }
}

#[must_use]
pub struct ContextScope {
    context: Arc<RequestContext>,
    _not_send: PhantomData<*const ()>,
}

impl Deref for ContextScope {
    type Target = Arc<RequestContext>;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

impl Drop for ContextScope {
    fn drop(&mut self) {
        self.context.close();
    }
}

/// A future that runs with a [`RequestContext`] active while it is polled.
///
/// Whatever is active when a poll returns belongs to the wrapped future: it
/// is parked here and reinstated on the next poll, while the thread gets back
/// the context it had before the poll.
#[pin_project]
#[derive(Debug)]
pub struct WithContext<F> {
    #[pin]
    inner: F,
    active: Option<Arc<RequestContext>>,
}

impl<F> WithContext<F> {
    pub fn new(inner: F, context: Arc<RequestContext>) -> Self {
        WithContext {
            inner,
            active: Some(context),
        }
    }
}

/// Parks the future's active context and restores the thread's, even when
/// the inner poll panics.
struct Park<'a> {
    slot: &'a mut Option<Arc<RequestContext>>,
    previous: Option<Arc<RequestContext>>,
}

impl Drop for Park<'_> {
    fn drop(&mut self) {
        *self.slot = swap_current(self.previous.take());
    }
}

impl<F: Future> Future for WithContext<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let previous = swap_current(this.active.take());
        let _park = Park {
            slot: this.active,
            previous,
        };
        this.inner.poll(cx)
    }
}

pub trait ContextExt: Future + Sized {
    fn with_context(self, context: Arc<RequestContext>) -> WithContext<Self> {
        WithContext::new(self, context)
    }
}

impl<F: Future> ContextExt for F {}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_nesting_and_fallback() {
        let outer = RequestContext::create();
        outer.put("tenant", "acme");
        outer.put("region", "eu");

        let inner = RequestContext::create();
        assert!(Arc::ptr_eq(inner.parent().unwrap(), &outer));
        inner.put("region", "us");

        assert_eq!(inner.get("tenant").as_deref(), Some("acme"));
        assert_eq!(inner.get("region").as_deref(), Some("us"));
        assert_eq!(outer.get("region").as_deref(), Some("eu"));

        let entries = inner.entries();
        assert_eq!(entries.get("region").map(String::as_str), Some("us"));
        assert_eq!(entries.len(), 2);

        inner.close();
        assert!(Arc::ptr_eq(&RequestContext::current().unwrap(), &outer));
        outer.close();
        assert!(RequestContext::current().is_none());
    }

    #[test]
    fn test_put_if_absent_is_local() {
        let parent = RequestContext::create();
        parent.put("k", "parent");
        let child = RequestContext::create();

        assert_eq!(child.put_if_absent("k", "child"), None);
        assert_eq!(child.put_if_absent("k", "again"), Some("child".to_string()));
        assert_eq!(parent.get("k").as_deref(), Some("parent"));

        child.close();
        parent.close();
    }

    #[test]
    fn test_close_is_identity_checked() {
        let a = RequestContext::create();
        let b = RequestContext::create();

        // a is not active, nothing happens
        a.close();
        assert!(Arc::ptr_eq(&RequestContext::current().unwrap(), &b));

        b.close();
        assert!(Arc::ptr_eq(&RequestContext::current().unwrap(), &a));

        // second close of b is a no-op
        b.close();
        assert!(Arc::ptr_eq(&RequestContext::current().unwrap(), &a));

        a.close();
        assert!(RequestContext::current().is_none());
    }

    #[test]
    fn test_scope_closes_on_drop() {
        {
            let scope = RequestContext::scope();
            scope.put("k", "v");
            assert_eq!(RequestContext::current().unwrap().get("k").as_deref(), Some("v"));
        }
        assert!(RequestContext::current().is_none());
    }

    #[test]
    fn test_context_follows_continuation() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();

        let context = RequestContext::create();
        context.put("trace", "t-42");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let task = async {
                let before = RequestContext::current().and_then(|c| c.get("trace"));
                tokio::time::sleep(Duration::from_millis(5)).await;
                let after = RequestContext::current().and_then(|c| c.get("trace"));
                (before, after)
            };
            handles.push(rt.spawn(task.with_context(context.clone())));
        }
        context.close();

        for handle in handles {
            let (before, after) = rt.block_on(handle).unwrap();
            assert_eq!(before.as_deref(), Some("t-42"));
            assert_eq!(after.as_deref(), Some("t-42"));
        }

        // nothing left behind on the workers
        let clean = rt.block_on(rt.spawn(async { RequestContext::current().is_none() })).unwrap();
        assert!(clean);
    }

    #[tokio::test]
    async fn test_unclosed_inner_context_stays_with_its_future() {
        let outer = RequestContext::create();
        outer.close();

        let call = tokio::spawn(
            async {
                let inner = RequestContext::create();
                inner.put("secret", "call-1");
                tokio::time::sleep(Duration::from_millis(20)).await;

                let resumed = RequestContext::current().unwrap();
                assert!(Arc::ptr_eq(&resumed, &inner));
                inner.close();
                RequestContext::current().and_then(|c| c.get("secret"))
            }
            .with_context(outer.clone()),
        );

        let bystander = tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            RequestContext::current().and_then(|c| c.get("secret"))
        });

        assert_eq!(bystander.await.unwrap(), None);
        // closing the inner context handed the future back its outer one
        assert_eq!(call.await.unwrap(), None);
        assert!(RequestContext::current().is_none());
    }

    #[test]
    fn test_enter_guard_restores_previous() {
        let base = RequestContext::create();
        let entered = Arc::new(RequestContext::default());
        {
            let _guard = entered.enter();
            let stray = RequestContext::create();
            assert!(Arc::ptr_eq(stray.parent().unwrap(), &entered));
        }
        assert!(Arc::ptr_eq(&RequestContext::current().unwrap(), &base));
        base.close();
        assert!(RequestContext::current().is_none());
    }
}
