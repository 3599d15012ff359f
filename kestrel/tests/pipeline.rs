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

mod support;

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use kestrel::{
    codec::{self, CodecOptions, WireRequest, WireResponse, COMPRESSOR_KEY, GZIP, JSON},
    connector::Connector,
    error::TransportError,
    filter::{DeadlineInterceptor, DEADLINE_KEY},
    CallOptions, Client, Invocation, ReferenceConfig, Reply, RpcError, ServiceInstance,
};
use serde_json::json;
use support::{Behavior, Greeter, RecordingLocator, ScriptedConnector};

const A: &str = "127.0.0.1:8001";
const B: &str = "127.0.0.1:8002";
const C: &str = "127.0.0.1:8003";

fn reference(options: CallOptions) -> ReferenceConfig {
    ReferenceConfig {
        provider: "greeter-provider".into(),
        options,
        ..Default::default()
    }
}

fn client(connector: &ScriptedConnector, locator: RecordingLocator) -> Client {
    Client::builder()
        .connector(connector.clone())
        .locator(locator)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_round_robin_spreads_evenly() {
    let connector = ScriptedConnector::default();
    let client = client(&connector, RecordingLocator::new(&[A, B, C]));
    let greeter = client.importing::<Greeter>(Some(reference(CallOptions::default()))).unwrap();

    for i in 0..10 {
        let reply: String = greeter.call("sayHello", &format!("guest-{}", i)).await.unwrap();
        assert_eq!(reply, format!("guest-{}", i));
    }

    let mut hits: HashMap<String, usize> = HashMap::new();
    for address in connector.sent_to() {
        *hits.entry(address).or_default() += 1;
    }
    assert_eq!(hits.len(), 3);
    assert!(hits.values().all(|n| *n == 3 || *n == 4), "{:?}", hits);
}

#[tokio::test]
async fn test_connect_failures_move_to_other_instances() {
    let connector = ScriptedConnector::default();
    connector.always(A, Behavior::Refuse).always(C, Behavior::Refuse);
    let locator = RecordingLocator::new(&[A, B, C]);
    let feedback = locator.feedback.clone();

    let client = client(&connector, locator);
    let greeter = client
        .importing::<Greeter>(Some(reference(CallOptions::default().connect_retry(3))))
        .unwrap();

    let reply: String = greeter.call("sayHello", "kestrel").await.unwrap();
    assert_eq!(reply, "kestrel");
    // A fails, then the counter lands on C among [B, C], then B is all that is left
    assert_eq!(connector.sent_to(), vec![A, C, B]);

    let feedback = feedback.lock().unwrap();
    assert_eq!(feedback.len(), 3);
    assert_eq!(feedback.iter().filter(|f| f.ok).count(), 1);
    assert_eq!(feedback[2].address, B);
}

#[tokio::test]
async fn test_connect_retry_exhaustion_is_access_error() {
    let connector = ScriptedConnector::default();
    for address in [A, B, C] {
        connector.always(address, Behavior::Refuse);
    }
    let locator = RecordingLocator::new(&[A, B, C]);
    let feedback = locator.feedback.clone();

    let client = client(&connector, locator);
    let greeter = client
        .importing::<Greeter>(Some(reference(CallOptions::default().connect_retry(2))))
        .unwrap();

    let err = greeter.call::<_, String>("sayHello", "kestrel").await.unwrap_err();
    match err {
        RpcError::Access {
            provider,
            service,
            attempts,
            cause,
        } => {
            assert_eq!(provider, "greeter-provider");
            assert_eq!(service, "demo.Greeter");
            assert_eq!(attempts, 2);
            assert!(cause.unwrap().contains("refused"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(connector.sent_to().len(), 2);
    assert_eq!(feedback.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_single_failing_instance_is_not_retried() {
    let connector = ScriptedConnector::default();
    connector.always(A, Behavior::Refuse);
    let client = client(&connector, RecordingLocator::new(&[A]));
    let greeter = client
        .importing::<Greeter>(Some(reference(CallOptions::default().connect_retry(5))))
        .unwrap();

    let err = greeter.call::<_, String>("sayHello", "kestrel").await.unwrap_err();
    assert!(matches!(err, RpcError::Access { attempts: 1, .. }));
    assert_eq!(connector.sent_to(), vec![A]);
}

#[tokio::test]
async fn test_no_instances_is_access_error() {
    let connector = ScriptedConnector::default();
    let client = client(&connector, RecordingLocator::new(&[]));
    let greeter = client.importing::<Greeter>(Some(reference(CallOptions::default()))).unwrap();

    let err = greeter.call::<_, String>("sayHello", "kestrel").await.unwrap_err();
    assert!(matches!(err, RpcError::Access { attempts: 0, cause: None, .. }));
    assert!(connector.sent_to().is_empty());
}

#[tokio::test]
async fn test_timeout_restarts_cycle_with_fresh_exclusions() {
    let connector = ScriptedConnector::default();
    connector.script(A, vec![Behavior::Timeout, Behavior::Cancel]);
    let locator = RecordingLocator::new(&[A]);
    let feedback = locator.feedback.clone();

    let client = client(&connector, locator);
    let options = CallOptions::default().timeout_retry(3).connect_retry(2);
    let greeter = client.importing::<Greeter>(Some(reference(options))).unwrap();

    // the only instance is tried again in every cycle
    let reply: String = greeter.call("sayHello", "third time").await.unwrap();
    assert_eq!(reply, "third time");
    assert_eq!(connector.sent_to(), vec![A, A, A]);
    assert_eq!(feedback.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_timeout_retry_gets_a_fresh_connect_budget() {
    let connector = ScriptedConnector::default();
    connector.script(A, vec![Behavior::Refuse]);
    connector.script(B, vec![Behavior::Timeout, Behavior::Refuse]);
    let locator = RecordingLocator::new(&[A, B]);
    let feedback = locator.feedback.clone();

    let client = client(&connector, locator);
    let options = CallOptions::default().timeout_retry(2).connect_retry(2);
    let greeter = client.importing::<Greeter>(Some(reference(options))).unwrap();

    let reply: String = greeter.call("sayHello", "second cycle").await.unwrap();
    assert_eq!(reply, "second cycle");
    // cycle 1: A refused and excluded, B times out
    // cycle 2: B refused, A is a candidate again and answers
    assert_eq!(connector.sent_to(), vec![A, B, B, A]);

    let feedback = feedback.lock().unwrap();
    assert_eq!(feedback.len(), 4);
    let outcomes: Vec<bool> = feedback.iter().map(|f| f.ok).collect();
    assert_eq!(outcomes, vec![false, false, false, true]);
}

#[tokio::test]
async fn test_timeout_retry_exhaustion() {
    let connector = ScriptedConnector::default();
    connector.always(A, Behavior::Timeout).always(B, Behavior::Timeout);
    let client = client(&connector, RecordingLocator::new(&[A, B]));
    let options = CallOptions::default().timeout_retry(2).connect_retry(3);
    let greeter = client.importing::<Greeter>(Some(reference(options))).unwrap();

    let err = greeter.call::<_, String>("sayHello", "kestrel").await.unwrap_err();
    assert!(err.is_timeout());
    // a timeout ends the connect cycle at once
    assert_eq!(connector.sent_to().len(), 2);
}

#[tokio::test]
async fn test_method_level_retry_overrides_service() {
    let connector = ScriptedConnector::default();
    connector.always(A, Behavior::Timeout);
    let client = client(&connector, RecordingLocator::new(&[A]));

    let mut reference = reference(CallOptions::default().timeout_retry(5));
    reference
        .methods
        .insert("sayHello".into(), CallOptions::default().timeout_retry(1));
    let greeter = client.importing::<Greeter>(Some(reference)).unwrap();

    let err = greeter.call::<_, String>("sayHello", "kestrel").await.unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(connector.sent_to().len(), 1);
}

#[tokio::test]
async fn test_business_error_is_never_retried() {
    let connector = ScriptedConnector::default();
    connector.always(A, Behavior::Business("greeting quota exceeded"));
    let locator = RecordingLocator::new(&[A, B]);
    let feedback = locator.feedback.clone();

    let client = client(&connector, locator);
    let options = CallOptions::default().timeout_retry(3).connect_retry(3);
    let greeter = client.importing::<Greeter>(Some(reference(options))).unwrap();

    let err = greeter.call::<_, String>("sayHello", "kestrel").await.unwrap_err();
    match err {
        RpcError::Business { message, .. } => assert_eq!(message, "greeting quota exceeded"),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(connector.sent_to(), vec![A]);
    // the instance itself answered fine
    assert!(feedback.lock().unwrap()[0].ok);
}

#[tokio::test]
async fn test_post_connect_failure_is_surfaced() {
    let connector = ScriptedConnector::default();
    connector.always(A, Behavior::Broken);
    let client = client(&connector, RecordingLocator::new(&[A, B]));
    let options = CallOptions::default().timeout_retry(3).connect_retry(3);
    let greeter = client.importing::<Greeter>(Some(reference(options))).unwrap();

    let err = greeter.call::<_, String>("sayHello", "kestrel").await.unwrap_err();
    assert!(matches!(err, RpcError::Invoke(msg) if msg.contains("mid response")));
    assert_eq!(connector.sent_to(), vec![A]);
}

#[tokio::test]
async fn test_compression_gated_by_threshold() {
    // "\"aaaa\"" is six bytes serialized
    for (threshold, compressed) in [(6, false), (5, true)] {
        let connector = ScriptedConnector::default();
        let client = client(&connector, RecordingLocator::new(&[A]));
        let options = CallOptions::default().compressor(GZIP).compress_threshold(threshold);
        let greeter = client.importing::<Greeter>(Some(reference(options))).unwrap();

        let reply: String = greeter.call("sayHello", "aaaa").await.unwrap();
        assert_eq!(reply, "aaaa");

        let request = &connector.requests()[0];
        assert_eq!(
            request.header.attributes.get(COMPRESSOR_KEY).is_some(),
            compressed,
            "threshold {}",
            threshold
        );
        if !compressed {
            assert_eq!(&request.body[..], b"\"aaaa\"");
        }
    }
}

#[tokio::test]
async fn test_remote_address_recorded() {
    let connector = ScriptedConnector::default();
    connector.always(A, Behavior::Refuse).always(B, Behavior::Answer(json!("hi")));
    let client = client(&connector, RecordingLocator::new(&[A, B]));
    let greeter = client
        .importing::<Greeter>(Some(reference(CallOptions::default().connect_retry(2))))
        .unwrap();

    let reply: String = greeter.invoke("sayHello", "x").await.unwrap();
    assert_eq!(reply, "hi");
    assert_eq!(
        connector.remote_addresses(),
        vec![Some(A.to_string()), Some(B.to_string())]
    );

    let request = &connector.requests()[1];
    assert_eq!(request.header.service, "demo.Greeter");
    assert_eq!(request.header.method, "sayHello");
    assert_eq!(request.header.provider, "greeter-provider");
}

fn now_millis() -> i128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis() as i128
}

/// Honors the stamped deadline: lets the first send run past it and answers
/// every later one that still has time left.
#[derive(Clone, Default)]
struct DeadlineConnector {
    sends: Arc<AtomicUsize>,
    budgets: Arc<Mutex<Vec<i128>>>,
}

#[async_trait]
impl Connector for DeadlineConnector {
    async fn send(
        &self,
        _invocation: &Invocation,
        _instance: &ServiceInstance,
        request: WireRequest,
    ) -> Result<WireResponse, TransportError> {
        let deadline: i128 = request
            .header
            .attributes
            .get(DEADLINE_KEY)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| TransportError::Other("no deadline stamped".into()))?;
        let remaining = deadline - now_millis();
        self.budgets.lock().unwrap().push(remaining);

        if remaining <= 0 {
            return Err(TransportError::Timeout("deadline already passed".into()));
        }
        if self.sends.fetch_add(1, Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(remaining as u64 + 20)).await;
            return Err(TransportError::Timeout("no answer before the deadline".into()));
        }
        let options = CodecOptions::resolve(JSON, None, 0).unwrap();
        codec::encode_reply(&Reply::new(Some(json!("on time"))), &options)
            .map_err(|e| TransportError::Other(e.into()))
    }
}

#[tokio::test]
async fn test_deadline_renewed_for_each_timeout_retry() {
    let connector = DeadlineConnector::default();
    let client = Client::builder()
        .connector(connector.clone())
        .locator(RecordingLocator::new(&[A]))
        .interceptor(DeadlineInterceptor)
        .build()
        .unwrap();
    let options = CallOptions::default().timeout_millis(100).timeout_retry(2);
    let greeter = client.importing::<Greeter>(Some(reference(options))).unwrap();

    let reply: String = greeter.call("sayHello", "late").await.unwrap();
    assert_eq!(reply, "on time");

    let budgets = connector.budgets.lock().unwrap().clone();
    assert_eq!(budgets.len(), 2);
    assert!(budgets[1] > 50, "{:?}", budgets);
}
