//! RPC client tests over mock transports: correlation, error taxonomy,
//! teardown semantics, and the envelope context merge.

use async_trait::async_trait;
use hostbridge::rpc::{
    CallError, NotificationHandler, RpcClient, Transport, TransportError,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

// ─── Mock transports ──────────────────────────────────────────────────────────

/// Records every posted body and echoes the request id back with a fixed
/// result, like a well-behaved JSON-RPC server.
struct EchoTransport {
    requests: Mutex<Vec<Value>>,
    result: Value,
}

impl EchoTransport {
    fn new(result: Value) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            result,
        })
    }

    fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for EchoTransport {
    async fn post(&self, body: String) -> Result<String, TransportError> {
        let parsed: Value = serde_json::from_str(&body).unwrap();
        self.requests.lock().unwrap().push(parsed.clone());
        match parsed.get("id") {
            Some(id) => Ok(json!({ "jsonrpc": "2.0", "result": self.result, "id": id })
                .to_string()),
            // Notification — no response body.
            None => Ok(String::new()),
        }
    }
}

/// Holds both exchanges at a barrier, then answers each POST with the body
/// destined for the *other* call. Arrival order and send order disagree on
/// purpose — only id correlation can resolve the calls correctly.
struct CrossTransport {
    barrier: Barrier,
}

#[async_trait]
impl Transport for CrossTransport {
    async fn post(&self, body: String) -> Result<String, TransportError> {
        let parsed: Value = serde_json::from_str(&body).unwrap();
        let id = parsed["id"].as_u64().unwrap();
        self.barrier.wait().await;
        let (other_id, result) = if id == 1 { (2, "two") } else { (1, "one") };
        Ok(json!({ "jsonrpc": "2.0", "result": result, "id": other_id }).to_string())
    }
}

/// Never responds — the exchange hangs until the client is torn down.
struct NeverTransport;

#[async_trait]
impl Transport for NeverTransport {
    async fn post(&self, _body: String) -> Result<String, TransportError> {
        std::future::pending().await
    }
}

/// Fails or misbehaves in one configured way.
enum Failure {
    Unreachable,
    Status(u16),
    Garbage,
}

struct FaultyTransport {
    failure: Failure,
}

#[async_trait]
impl Transport for FaultyTransport {
    async fn post(&self, _body: String) -> Result<String, TransportError> {
        match self.failure {
            Failure::Unreachable => Err(TransportError::Unreachable(anyhow::anyhow!(
                "connection refused"
            ))),
            Failure::Status(code) => Err(TransportError::Status(code)),
            Failure::Garbage => Ok("not json at all".to_string()),
        }
    }
}

/// Counts invocations; used to prove no I/O happened.
struct CountingTransport {
    posts: AtomicUsize,
}

#[async_trait]
impl Transport for CountingTransport {
    async fn post(&self, _body: String) -> Result<String, TransportError> {
        self.posts.fetch_add(1, Ordering::SeqCst);
        Ok(String::new())
    }
}

fn connected_client(transport: Arc<dyn Transport>) -> RpcClient {
    let client = RpcClient::new(transport);
    client.set_connected(true);
    client
}

// ─── Correlation ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn calls_resolve_by_id_even_when_responses_cross() {
    let client = connected_client(Arc::new(CrossTransport {
        barrier: Barrier::new(2),
    }));

    let (a, b) = tokio::join!(client.call("first", json!({})), client.call("second", json!({})));
    assert_eq!(a.unwrap(), json!("one"));
    assert_eq!(b.unwrap(), json!("two"));
}

#[tokio::test]
async fn request_ids_are_strictly_increasing() {
    let transport = EchoTransport::new(json!("ok"));
    let client = connected_client(transport.clone());

    for method in ["a", "b", "c"] {
        client.call(method, json!({})).await.unwrap();
    }

    let ids: Vec<u64> = transport
        .requests()
        .iter()
        .map(|r| r["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);

    // A fresh client instance restarts at 1.
    let transport2 = EchoTransport::new(json!("ok"));
    let client2 = connected_client(transport2.clone());
    client2.call("d", json!({})).await.unwrap();
    assert_eq!(transport2.requests()[0]["id"], 1);
}

// ─── Error taxonomy ───────────────────────────────────────────────────────────

#[tokio::test]
async fn call_without_connection_does_no_io() {
    let transport = Arc::new(CountingTransport {
        posts: AtomicUsize::new(0),
    });
    let client = RpcClient::new(transport.clone());

    let err = client.call("ping", json!({})).await.unwrap_err();
    assert!(matches!(err, CallError::NotConnected));
    assert_eq!(transport.posts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn remote_error_object_becomes_remote_error() {
    struct RemoteErrTransport;
    #[async_trait]
    impl Transport for RemoteErrTransport {
        async fn post(&self, body: String) -> Result<String, TransportError> {
            let id = serde_json::from_str::<Value>(&body).unwrap()["id"].clone();
            Ok(json!({
                "jsonrpc": "2.0",
                "error": { "code": -32601, "message": "method not found", "data": "nope" },
                "id": id
            })
            .to_string())
        }
    }

    let client = connected_client(Arc::new(RemoteErrTransport));
    match client.call("missing", json!({})).await.unwrap_err() {
        CallError::Remote { code, message, data } => {
            assert_eq!(code, -32601);
            assert_eq!(message, "method not found");
            assert_eq!(data, Some(json!("nope")));
        }
        other => panic!("expected Remote, got {other:?}"),
    }
}

#[tokio::test]
async fn transport_failures_map_to_taxonomy() {
    let client = connected_client(Arc::new(FaultyTransport {
        failure: Failure::Status(502),
    }));
    assert!(matches!(
        client.call("x", json!({})).await.unwrap_err(),
        CallError::Http { status: 502 }
    ));

    let client = connected_client(Arc::new(FaultyTransport {
        failure: Failure::Unreachable,
    }));
    assert!(matches!(
        client.call("x", json!({})).await.unwrap_err(),
        CallError::Unreachable
    ));

    let client = connected_client(Arc::new(FaultyTransport {
        failure: Failure::Garbage,
    }));
    assert!(matches!(
        client.call("x", json!({})).await.unwrap_err(),
        CallError::Internal(_)
    ));
}

#[tokio::test]
async fn misrouted_response_id_fails_the_originating_call() {
    // Answers every request under an id nobody allocated. The call must fail
    // rather than hang in the pending map until shutdown.
    struct MisroutingTransport;
    #[async_trait]
    impl Transport for MisroutingTransport {
        async fn post(&self, _body: String) -> Result<String, TransportError> {
            Ok(json!({ "jsonrpc": "2.0", "result": "?", "id": 999 }).to_string())
        }
    }

    let client = connected_client(Arc::new(MisroutingTransport));
    let err = client.call("x", json!({})).await.unwrap_err();
    assert!(matches!(err, CallError::Internal(_)));
    assert_eq!(client.pending_calls(), 0);
}

#[tokio::test]
async fn notify_never_errors() {
    // Unreachable endpoint: swallowed.
    let client = connected_client(Arc::new(FaultyTransport {
        failure: Failure::Unreachable,
    }));
    client.notify("event.test", json!({ "x": 1 })).await;

    // Disconnected: silent no-op, no I/O.
    let transport = Arc::new(CountingTransport {
        posts: AtomicUsize::new(0),
    });
    let client = RpcClient::new(transport.clone());
    client.notify("event.test", json!({})).await;
    assert_eq!(transport.posts.load(Ordering::SeqCst), 0);
}

// ─── Teardown ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn shutdown_fails_every_outstanding_call() {
    let client = connected_client(Arc::new(NeverTransport));

    let c1 = {
        let client = client.clone();
        tokio::spawn(async move { client.call("slow1", json!({})).await })
    };
    let c2 = {
        let client = client.clone();
        tokio::spawn(async move { client.call("slow2", json!({})).await })
    };

    // Let both calls register their pending entries.
    while client.pending_calls() < 2 {
        tokio::task::yield_now().await;
    }

    client.shutdown();

    assert!(matches!(c1.await.unwrap(), Err(CallError::Disconnected)));
    assert!(matches!(c2.await.unwrap(), Err(CallError::Disconnected)));
    assert_eq!(client.pending_calls(), 0);
    assert!(!client.is_connected());
}

// ─── Inbound dispatch ─────────────────────────────────────────────────────────

struct RecordingHandler {
    calls: Mutex<Vec<(String, Value)>>,
    reply: Option<Value>,
    fail: bool,
}

impl RecordingHandler {
    fn new(reply: Option<Value>, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            reply,
            fail,
        })
    }
}

#[async_trait]
impl NotificationHandler for RecordingHandler {
    async fn handle(&self, method: &str, params: Value) -> anyhow::Result<Option<Value>> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params));
        if self.fail {
            anyhow::bail!("handler exploded");
        }
        Ok(self.reply.clone())
    }
}

#[tokio::test]
async fn inbound_request_gets_a_correlated_reply() {
    let transport = EchoTransport::new(json!("unused"));
    let client = connected_client(transport.clone());
    client.on_notification(RecordingHandler::new(Some(json!("Yes")), false));

    client
        .handle_incoming(
            &json!({
                "jsonrpc": "2.0",
                "method": "window.showInformationMessage",
                "params": { "message": "Hi", "items": ["Yes", "No"] },
                "id": 7
            })
            .to_string(),
        )
        .await;

    let posts = transport.requests();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["id"], 7);
    assert_eq!(posts[0]["result"], "Yes");
}

#[tokio::test]
async fn handler_failure_does_not_stop_the_chain() {
    let transport = EchoTransport::new(json!("unused"));
    let client = connected_client(transport);

    let failing = RecordingHandler::new(None, true);
    let second = RecordingHandler::new(None, false);
    client.on_notification(failing.clone());
    client.on_notification(second.clone());

    client
        .handle_incoming(
            &json!({ "jsonrpc": "2.0", "method": "event.remote", "params": { "n": 1 } })
                .to_string(),
        )
        .await;

    assert_eq!(failing.calls.lock().unwrap().len(), 1);
    assert_eq!(second.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn handlers_run_in_registration_order() {
    let transport = EchoTransport::new(json!("unused"));
    let client = connected_client(transport.clone());

    // Both reply — the first registration wins the reply slot.
    client.on_notification(RecordingHandler::new(Some(json!("first")), false));
    client.on_notification(RecordingHandler::new(Some(json!("second")), false));

    client
        .handle_incoming(
            &json!({ "jsonrpc": "2.0", "method": "m", "params": {}, "id": 1 }).to_string(),
        )
        .await;

    assert_eq!(transport.requests()[0]["result"], "first");
}

// ─── Envelope context ─────────────────────────────────────────────────────────

#[tokio::test]
async fn default_context_is_merged_into_params() {
    let transport = EchoTransport::new(json!("ok"));
    let client = connected_client(transport.clone());

    client.call("m", json!({ "foo": 1 })).await.unwrap();
    let params = &transport.requests()[0]["params"];
    assert_eq!(params["@context"]["@vocab"], "https://vscode-api.org/vocab#");
    assert_eq!(params["foo"], 1);
}

proptest::proptest! {
    /// Whatever the caller puts in params survives the merge untouched.
    #[test]
    fn context_merge_preserves_caller_keys(
        entries in proptest::collection::hash_map("[a-z]{1,8}", proptest::prelude::any::<i64>(), 0..8)
    ) {
        use hostbridge::rpc::protocol::with_context;

        let mut obj = serde_json::Map::new();
        for (k, v) in &entries {
            obj.insert(k.clone(), json!(v));
        }
        let out = with_context(Value::Object(obj.clone()));
        let out_obj = out.as_object().unwrap();

        proptest::prop_assert!(out_obj.contains_key("@context"));
        for (k, v) in &obj {
            proptest::prop_assert_eq!(out_obj.get(k), Some(v));
        }
    }
}

#[tokio::test]
async fn caller_supplied_context_wins() {
    let transport = EchoTransport::new(json!("ok"));
    let client = connected_client(transport.clone());

    client
        .call("m", json!({ "@context": "custom", "foo": 1 }))
        .await
        .unwrap();
    let params = &transport.requests()[0]["params"];
    assert_eq!(params["@context"], "custom");
    assert_eq!(params["foo"], 1);
}
