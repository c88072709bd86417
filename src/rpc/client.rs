//! JSON-RPC client — correlation, notification dispatch, teardown.
//!
//! `RpcClient` owns the request-id counter and the map of in-flight calls.
//! Each `call()` registers a pending entry keyed by its id and hands the HTTP
//! exchange to a spawned task; the caller awaits a oneshot channel. Responses
//! are routed back through the pending map by the id *they* carry, so arrival
//! order never matters, and `shutdown()` can fail every outstanding call
//! without cancelling the underlying socket.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::error::CallError;
use super::protocol::{Incoming, RequestId, RpcRequest, RpcResponse};
use super::transport::{Transport, TransportError};

// ─── Notification handlers ────────────────────────────────────────────────────

/// Handler invoked for every inbound notification or remote-initiated request.
///
/// The returned value is a reply payload; it is only consulted when the
/// inbound message was a request (carried an id). Handlers run in
/// registration order and a failing handler never stops the others.
#[async_trait::async_trait]
pub trait NotificationHandler: Send + Sync {
    async fn handle(&self, method: &str, params: Value) -> anyhow::Result<Option<Value>>;
}

// ─── Pending calls ────────────────────────────────────────────────────────────

/// One in-flight correlated request awaiting its response.
struct PendingCall {
    method: String,
    created_at: Instant,
    tx: oneshot::Sender<Result<Value, CallError>>,
}

// ─── Client ───────────────────────────────────────────────────────────────────

struct ClientInner {
    transport: Arc<dyn Transport>,
    /// Monotonic, starts at 1, never reset while this instance lives.
    next_id: AtomicU64,
    /// Guarded by a std mutex — never held across an await point.
    pending: Mutex<HashMap<RequestId, PendingCall>>,
    handlers: Mutex<Vec<Arc<dyn NotificationHandler>>>,
    connected: AtomicBool,
}

/// JSON-RPC client bound to one transport. Cheap to clone.
#[derive(Clone)]
pub struct RpcClient {
    inner: Arc<ClientInner>,
}

impl RpcClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                next_id: AtomicU64::new(1),
                pending: Mutex::new(HashMap::new()),
                handlers: Mutex::new(Vec::new()),
                connected: AtomicBool::new(false),
            }),
        }
    }

    /// Pure read of the ready flag — no I/O.
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Flip the ready flag. Owned by the lifecycle layer.
    pub fn set_connected(&self, connected: bool) {
        self.inner.connected.store(connected, Ordering::SeqCst);
    }

    /// Register a handler for inbound notifications and unsolicited requests.
    pub fn on_notification(&self, handler: Arc<dyn NotificationHandler>) {
        self.inner.handlers.lock().unwrap().push(handler);
    }

    /// Number of calls currently awaiting a response.
    pub fn pending_calls(&self) -> usize {
        self.inner.pending.lock().unwrap().len()
    }

    // ─── call / notify ──────────────────────────────────────────────────────

    /// Send a correlated request and await its response.
    ///
    /// Fails immediately with [`CallError::NotConnected`] when the client is
    /// not ready — no transport I/O happens in that case. Otherwise exactly
    /// one outcome is produced: the matched result, a typed error, or
    /// [`CallError::Disconnected`] if the client is torn down first.
    ///
    /// The HTTP exchange runs on a spawned task, so a [`RpcClient::notify`]
    /// issued right after `call` on the same task may reach the transport
    /// first. Each call is an independent exchange; only notifications are
    /// dispatched strictly in invocation order.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, CallError> {
        if !self.is_connected() {
            return Err(CallError::NotConnected);
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::call(method, params, id);
        let body = serde_json::to_string(&request)
            .map_err(|e| CallError::Internal(anyhow::Error::new(e)))?;

        // Record the pending entry before anything can yield, so a response
        // can never arrive ahead of its PendingCall.
        let (tx, rx) = oneshot::channel();
        let key = RequestId::Number(id);
        self.inner.pending.lock().unwrap().insert(
            key.clone(),
            PendingCall {
                method: method.to_string(),
                created_at: Instant::now(),
                tx,
            },
        );

        debug!(method, id, "sending JSON-RPC request");

        let inner = self.inner.clone();
        tokio::spawn(async move {
            match inner.transport.post(body).await {
                Ok(raw) => ClientInner::route_raw(&inner, &key, raw),
                Err(e) => ClientInner::fail(&inner, &key, e.into()),
            }
        });

        // Sender dropped without a value means the client was torn down.
        rx.await.unwrap_or(Err(CallError::Disconnected))
    }

    /// Send a one-way notification. Best effort — never returns an error.
    ///
    /// A no-op when disconnected; transport failures are logged and swallowed
    /// so event-forwarding paths cannot be crashed by a flaky endpoint.
    pub async fn notify(&self, method: &str, params: Value) {
        if !self.is_connected() {
            debug!(method, "notify skipped — not connected");
            return;
        }

        let notification = RpcRequest::notification(method, params);
        let body = match serde_json::to_string(&notification) {
            Ok(b) => b,
            Err(e) => {
                warn!(method, err = %e, "could not serialize notification");
                return;
            }
        };

        if let Err(e) = self.inner.transport.post(body).await {
            warn!(method, err = %e, "failed to send notification");
        }
    }

    // ─── Inbound ────────────────────────────────────────────────────────────

    /// Feed one raw inbound message into the client.
    ///
    /// Responses complete their pending call; notifications run the handler
    /// chain; remote-initiated requests run the handler chain and post the
    /// first non-empty reply (or `null`) back as the correlated response.
    pub async fn handle_incoming(&self, raw: &str) {
        let incoming = match Incoming::parse(raw) {
            Ok(m) => m,
            Err(e) => {
                warn!(err = %e, "dropping malformed inbound message");
                return;
            }
        };

        match incoming {
            Incoming::Response(resp) => {
                let id = resp.id.clone();
                ClientInner::complete(&self.inner, &id, resp);
            }
            Incoming::Notification { method, params } => {
                self.run_handlers(&method, params).await;
            }
            Incoming::Request { id, method, params } => {
                let reply = self
                    .run_handlers(&method, params)
                    .await
                    .unwrap_or(Value::Null);
                let response = RpcResponse::reply(id.clone(), reply);
                match serde_json::to_string(&response) {
                    Ok(body) => {
                        if let Err(e) = self.inner.transport.post(body).await {
                            warn!(%id, method = %method, err = %e, "failed to send reply to remote request");
                        }
                    }
                    Err(e) => warn!(%id, err = %e, "could not serialize reply"),
                }
            }
        }
    }

    /// Run every registered handler in order; returns the first reply value.
    ///
    /// Handler errors are observability events only — they never short-circuit
    /// the chain or surface to the remote side.
    async fn run_handlers(&self, method: &str, params: Value) -> Option<Value> {
        let handlers: Vec<Arc<dyn NotificationHandler>> =
            self.inner.handlers.lock().unwrap().clone();

        let mut reply = None;
        for handler in handlers {
            match handler.handle(method, params.clone()).await {
                Ok(Some(value)) if reply.is_none() => reply = Some(value),
                Ok(_) => {}
                Err(e) => warn!(method, err = %e, "notification handler failed"),
            }
        }
        reply
    }

    // ─── Teardown ───────────────────────────────────────────────────────────

    /// Clear the ready flag and fail every outstanding call with
    /// [`CallError::Disconnected`]. Idempotent.
    pub fn shutdown(&self) {
        self.set_connected(false);
        let drained: Vec<(RequestId, PendingCall)> =
            self.inner.pending.lock().unwrap().drain().collect();
        for (id, call) in drained {
            debug!(
                %id,
                method = %call.method,
                age_ms = call.created_at.elapsed().as_millis() as u64,
                "failing in-flight call on shutdown"
            );
            let _ = call.tx.send(Err(CallError::Disconnected));
        }
    }
}

impl ClientInner {
    /// Parse a transport response body and route it to the pending map.
    ///
    /// `origin` is the id of the call whose HTTP exchange produced this body;
    /// a body that is not a valid response fails that call, but a valid
    /// response is matched by the id it carries.
    fn route_raw(inner: &Arc<ClientInner>, origin: &RequestId, raw: String) {
        match Incoming::parse(&raw) {
            Ok(Incoming::Response(resp)) => {
                let id = resp.id.clone();
                let matched = Self::complete(inner, &id, resp);
                // A body answering an id nobody allocated must not leave the
                // originating call pending until shutdown.
                if !matched && inner.pending.lock().unwrap().contains_key(origin) {
                    Self::fail(
                        inner,
                        origin,
                        CallError::Internal(anyhow::anyhow!(
                            "response body carried unknown id {id}"
                        )),
                    );
                }
            }
            Ok(other) => {
                warn!(%origin, "expected a response body, got {other:?}");
                Self::fail(
                    inner,
                    origin,
                    CallError::Internal(anyhow::anyhow!("response body was not a response")),
                );
            }
            Err(e) => Self::fail(inner, origin, CallError::Internal(e)),
        }
    }

    /// Resolve the pending call matching `id` with a parsed response.
    /// Returns whether a pending entry was found.
    fn complete(inner: &Arc<ClientInner>, id: &RequestId, resp: RpcResponse) -> bool {
        let outcome = match resp.error {
            Some(err) => Err(CallError::Remote {
                code: err.code,
                message: err.message,
                data: err.data,
            }),
            None => Ok(resp.result.unwrap_or(Value::Null)),
        };
        Self::deliver(inner, id, outcome)
    }

    fn fail(inner: &Arc<ClientInner>, id: &RequestId, err: CallError) {
        Self::deliver(inner, id, Err(err));
    }

    fn deliver(inner: &Arc<ClientInner>, id: &RequestId, outcome: Result<Value, CallError>) -> bool {
        let entry = inner.pending.lock().unwrap().remove(id);
        match entry {
            // Receiver gone means the caller was already failed by shutdown.
            Some(call) => {
                let _ = call.tx.send(outcome);
                true
            }
            None => {
                warn!(%id, "response with no pending call — dropped");
                false
            }
        }
    }
}

impl From<TransportError> for CallError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Status(status) => Self::Http { status },
            TransportError::Unreachable(_) => Self::Unreachable,
            TransportError::Internal(source) => Self::Internal(source),
        }
    }
}
