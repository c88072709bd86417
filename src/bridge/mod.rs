//! Editor bridge — translates between editor-native events and protocol
//! payloads, and routes inbound methods to editor-side actions.
//!
//! One bridge instance registers exactly one inbound dispatcher on its client
//! and runs exactly one event-forwarding task. `dispose()` stops forwarding;
//! a bridge rebuilt on a fresh client never double-delivers.

pub mod events;
pub mod messages;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::rpc::{NotificationHandler, RpcClient};
pub use events::{DocumentRef, EditorEvent, Position, SelectionRange};
pub use messages::{InboundMessage, MessageSeverity, ShowMessageParams};

// ─── Presenter ────────────────────────────────────────────────────────────────

/// Editor-side presentation primitive: show a message with optional action
/// items and return the user's selection, if any.
#[async_trait]
pub trait Presenter: Send + Sync {
    async fn show_message(
        &self,
        severity: MessageSeverity,
        message: &str,
        items: &[String],
    ) -> Option<String>;
}

// ─── Inbound dispatch ─────────────────────────────────────────────────────────

/// Routes inbound protocol methods to the presenter.
///
/// Reply semantics are uniform across severities: the handler always returns
/// the selection payload, and the client sends it back only when the inbound
/// message was structurally a request. Unknown methods are ignored.
struct InboundDispatcher {
    presenter: Arc<dyn Presenter>,
}

#[async_trait]
impl NotificationHandler for InboundDispatcher {
    async fn handle(&self, method: &str, params: Value) -> anyhow::Result<Option<Value>> {
        match InboundMessage::parse(method, params)? {
            InboundMessage::ShowMessage { severity, params } => {
                let selection = self
                    .presenter
                    .show_message(severity, &params.message, &params.items)
                    .await;
                debug!(%severity, selection = ?selection, "show-message handled");
                Ok(Some(match selection {
                    Some(item) => Value::String(item),
                    None => Value::Null,
                }))
            }
            InboundMessage::Unknown { method, .. } => {
                debug!(method = %method, "ignoring unknown inbound method");
                Ok(None)
            }
        }
    }
}

// ─── Bridge ───────────────────────────────────────────────────────────────────

/// Live bridge between one editor host and one RPC client.
pub struct EditorBridge {
    forward_task: JoinHandle<()>,
}

impl EditorBridge {
    /// Wire up inbound dispatch and start forwarding editor events.
    ///
    /// Events are forwarded sequentially in arrival order; `notify` is
    /// best-effort, so a dead endpoint slows nothing and crashes nothing.
    pub fn new(
        client: RpcClient,
        presenter: Arc<dyn Presenter>,
        mut events: broadcast::Receiver<EditorEvent>,
    ) -> Self {
        client.on_notification(Arc::new(InboundDispatcher { presenter }));

        let forward_client = client.clone();
        let forward_task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        forward_client.notify(event.method(), event.params()).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "editor event stream lagged — events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Self { forward_task }
    }

    /// Stop event forwarding. Idempotent; also runs on drop.
    pub fn dispose(&self) {
        self.forward_task.abort();
    }
}

impl Drop for EditorBridge {
    fn drop(&mut self) {
        self.forward_task.abort();
    }
}
