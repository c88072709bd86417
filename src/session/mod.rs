// SPDX-License-Identifier: MIT
//! Connection lifecycle: activate / reconnect / disconnect.
//!
//! `Session` is the single owner of the live client and bridge — there is no
//! module-level singleton anywhere in the crate. State transitions:
//!
//! ```text
//! Disconnected → Connecting → Connected
//! Connected/Connecting → Reconnecting → Connecting → Connected
//! ```
//!
//! Reconnecting always rebuilds from scratch: fresh configuration, fresh
//! client (request ids restart at 1), fresh bridge.

pub mod watcher;

use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, info, warn};

use crate::bridge::{EditorBridge, EditorEvent, Presenter};
use crate::config::{ConfigSource, ReconnectConfig};
use crate::rpc::{HttpTransport, RpcClient};

/// Capacity of the editor-event fan-out channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

// ─── Connection state ─────────────────────────────────────────────────────────

/// Externally visible connection state, surfaced through a watch channel so
/// status consumers (a status bar, a prompt) can react to transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

// ─── Session ──────────────────────────────────────────────────────────────────

/// The live client + bridge pair for one connection.
struct Active {
    client: RpcClient,
    bridge: EditorBridge,
}

/// Owns the connection lifecycle and every live collaborator.
pub struct Session {
    config_source: Arc<dyn ConfigSource>,
    presenter: Arc<dyn Presenter>,
    events: broadcast::Sender<EditorEvent>,
    state_tx: watch::Sender<ConnectionState>,
    active: Mutex<Option<Active>>,
    /// Reconnect policy from the most recent successful config load.
    reconnect_policy: std::sync::Mutex<ReconnectConfig>,
    /// Consecutive failed *automatic* reconnects, reset on success.
    auto_failures: AtomicU32,
}

impl Session {
    pub fn new(config_source: Arc<dyn ConfigSource>, presenter: Arc<dyn Presenter>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config_source,
            presenter,
            events,
            state_tx,
            active: Mutex::new(None),
            reconnect_policy: std::sync::Mutex::new(ReconnectConfig::default()),
            auto_failures: AtomicU32::new(0),
        }
    }

    /// Sender the editor host uses to emit save/open/selection events.
    pub fn event_sender(&self) -> broadcast::Sender<EditorEvent> {
        self.events.clone()
    }

    /// Subscribe to connection-state transitions.
    pub fn state_rx(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Current state snapshot.
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Handle to the live RPC client, if connected.
    pub async fn client(&self) -> Option<RpcClient> {
        self.active.lock().await.as_ref().map(|a| a.client.clone())
    }

    fn set_state(&self, state: ConnectionState) {
        debug!(%state, "connection state transition");
        self.state_tx.send_replace(state);
    }

    // ─── Lifecycle operations ───────────────────────────────────────────────

    /// Load configuration and bring up a fresh client + bridge.
    ///
    /// Configuration errors are fatal to the attempt and leave the session
    /// disconnected. A failed liveness probe is not — probe support is
    /// optional server behavior.
    pub async fn activate(&self) -> anyhow::Result<()> {
        let mut slot = self.active.lock().await;
        self.connect(&mut slot).await
    }

    /// Tear down the current connection and rebuild it from freshly reloaded
    /// configuration. Every in-flight call fails with `Disconnected`.
    pub async fn reconnect(&self) -> anyhow::Result<()> {
        let mut slot = self.active.lock().await;
        self.set_state(ConnectionState::Reconnecting);
        Self::teardown(&mut slot);
        self.connect(&mut slot).await
    }

    /// Tear down and go quiet. Idempotent — disconnecting while disconnected
    /// is a no-op.
    pub async fn disconnect(&self) {
        let mut slot = self.active.lock().await;
        if slot.is_none() && self.state() == ConnectionState::Disconnected {
            return;
        }
        Self::teardown(&mut slot);
        self.set_state(ConnectionState::Disconnected);
        info!("disconnected from remote host");
    }

    /// Reconnect triggered by a configuration change rather than an operator.
    ///
    /// Honors the configured policy: skipped when `reconnect.enabled` is
    /// false or after `max_attempts` consecutive failures. An explicit
    /// [`Session::reconnect`] is never gated.
    pub async fn auto_reconnect(&self) {
        let policy = self.reconnect_policy.lock().unwrap().clone();
        if !policy.enabled {
            debug!("config changed but automatic reconnect is disabled");
            return;
        }
        let failures = self.auto_failures.load(Ordering::SeqCst);
        if failures >= policy.max_attempts {
            warn!(
                failures,
                max_attempts = policy.max_attempts,
                "automatic reconnect attempts exhausted — reconnect manually"
            );
            return;
        }

        info!("configuration changed — reconnecting");
        match self.reconnect().await {
            Ok(()) => {
                self.auto_failures.store(0, Ordering::SeqCst);
            }
            Err(e) => {
                self.auto_failures.fetch_add(1, Ordering::SeqCst);
                warn!(err = %e, "automatic reconnect failed");
            }
        }
    }

    // ─── Internals ──────────────────────────────────────────────────────────

    async fn connect(&self, slot: &mut Option<Active>) -> anyhow::Result<()> {
        self.set_state(ConnectionState::Connecting);
        match self.try_connect(slot).await {
            Ok(()) => {
                self.set_state(ConnectionState::Connected);
                Ok(())
            }
            Err(e) => {
                Self::teardown(slot);
                self.set_state(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    async fn try_connect(&self, slot: &mut Option<Active>) -> anyhow::Result<()> {
        // Fully await the configuration load before touching the network.
        let config = self.config_source.load().await?;
        let endpoint = config.resolve_endpoint()?;
        *self.reconnect_policy.lock().unwrap() = config.reconnect.clone();

        let transport = Arc::new(HttpTransport::new(&endpoint)?);
        let client = RpcClient::new(transport);
        client.set_connected(true);

        // Advisory liveness probe. Servers are not required to implement
        // `ping`; any failure is logged and swallowed.
        match client.call("ping", json!({})).await {
            Ok(_) => info!(url = %endpoint.base_url, "connected to remote host"),
            Err(e) => info!(
                url = %endpoint.base_url,
                err = %e,
                "connected to remote host (ping not supported)"
            ),
        }

        let bridge = EditorBridge::new(
            client.clone(),
            self.presenter.clone(),
            self.events.subscribe(),
        );

        *slot = Some(Active { client, bridge });
        Ok(())
    }

    /// Dispose the bridge and fail every outstanding call.
    fn teardown(slot: &mut Option<Active>) {
        if let Some(active) = slot.take() {
            active.bridge.dispose();
            active.client.shutdown();
        }
    }
}
