//! hostbridge — editor ↔ remote-process JSON-RPC bridge.
//!
//! Connects an editor host to a remote process over JSON-RPC 2.0 carried on
//! HTTP POST. The crate owns the protocol and state-machine logic: request
//! correlation, notification dispatch, connection lifecycle, and the error
//! taxonomy. Everything editor-specific — how a message box is shown, where
//! settings live, how events are captured — enters through traits
//! ([`Presenter`], [`ConfigSource`]) and channels the embedding host wires up.
//!
//! ```text
//! editor event ──► EditorBridge ──► RpcClient ──► HttpTransport ──► remote
//! remote call  ──► RpcClient ──► EditorBridge ──► Presenter ──► reply
//! ```
//!
//! Typical embedding:
//!
//! ```rust,ignore
//! let session = Arc::new(Session::new(
//!     Arc::new(FileConfigSource::new("bridge.toml")),
//!     Arc::new(MyPresenter),
//! ));
//! session.activate().await?;
//! let events = session.event_sender();
//! // forward editor events into `events`; call session.disconnect() on exit
//! ```

pub mod bridge;
pub mod config;
pub mod observability;
pub mod rpc;
pub mod session;

pub use bridge::{EditorBridge, EditorEvent, MessageSeverity, Presenter};
pub use config::{BridgeConfig, ConfigError, ConfigSource, Endpoint, FileConfigSource};
pub use rpc::{CallError, RpcClient};
pub use session::{ConnectionState, Session};
