// SPDX-License-Identifier: MIT
//! Error taxonomy for the RPC client and configuration layer.

use serde_json::Value;

/// Errors surfaced by [`RpcClient::call`](crate::rpc::RpcClient::call).
///
/// `notify()` never returns these — notification failures are logged and
/// swallowed at the client boundary.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// Call attempted while the client is not connected. Local — no network
    /// I/O was performed.
    #[error("not connected to remote host")]
    NotConnected,

    /// No response from the remote endpoint (unreachable host or timeout).
    #[error("no response from remote host — is it running?")]
    Unreachable,

    /// The remote responded, but with a non-success HTTP status.
    #[error("HTTP error: {status}")]
    Http { status: u16 },

    /// Well-formed JSON-RPC error response.
    #[error("remote error {code}: {message}")]
    Remote {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    /// The client was torn down while this call was in flight.
    #[error("disconnected while call was in flight")]
    Disconnected,

    /// Malformed response body, serialization failure, or any other local
    /// fault before/after the request left the process.
    #[error("internal client error: {0}")]
    Internal(#[from] anyhow::Error),
}
