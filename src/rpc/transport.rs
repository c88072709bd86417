//! HTTP POST transport for JSON-RPC payloads.
//!
//! The transport is deliberately dumb: it ships one serialized payload to the
//! configured endpoint and hands back the raw response body. Correlation,
//! parsing, and retry policy all live above it in [`RpcClient`].
//!
//! [`RpcClient`]: crate::rpc::RpcClient

use async_trait::async_trait;
use std::time::Duration;

use crate::config::{AuthType, Endpoint};

// ─── Errors ───────────────────────────────────────────────────────────────────

/// Transport-level failure, split the way the client's taxonomy needs it.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The remote responded with a non-success HTTP status.
    #[error("HTTP status {0}")]
    Status(u16),

    /// No response at all — connect failure or timeout.
    #[error("endpoint unreachable: {0}")]
    Unreachable(#[source] anyhow::Error),

    /// Local fault before the request left the process.
    #[error("transport internal error: {0}")]
    Internal(#[source] anyhow::Error),
}

// ─── Transport trait ──────────────────────────────────────────────────────────

/// Sends one JSON-RPC payload and returns the raw response body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, body: String) -> Result<String, TransportError>;
}

// ─── HTTP implementation ──────────────────────────────────────────────────────

/// Reqwest-backed transport posting to a single endpoint URL.
pub struct HttpTransport {
    http: reqwest::Client,
    url: String,
    bearer: Option<String>,
}

impl HttpTransport {
    /// Build a transport bound to `endpoint`.
    ///
    /// Applies the endpoint timeout to every request. For api-key and jwt
    /// auth the credential is sent as an `Authorization: Bearer` header.
    pub fn new(endpoint: &Endpoint) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(endpoint.timeout_ms))
            .build()
            .map_err(|e| TransportError::Internal(e.into()))?;

        let bearer = match endpoint.auth {
            AuthType::None => None,
            AuthType::ApiKey | AuthType::Jwt => endpoint.credential.clone(),
        };

        Ok(Self {
            http,
            url: endpoint.base_url.clone(),
            bearer,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, body: String) -> Result<String, TransportError> {
        let mut req = self
            .http
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(token) = &self.bearer {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_builder() {
                TransportError::Internal(e.into())
            } else {
                // Connect refused, DNS failure, timeout — no response arrived.
                TransportError::Unreachable(e.into())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        resp.text()
            .await
            .map_err(|e| TransportError::Internal(e.into()))
    }
}
