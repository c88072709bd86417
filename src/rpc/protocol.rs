//! JSON-RPC 2.0 wire types.
//!
//! Requests carry an `id`; notifications are the same envelope without one.
//! Responses carry either `result` or `error`, never both. Outbound ids are
//! always integers, but the remote side may correlate with string ids, so
//! [`RequestId`] accepts both forms.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const JSONRPC_VERSION: &str = "2.0";

/// Envelope metadata key merged into every structured outbound `params`.
pub const CONTEXT_KEY: &str = "@context";

/// Vocabulary identifier carried under [`CONTEXT_KEY`].
pub const CONTEXT_VOCAB: &str = "https://vscode-api.org/vocab#";

// ─── Request id ───────────────────────────────────────────────────────────────

/// A JSON-RPC correlation id — integer or string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(u64),
    Text(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<u64> for RequestId {
    fn from(n: u64) -> Self {
        Self::Number(n)
    }
}

// ─── Envelopes ────────────────────────────────────────────────────────────────

/// Outbound request or notification (notification when `id` is `None`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
}

impl RpcRequest {
    pub fn call(method: &str, params: Value, id: u64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            params: with_context(params),
            id: Some(RequestId::Number(id)),
        }
    }

    pub fn notification(method: &str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            params: with_context(params),
            id: None,
        }
    }
}

/// Inbound (or outbound reply) response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
    pub id: RequestId,
}

impl RpcResponse {
    /// Build a success reply to an inbound request.
    pub fn reply(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }
}

/// The `error` member of a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// ─── Inbound classification ───────────────────────────────────────────────────

/// One parsed inbound message, classified by shape.
#[derive(Debug)]
pub enum Incoming {
    /// Correlated reply to one of our calls (`id`, no `method`).
    Response(RpcResponse),
    /// Remote-initiated call expecting a reply (`method` + `id`).
    Request {
        id: RequestId,
        method: String,
        params: Value,
    },
    /// One-way message (`method`, no `id`).
    Notification { method: String, params: Value },
}

impl Incoming {
    /// Classify a raw inbound body.
    ///
    /// Anything that is valid JSON but matches none of the three JSON-RPC
    /// shapes is an error — callers map it to their malformed-body variant.
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        let obj = value
            .as_object()
            .ok_or_else(|| anyhow::anyhow!("JSON-RPC message is not an object"))?;

        if obj.contains_key("method") {
            let method = obj["method"]
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("'method' is not a string"))?
                .to_string();
            let params = obj.get("params").cloned().unwrap_or(Value::Null);
            return match obj.get("id") {
                Some(id) => Ok(Self::Request {
                    id: serde_json::from_value(id.clone())?,
                    method,
                    params,
                }),
                None => Ok(Self::Notification { method, params }),
            };
        }

        if obj.contains_key("result") || obj.contains_key("error") {
            return Ok(Self::Response(serde_json::from_value(value)?));
        }

        anyhow::bail!("JSON-RPC message has neither 'method' nor 'result'/'error'")
    }
}

// ─── Envelope context ─────────────────────────────────────────────────────────

/// Merge the fixed `@context` vocabulary marker into structured params.
///
/// Caller keys always win: the marker is inserted only when the object does
/// not already carry an `@context` key, and no existing key is ever
/// overwritten. Non-object params pass through unchanged.
pub fn with_context(params: Value) -> Value {
    match params {
        Value::Object(mut map) => {
            if !map.contains_key(CONTEXT_KEY) {
                let mut merged = Map::with_capacity(map.len() + 1);
                merged.insert(CONTEXT_KEY.to_string(), json!({ "@vocab": CONTEXT_VOCAB }));
                merged.append(&mut map);
                Value::Object(merged)
            } else {
                Value::Object(map)
            }
        }
        other => other,
    }
}
