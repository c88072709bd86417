// SPDX-License-Identifier: MIT
//! Typed inbound payloads.
//!
//! The remote side calls a small, closed set of editor-surface methods; each
//! gets a typed shape validated at the protocol boundary. Everything else is
//! carried as raw JSON so unknown methods flow through without breaking
//! forward compatibility.

use serde::Deserialize;
use serde_json::Value;

/// Severity of a show-message call, one per `window.show*Message` method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Information,
    Warning,
    Error,
}

impl std::fmt::Display for MessageSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Information => write!(f, "information"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Params of the `window.show*Message` family.
#[derive(Debug, Clone, Deserialize)]
pub struct ShowMessageParams {
    pub message: String,
    /// Action items offered alongside the message, in presentation order.
    #[serde(default)]
    pub items: Vec<String>,
}

/// One inbound method, parsed where the shape is known.
#[derive(Debug)]
pub enum InboundMessage {
    ShowMessage {
        severity: MessageSeverity,
        params: ShowMessageParams,
    },
    /// Method we do not handle — kept raw and ignored by the bridge.
    Unknown { method: String, params: Value },
}

impl InboundMessage {
    /// Parse `(method, params)` into a typed message.
    ///
    /// A known method with malformed params is an error; unknown methods are
    /// never an error.
    pub fn parse(method: &str, params: Value) -> anyhow::Result<Self> {
        let severity = match method {
            "window.showInformationMessage" => Some(MessageSeverity::Information),
            "window.showWarningMessage" => Some(MessageSeverity::Warning),
            "window.showErrorMessage" => Some(MessageSeverity::Error),
            _ => None,
        };

        match severity {
            Some(severity) => {
                let params: ShowMessageParams = serde_json::from_value(params)
                    .map_err(|e| anyhow::anyhow!("malformed {method} params: {e}"))?;
                Ok(Self::ShowMessage { severity, params })
            }
            None => Ok(Self::Unknown {
                method: method.to_string(),
                params,
            }),
        }
    }
}
