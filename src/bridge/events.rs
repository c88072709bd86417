//! Editor-originated events and their wire payloads.
//!
//! Field names in the serialized payloads are part of the wire contract with
//! the remote process — changing them is a protocol break.

use serde::Serialize;
use serde_json::{json, Value};

/// Reference to a text document, as the remote side sees it.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRef {
    pub uri: String,
    #[serde(rename = "languageId")]
    pub language_id: String,
    pub version: i64,
}

/// Zero-based position within a document.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

/// One selection span.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SelectionRange {
    pub start: Position,
    pub end: Position,
}

/// Editor events the bridge forwards as one-way notifications.
#[derive(Debug, Clone)]
pub enum EditorEvent {
    DidSaveTextDocument(DocumentRef),
    DidOpenTextDocument(DocumentRef),
    SelectionChanged {
        uri: String,
        selections: Vec<SelectionRange>,
    },
}

impl EditorEvent {
    /// Outbound notification method name for this event kind.
    pub fn method(&self) -> &'static str {
        match self {
            Self::DidSaveTextDocument(_) => "event.workspace.didSaveTextDocument",
            Self::DidOpenTextDocument(_) => "event.workspace.didOpenTextDocument",
            Self::SelectionChanged { .. } => "event.window.onDidChangeTextEditorSelection",
        }
    }

    /// Canonical notification params for this event.
    pub fn params(&self) -> Value {
        match self {
            Self::DidSaveTextDocument(doc) | Self::DidOpenTextDocument(doc) => {
                json!({ "document": doc })
            }
            Self::SelectionChanged { uri, selections } => json!({
                "textEditor": { "document": { "uri": uri } },
                "selections": selections,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_payload_shape() {
        let ev = EditorEvent::DidSaveTextDocument(DocumentRef {
            uri: "file:///tmp/a.rb".into(),
            language_id: "ruby".into(),
            version: 4,
        });
        assert_eq!(ev.method(), "event.workspace.didSaveTextDocument");
        assert_eq!(
            ev.params(),
            serde_json::json!({
                "document": { "uri": "file:///tmp/a.rb", "languageId": "ruby", "version": 4 }
            })
        );
    }

    #[test]
    fn selection_payload_shape() {
        let ev = EditorEvent::SelectionChanged {
            uri: "file:///tmp/a.rb".into(),
            selections: vec![SelectionRange {
                start: Position { line: 1, character: 0 },
                end: Position { line: 1, character: 5 },
            }],
        };
        assert_eq!(
            ev.params(),
            serde_json::json!({
                "textEditor": { "document": { "uri": "file:///tmp/a.rb" } },
                "selections": [
                    { "start": { "line": 1, "character": 0 },
                      "end": { "line": 1, "character": 5 } }
                ]
            })
        );
    }
}
