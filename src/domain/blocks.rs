//! Content-source blocks and the pagination envelope they arrive in.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Block kind carrying source code and a language label.
pub const CODE_BLOCK: &str = "code";

/// Opaque content-source node.
///
/// Only `id` and `type` are modelled explicitly; the type-specific payload and
/// any other upstream fields are kept verbatim so blocks of unknown kinds
/// survive a round trip through this crate untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Block {
    /// Build a block from its kind and payload object, mostly useful in tests.
    pub fn new(id: impl Into<String>, kind: impl Into<String>, payload: Value) -> Self {
        let kind = kind.into();
        let mut fields = Map::new();
        fields.insert(kind.clone(), payload);
        Self {
            id: id.into(),
            kind,
            fields,
        }
    }

    /// The payload object keyed by the block's own kind, e.g. `block["code"]`.
    pub fn payload(&self) -> Option<&Map<String, Value>> {
        self.fields.get(&self.kind).and_then(Value::as_object)
    }

    pub fn payload_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.fields.get_mut(&self.kind).and_then(Value::as_object_mut)
    }

    pub fn is_code(&self) -> bool {
        self.kind == CODE_BLOCK
    }

    /// Raw language label of a code block, if present and textual.
    pub fn code_language(&self) -> Option<&str> {
        if !self.is_code() {
            return None;
        }
        self.payload()?.get("language")?.as_str()
    }

    /// Rich-text runs of the payload (`rich_text`, falling back to legacy `text`).
    pub fn rich_text(&self) -> &[Value] {
        self.payload()
            .and_then(|payload| payload.get("rich_text").or_else(|| payload.get("text")))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// One page of a "list children" response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockPage {
    #[serde(default)]
    pub results: Vec<Block>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl BlockPage {
    /// Cursor to continue from, present only while upstream reports more data.
    pub fn continuation(&self) -> Option<&str> {
        if self.has_more {
            self.next_cursor.as_deref().filter(|cursor| !cursor.is_empty())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_fields_round_trip() {
        let raw = json!({
            "object": "block",
            "id": "b1",
            "type": "synced_block",
            "synced_block": { "synced_from": null },
            "has_children": true
        });

        let block: Block = serde_json::from_value(raw.clone()).expect("block parses");
        assert_eq!(block.kind, "synced_block");
        assert_eq!(serde_json::to_value(&block).expect("serializes"), raw);
    }

    #[test]
    fn code_language_reads_payload() {
        let block = Block::new("c1", "code", json!({ "language": "Rust", "rich_text": [] }));
        assert_eq!(block.code_language(), Some("Rust"));

        let paragraph = Block::new("p1", "paragraph", json!({ "language": "Rust" }));
        assert_eq!(paragraph.code_language(), None);
    }

    #[test]
    fn continuation_requires_has_more() {
        let page = BlockPage {
            results: Vec::new(),
            has_more: false,
            next_cursor: Some("abc".into()),
        };
        assert_eq!(page.continuation(), None);

        let page = BlockPage {
            has_more: true,
            next_cursor: None,
            ..Default::default()
        };
        assert_eq!(page.continuation(), None);
    }
}
