//! Compatibility shim between free-text language labels from the content
//! source and the grammar names the syntax highlighter resolves.

use serde_json::Value;

use crate::domain::blocks::Block;

/// Canonical token for code without a recognised language.
pub const PLAINTEXT: &str = "plaintext";

const PLAINTEXT_ALIASES: [&str; 4] = ["plain text", "plain-text", "text", "txt"];

const LANGUAGE_ALIASES: [(&str, &str); 5] = [
    ("c++", "cpp"),
    ("c#", "csharp"),
    ("f#", "fsharp"),
    ("objective-c", "objectivec"),
    ("visual basic", "vb"),
];

/// Rewrite code-block language tags; every other field, the block order and
/// block identity are preserved.
pub fn normalize(blocks: Vec<Block>) -> Vec<Block> {
    blocks.into_iter().map(normalize_block).collect()
}

pub fn normalize_block(mut block: Block) -> Block {
    if !block.is_code() {
        return block;
    }

    let Some(payload) = block.payload_mut() else {
        return block;
    };

    let canonical = canonical_language(payload.get("language").and_then(Value::as_str));
    let unchanged = payload.get("language").and_then(Value::as_str) == Some(canonical.as_str());
    if !unchanged {
        payload.insert("language".to_string(), Value::String(canonical));
    }
    block
}

/// Map a raw label to the highlighter vocabulary.
pub fn canonical_language(raw: Option<&str>) -> String {
    let Some(label) = raw.map(str::trim).filter(|label| !label.is_empty()) else {
        return PLAINTEXT.to_string();
    };

    let lowered = label.to_lowercase();
    if PLAINTEXT_ALIASES.contains(&lowered.as_str()) {
        return PLAINTEXT.to_string();
    }

    LANGUAGE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, canonical)| (*canonical).to_string())
        .unwrap_or(lowered)
}
