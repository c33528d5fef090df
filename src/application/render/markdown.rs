//! Block sequence to Markdown, used by the conversion endpoint.

use serde_json::Value;

use crate::domain::blocks::Block;

use super::blocks::media_url;
use super::rich_text::{plain_text, to_markdown};

pub fn blocks_to_markdown(blocks: &[Block]) -> String {
    let mut out: Vec<String> = Vec::with_capacity(blocks.len());
    let mut numbered = 0usize;

    for block in blocks {
        if block.kind == "numbered_list_item" {
            numbered += 1;
        } else {
            numbered = 0;
        }

        let text = to_markdown(block.rich_text());
        let rendered = match block.kind.as_str() {
            "paragraph" => text,
            "heading_1" => format!("# {text}"),
            "heading_2" => format!("## {text}"),
            "heading_3" => format!("### {text}"),
            "bulleted_list_item" => format!("- {text}"),
            "numbered_list_item" => format!("{numbered}. {text}"),
            "to_do" => {
                let checked = block
                    .payload()
                    .and_then(|p| p.get("checked"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                format!("- [{}] {text}", if checked { "x" } else { " " })
            }
            "toggle" => format!("- {text}"),
            "quote" | "callout" => text
                .lines()
                .map(|line| format!("> {line}"))
                .collect::<Vec<_>>()
                .join("\n"),
            "code" => {
                let language = block.code_language().unwrap_or_default();
                let code = plain_text(block.rich_text());
                format!("```{language}\n{code}\n```")
            }
            "divider" => "---".to_string(),
            "equation" => {
                let expression = block
                    .payload()
                    .and_then(|p| p.get("expression"))
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                format!("$$\n{expression}\n$$")
            }
            "image" => match media_url(block) {
                Some(url) => format!("![{}]({url})", caption(block)),
                None => continue,
            },
            "bookmark" | "embed" | "link_preview" => {
                match block.payload().and_then(|p| p.get("url")).and_then(Value::as_str) {
                    Some(url) => {
                        let label = caption(block);
                        let label = if label.is_empty() { url.to_string() } else { label };
                        format!("[{label}]({url})")
                    }
                    None => continue,
                }
            }
            _ => continue,
        };
        out.push(rendered);
    }

    join_blocks(blocks, out)
}

fn caption(block: &Block) -> String {
    block
        .payload()
        .and_then(|p| p.get("caption"))
        .and_then(Value::as_array)
        .map(|runs| plain_text(runs))
        .unwrap_or_default()
}

/// Adjacent list items are separated by a single newline, everything else
/// by a blank line.
fn join_blocks(blocks: &[Block], rendered: Vec<String>) -> String {
    let kinds: Vec<&str> = blocks
        .iter()
        .filter(|b| is_rendered(b))
        .map(|b| b.kind.as_str())
        .collect();

    let mut out = String::new();
    for (index, chunk) in rendered.iter().enumerate() {
        if index > 0 {
            let tight = is_list(kinds.get(index - 1).copied()) && is_list(kinds.get(index).copied());
            out.push_str(if tight { "\n" } else { "\n\n" });
        }
        out.push_str(chunk);
    }
    out
}

fn is_list(kind: Option<&str>) -> bool {
    matches!(
        kind,
        Some("bulleted_list_item" | "numbered_list_item" | "to_do" | "toggle")
    )
}

fn is_rendered(block: &Block) -> bool {
    match block.kind.as_str() {
        "paragraph" | "heading_1" | "heading_2" | "heading_3" | "bulleted_list_item"
        | "numbered_list_item" | "to_do" | "toggle" | "quote" | "callout" | "code"
        | "divider" | "equation" => true,
        "image" => media_url(block).is_some(),
        "bookmark" | "embed" | "link_preview" => block
            .payload()
            .and_then(|p| p.get("url"))
            .and_then(Value::as_str)
            .is_some(),
        _ => false,
    }
}
