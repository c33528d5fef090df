//! Rich-text runs to HTML and Markdown.

use serde_json::Value;

/// Escape text for use in element content and quoted attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[derive(Debug, Default, Clone, Copy)]
struct Annotations {
    bold: bool,
    italic: bool,
    strikethrough: bool,
    underline: bool,
    code: bool,
}

impl Annotations {
    fn of(run: &Value) -> Self {
        let flag = |name: &str| {
            run.pointer(&format!("/annotations/{name}"))
                .and_then(Value::as_bool)
                .unwrap_or(false)
        };
        Self {
            bold: flag("bold"),
            italic: flag("italic"),
            strikethrough: flag("strikethrough"),
            underline: flag("underline"),
            code: flag("code"),
        }
    }
}

/// Concatenated plain text of a run list.
pub fn plain_text(runs: &[Value]) -> String {
    runs.iter().map(run_text).collect()
}

pub fn to_html(runs: &[Value]) -> String {
    let mut out = String::new();
    for run in runs {
        let text = run_text(run);
        if text.is_empty() {
            continue;
        }

        if run.get("type").and_then(Value::as_str) == Some("equation") {
            out.push_str(&format!(
                "<span class=\"equation\">{}</span>",
                escape_html(text)
            ));
            continue;
        }

        let annotations = Annotations::of(run);
        let mut html = escape_html(text).replace('\n', "<br />");
        if annotations.code {
            html = format!("<code>{html}</code>");
        }
        if annotations.bold {
            html = format!("<strong>{html}</strong>");
        }
        if annotations.italic {
            html = format!("<em>{html}</em>");
        }
        if annotations.strikethrough {
            html = format!("<s>{html}</s>");
        }
        if annotations.underline {
            html = format!("<u>{html}</u>");
        }
        if let Some(href) = run_href(run) {
            html = format!("<a href=\"{}\">{html}</a>", escape_html(href));
        }
        out.push_str(&html);
    }
    out
}

pub fn to_markdown(runs: &[Value]) -> String {
    let mut out = String::new();
    for run in runs {
        let text = run_text(run);
        if text.is_empty() {
            continue;
        }

        if run.get("type").and_then(Value::as_str) == Some("equation") {
            out.push_str(&format!("${text}$"));
            continue;
        }

        let annotations = Annotations::of(run);
        let mut md = text.to_string();
        if annotations.code {
            md = format!("`{md}`");
        }
        if annotations.bold {
            md = format!("**{md}**");
        }
        if annotations.italic {
            md = format!("_{md}_");
        }
        if annotations.strikethrough {
            md = format!("~~{md}~~");
        }
        if let Some(href) = run_href(run) {
            md = format!("[{md}]({href})");
        }
        out.push_str(&md);
    }
    out
}

fn run_text(run: &Value) -> &str {
    run.get("plain_text")
        .and_then(Value::as_str)
        .or_else(|| run.pointer("/text/content").and_then(Value::as_str))
        .or_else(|| run.pointer("/equation/expression").and_then(Value::as_str))
        .unwrap_or_default()
}

fn run_href(run: &Value) -> Option<&str> {
    run.get("href")
        .and_then(Value::as_str)
        .or_else(|| run.pointer("/text/link/url").and_then(Value::as_str))
        .filter(|href| !href.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn annotations_nest_in_html() {
        let runs = vec![
            json!({ "plain_text": "plain " }),
            json!({
                "plain_text": "bold link",
                "href": "https://example.com/?a=1&b=2",
                "annotations": { "bold": true }
            }),
        ];
        assert_eq!(
            to_html(&runs),
            "plain <a href=\"https://example.com/?a=1&amp;b=2\"><strong>bold link</strong></a>"
        );
    }

    #[test]
    fn text_is_escaped() {
        let runs = vec![json!({ "plain_text": "<script>" })];
        assert_eq!(to_html(&runs), "&lt;script&gt;");
    }

    #[test]
    fn markdown_wraps_annotations() {
        let runs = vec![json!({
            "text": { "content": "fn", "link": null },
            "annotations": { "code": true, "italic": true }
        })];
        assert_eq!(to_markdown(&runs), "_`fn`_");
    }
}
