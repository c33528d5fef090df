//! Block sequence to HTML.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::blocks::Block;

use super::highlight::highlight_code;
use super::rich_text::{escape_html, plain_text, to_html};
use super::types::{LinkPreview, LinkPreviewer, RenderError, RenderMode, RendererConfig};
use crate::application::normalize::PLAINTEXT;

/// Immutable renderer built per call by [`build_renderer`].
pub struct BlockRenderer {
    mode: RenderMode,
    previewer: Option<Arc<dyn LinkPreviewer>>,
}

/// Assemble a renderer for one render attempt. Embed enrichment only runs when
/// it is enabled and a previewer is available.
pub fn build_renderer(
    config: RendererConfig,
    previewer: Option<Arc<dyn LinkPreviewer>>,
) -> BlockRenderer {
    match previewer {
        Some(previewer) if config.enable_embed_enrichment => BlockRenderer {
            mode: RenderMode::Enriched,
            previewer: Some(previewer),
        },
        _ => BlockRenderer {
            mode: RenderMode::Degraded,
            previewer: None,
        },
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Bulleted,
    Numbered,
    ToDo,
}

impl ListKind {
    fn of(kind: &str) -> Option<Self> {
        match kind {
            "bulleted_list_item" => Some(ListKind::Bulleted),
            "numbered_list_item" => Some(ListKind::Numbered),
            "to_do" => Some(ListKind::ToDo),
            _ => None,
        }
    }

    fn open(self) -> &'static str {
        match self {
            ListKind::Bulleted => "<ul>",
            ListKind::Numbered => "<ol>",
            ListKind::ToDo => "<ul class=\"to-do-list\">",
        }
    }

    fn close(self) -> &'static str {
        match self {
            ListKind::Numbered => "</ol>",
            _ => "</ul>",
        }
    }
}

impl BlockRenderer {
    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Render already-normalized blocks. Consecutive list items are grouped
    /// into a single list element.
    pub async fn render(&self, blocks: &[Block]) -> Result<String, RenderError> {
        let mut html = String::new();
        let mut open_list: Option<ListKind> = None;

        for block in blocks {
            let list = ListKind::of(&block.kind);
            if open_list != list {
                if let Some(previous) = open_list {
                    html.push_str(previous.close());
                }
                if let Some(next) = list {
                    html.push_str(next.open());
                }
                open_list = list;
            }

            html.push_str(&self.render_block(block).await?);
        }

        if let Some(previous) = open_list {
            html.push_str(previous.close());
        }
        Ok(html)
    }

    async fn render_block(&self, block: &Block) -> Result<String, RenderError> {
        let text = || to_html(block.rich_text());
        let html = match block.kind.as_str() {
            "paragraph" => format!("<p>{}</p>", text()),
            "heading_1" => format!("<h1>{}</h1>", text()),
            "heading_2" => format!("<h2>{}</h2>", text()),
            "heading_3" => format!("<h3>{}</h3>", text()),
            "bulleted_list_item" | "numbered_list_item" => format!("<li>{}</li>", text()),
            "to_do" => {
                let checked = payload_bool(block, "checked");
                format!(
                    "<li class=\"to-do\"><input type=\"checkbox\" disabled{} /> {}</li>",
                    if checked { " checked" } else { "" },
                    text()
                )
            }
            "toggle" => format!("<details><summary>{}</summary></details>", text()),
            "quote" => format!("<blockquote>{}</blockquote>", text()),
            "callout" => {
                let icon = block
                    .payload()
                    .and_then(|p| p.get("icon"))
                    .and_then(|icon| icon.get("emoji"))
                    .and_then(Value::as_str)
                    .map(|emoji| format!("<span class=\"callout-icon\">{}</span>", escape_html(emoji)))
                    .unwrap_or_default();
                format!("<div class=\"callout\">{icon}<div>{}</div></div>", text())
            }
            "code" => {
                let language = block.code_language().unwrap_or(PLAINTEXT);
                let caption = caption_text(block);
                highlight_code(
                    language,
                    caption.as_deref(),
                    &plain_text(block.rich_text()),
                )?
            }
            "divider" => "<hr />".to_string(),
            "equation" => {
                let expression = block
                    .payload()
                    .and_then(|p| p.get("expression"))
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                format!("<div class=\"equation\">{}</div>", escape_html(expression))
            }
            "image" => match media_url(block) {
                Some(url) => {
                    let caption = caption_text(block);
                    let alt = escape_html(caption.as_deref().unwrap_or_default());
                    let figcaption = caption
                        .as_deref()
                        .filter(|c| !c.is_empty())
                        .map(|c| format!("<figcaption>{}</figcaption>", escape_html(c)))
                        .unwrap_or_default();
                    format!(
                        "<figure class=\"image\"><img src=\"{}\" alt=\"{alt}\" loading=\"lazy\" />{figcaption}</figure>",
                        escape_html(url)
                    )
                }
                None => String::new(),
            },
            "bookmark" | "embed" | "link_preview" => match payload_str(block, "url") {
                Some(url) => self.render_link(url, caption_text(block)).await?,
                None => String::new(),
            },
            "child_page" => {
                let title = payload_str(block, "title").unwrap_or_default();
                format!("<p class=\"child-page\">{}</p>", escape_html(title))
            }
            _ => String::new(),
        };
        Ok(html)
    }

    async fn render_link(&self, url: &str, caption: Option<String>) -> Result<String, RenderError> {
        let preview = match &self.previewer {
            Some(previewer) => previewer.preview(url).await?,
            None => None,
        };

        Ok(match preview {
            Some(preview) => bookmark_card(&preview),
            None => plain_link(url, caption.as_deref()),
        })
    }
}

fn bookmark_card(preview: &LinkPreview) -> String {
    let url = escape_html(&preview.url);
    let title = escape_html(preview.title.as_deref().unwrap_or(&preview.url));
    let description = preview
        .description
        .as_deref()
        .map(|d| format!("<span class=\"bookmark-description\">{}</span>", escape_html(d)))
        .unwrap_or_default();
    let image = preview
        .image
        .as_deref()
        .map(|src| {
            format!(
                "<img class=\"bookmark-image\" src=\"{}\" alt=\"\" loading=\"lazy\" />",
                escape_html(src)
            )
        })
        .unwrap_or_default();

    format!(
        "<a class=\"bookmark\" href=\"{url}\" rel=\"noopener\"><span class=\"bookmark-title\">{title}</span>{description}<span class=\"bookmark-url\">{url}</span>{image}</a>"
    )
}

fn plain_link(url: &str, caption: Option<&str>) -> String {
    let href = escape_html(url);
    let label = caption
        .filter(|c| !c.is_empty())
        .map(escape_html)
        .unwrap_or_else(|| href.clone());
    format!("<p class=\"bookmark bookmark-plain\"><a href=\"{href}\" rel=\"noopener\">{label}</a></p>")
}

fn payload_str<'a>(block: &'a Block, key: &str) -> Option<&'a str> {
    block
        .payload()?
        .get(key)?
        .as_str()
        .filter(|value| !value.is_empty())
}

fn payload_bool(block: &Block, key: &str) -> bool {
    block
        .payload()
        .and_then(|p| p.get(key))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn caption_text(block: &Block) -> Option<String> {
    let runs = block.payload()?.get("caption")?.as_array()?;
    let text = plain_text(runs);
    (!text.is_empty()).then_some(text)
}

/// URL of an `external` or `file` media payload.
pub(crate) fn media_url(block: &Block) -> Option<&str> {
    let payload = block.payload()?;
    let kind = payload.get("type")?.as_str()?;
    payload.get(kind)?.get("url")?.as_str()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::application::render::types::EmbedError;

    fn paragraph(id: &str, text: &str) -> Block {
        Block::new(id, "paragraph", json!({ "rich_text": [{ "plain_text": text }] }))
    }

    fn item(id: &str, kind: &str, text: &str) -> Block {
        Block::new(id, kind, json!({ "rich_text": [{ "plain_text": text }] }))
    }

    struct FixedPreviewer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LinkPreviewer for FixedPreviewer {
        async fn preview(&self, url: &str) -> Result<Option<LinkPreview>, EmbedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(LinkPreview {
                url: url.to_string(),
                title: Some("Example Domain".into()),
                description: None,
                image: None,
            }))
        }
    }

    #[tokio::test]
    async fn groups_consecutive_list_items() {
        let renderer = build_renderer(RendererConfig::default(), None);
        let blocks = vec![
            item("1", "bulleted_list_item", "a"),
            item("2", "bulleted_list_item", "b"),
            item("3", "numbered_list_item", "c"),
            paragraph("4", "end"),
        ];

        let html = renderer.render(&blocks).await.expect("renders");
        assert_eq!(
            html,
            "<ul><li>a</li><li>b</li></ul><ol><li>c</li></ol><p>end</p>"
        );
    }

    #[tokio::test]
    async fn missing_previewer_means_degraded() {
        let renderer = build_renderer(RendererConfig::default(), None);
        assert_eq!(renderer.mode(), RenderMode::Degraded);
    }

    #[tokio::test]
    async fn enriched_bookmark_uses_preview() {
        let previewer = Arc::new(FixedPreviewer {
            calls: AtomicUsize::new(0),
        });
        let renderer = build_renderer(RendererConfig::default(), Some(previewer.clone()));
        let blocks = vec![Block::new(
            "bm",
            "bookmark",
            json!({ "url": "https://example.com", "caption": [] }),
        )];

        let html = renderer.render(&blocks).await.expect("renders");
        assert_eq!(renderer.mode(), RenderMode::Enriched);
        assert!(html.contains("bookmark-title\">Example Domain"));
        assert_eq!(previewer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disabled_enrichment_never_calls_previewer() {
        let previewer = Arc::new(FixedPreviewer {
            calls: AtomicUsize::new(0),
        });
        let config = RendererConfig {
            enable_embed_enrichment: false,
        };
        let renderer = build_renderer(config, Some(previewer.clone()));
        let blocks = vec![Block::new("bm", "bookmark", json!({ "url": "https://example.com" }))];

        let html = renderer.render(&blocks).await.expect("renders");
        assert!(html.contains("bookmark-plain"));
        assert_eq!(previewer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn image_uses_external_url_and_caption() {
        let renderer = build_renderer(RendererConfig::default(), None);
        let blocks = vec![Block::new(
            "img",
            "image",
            json!({
                "type": "external",
                "external": { "url": "https://cdn.example.com/a.png" },
                "caption": [{ "plain_text": "A chart" }]
            }),
        )];

        let html = renderer.render(&blocks).await.expect("renders");
        assert!(html.contains("src=\"https://cdn.example.com/a.png\""));
        assert!(html.contains("alt=\"A chart\""));
    }

    #[tokio::test]
    async fn unknown_kinds_render_nothing() {
        let renderer = build_renderer(RendererConfig::default(), None);
        let blocks = vec![Block::new("x", "table_of_contents", json!({}))];
        assert_eq!(renderer.render(&blocks).await.expect("renders"), "");
    }
}
