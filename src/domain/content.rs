//! Publishable content items derived from content-source page objects.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw page object as returned by the content source ("get item" and
/// "query collection" results).
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct PageObject {
    pub id: String,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub last_edited_time: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub cover: Option<Value>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A collection page: items plus cursor passthrough.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct CollectionPage {
    #[serde(default)]
    pub results: Vec<PageObject>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub title: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub cover_image: Option<String>,
}

impl From<&PageObject> for ContentItem {
    fn from(page: &PageObject) -> Self {
        let created_at = page.created_time.clone();
        let updated_at = page.last_edited_time.clone().or_else(|| created_at.clone());
        Self {
            id: page.id.clone(),
            title: extract_title(&page.properties),
            created_at,
            updated_at,
            cover_image: page.cover.as_ref().and_then(extract_cover),
        }
    }
}

/// First property of type `title` in upstream order wins; its runs are
/// concatenated in order.
pub fn extract_title(properties: &Map<String, Value>) -> Option<String> {
    let property = properties
        .values()
        .find(|value| value.get("type").and_then(Value::as_str) == Some("title"))?;

    let runs = property.get("title").and_then(Value::as_array)?;
    let title: String = runs.iter().filter_map(run_text).collect();

    (!title.is_empty()).then_some(title)
}

/// Cover reference: `external.url` or `file.url`, anything else yields none.
pub fn extract_cover(cover: &Value) -> Option<String> {
    let kind = cover.get("type").and_then(Value::as_str)?;
    match kind {
        "external" | "file" => cover
            .get(kind)
            .and_then(|inner| inner.get("url"))
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

fn run_text(run: &Value) -> Option<&str> {
    run.get("plain_text")
        .and_then(Value::as_str)
        .or_else(|| run.pointer("/text/content").and_then(Value::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(properties: Value, cover: Option<Value>) -> PageObject {
        PageObject {
            id: "page-1".into(),
            created_time: Some("2024-03-01T10:00:00.000Z".into()),
            last_edited_time: None,
            properties: properties.as_object().cloned().unwrap_or_default(),
            cover,
            url: None,
        }
    }

    #[test]
    fn first_title_property_follows_upstream_order() {
        let page: PageObject = serde_json::from_str(
            r#"{
                "id": "page-2",
                "properties": {
                    "Zeta": { "type": "title", "title": [{ "plain_text": "upstream first" }] },
                    "Alpha": { "type": "title", "title": [{ "plain_text": "alphabetical first" }] }
                }
            }"#,
        )
        .expect("page decodes");

        let item = ContentItem::from(&page);
        assert_eq!(item.title.as_deref(), Some("upstream first"));
    }

    #[test]
    fn multi_run_titles_are_concatenated() {
        let item = ContentItem::from(&page(
            json!({
                "Tags": { "type": "multi_select", "multi_select": [] },
                "Name": { "type": "title", "title": [
                    { "plain_text": "Hello, " },
                    { "plain_text": "world" }
                ]}
            }),
            None,
        ));
        assert_eq!(item.title.as_deref(), Some("Hello, world"));
    }

    #[test]
    fn empty_title_runs_yield_none() {
        let item = ContentItem::from(&page(
            json!({ "Name": { "type": "title", "title": [] } }),
            None,
        ));
        assert_eq!(item.title, None);
    }

    #[test]
    fn updated_at_falls_back_to_created_at() {
        let item = ContentItem::from(&page(json!({}), None));
        assert_eq!(item.updated_at.as_deref(), Some("2024-03-01T10:00:00.000Z"));
    }

    #[test]
    fn cover_accepts_external_and_file() {
        let external = json!({ "type": "external", "external": { "url": "https://img/a.png" } });
        let file = json!({ "type": "file", "file": { "url": "https://s3/b.png", "expiry_time": "x" } });
        let emoji = json!({ "type": "emoji", "emoji": "🎉" });

        assert_eq!(extract_cover(&external).as_deref(), Some("https://img/a.png"));
        assert_eq!(extract_cover(&file).as_deref(), Some("https://s3/b.png"));
        assert_eq!(extract_cover(&emoji), None);
    }
}
