//! Server-rendered article documents for crawlers and bots.

use std::sync::Arc;

use askama::Template;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::debug;

use crate::application::render::{RenderError, markdown_to_html};
use crate::application::repos::{PostStore, PostStoreError};
use crate::application::site::SiteProfile;
use crate::domain::posts::Post;

pub const UNTITLED: &str = "Untitled";
pub const DESCRIPTION_LIMIT: usize = 160;

const MARKDOWN_PUNCTUATION: [char; 12] =
    ['#', '*', '_', '`', '>', '~', '[', ']', '(', ')', '!', '|'];

#[derive(Debug, Error)]
pub enum PageBuildError {
    #[error("failed to convert post body: {0}")]
    Body(#[from] RenderError),
    #[error("failed to render article template: {0}")]
    Template(#[from] askama::Error),
}

#[derive(Debug, Error)]
pub enum BlogPageError {
    #[error(transparent)]
    Store(#[from] PostStoreError),
    #[error(transparent)]
    Build(#[from] PageBuildError),
}

#[derive(Template)]
#[template(path = "article.html")]
struct ArticleTemplate<'a> {
    title: &'a str,
    description: &'a str,
    canonical_url: &'a str,
    site_name: &'a str,
    author: &'a str,
    has_image: bool,
    image: &'a str,
    twitter_card: &'a str,
    published: &'a str,
    modified: &'a str,
    json_ld: &'a str,
    body_html: &'a str,
}

/// Plain-text summary: markdown punctuation removed, whitespace collapsed,
/// cut to [`DESCRIPTION_LIMIT`] characters.
pub fn plain_description(body: &str) -> String {
    let stripped: String = body
        .chars()
        .filter(|ch| !MARKDOWN_PUNCTUATION.contains(ch))
        .collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(DESCRIPTION_LIMIT).collect()
}

/// Assemble the complete HTML document for one post. Pure: no I/O.
pub fn build_page(
    post: &Post,
    canonical_url: &str,
    site: &SiteProfile,
) -> Result<String, PageBuildError> {
    let title = post
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(UNTITLED);
    let description = plain_description(post.body());
    let image = post.cover_image.as_deref().filter(|url| !url.trim().is_empty());
    let published = post.created_at.as_deref().unwrap_or_default();
    let modified = post.last_modified().unwrap_or_default();

    let json_ld = article_json_ld(
        title,
        &description,
        published,
        modified,
        image,
        canonical_url,
        &site.author,
    );
    let body_html = markdown_to_html(post.body())?;

    let template = ArticleTemplate {
        title,
        description: &description,
        canonical_url,
        site_name: &site.site_name,
        author: &site.author,
        has_image: image.is_some(),
        image: image.unwrap_or_default(),
        twitter_card: if image.is_some() {
            "summary_large_image"
        } else {
            "summary"
        },
        published,
        modified,
        json_ld: &json_ld,
        body_html: &body_html,
    };

    Ok(template.render()?)
}

fn article_json_ld(
    headline: &str,
    description: &str,
    published: &str,
    modified: &str,
    image: Option<&str>,
    canonical_url: &str,
    author: &str,
) -> String {
    let mut article = Map::new();
    article.insert("@context".into(), json!("https://schema.org"));
    article.insert("@type".into(), json!("Article"));
    article.insert("headline".into(), json!(headline));
    article.insert("description".into(), json!(description));
    if !published.is_empty() {
        article.insert("datePublished".into(), json!(published));
    }
    if !modified.is_empty() {
        article.insert("dateModified".into(), json!(modified));
    }
    if let Some(image) = image {
        article.insert("image".into(), json!(image));
    }
    article.insert(
        "mainEntityOfPage".into(),
        json!({ "@type": "WebPage", "@id": canonical_url }),
    );
    article.insert(
        "author".into(),
        json!({ "@type": "Person", "name": author }),
    );

    // Keep `</script>` inside string values from closing the element.
    Value::Object(article).to_string().replace("</", "<\\/")
}

/// Loads posts from the post store and turns them into SSR documents.
pub struct BlogPageService {
    posts: Arc<dyn PostStore>,
    site: SiteProfile,
}

impl BlogPageService {
    pub fn new(posts: Arc<dyn PostStore>, site: SiteProfile) -> Self {
        Self { posts, site }
    }

    pub async fn render(&self, id: &str) -> Result<String, BlogPageError> {
        let post = self.posts.find_post(id).await?;
        let canonical = self.site.item_url(&post.id);
        let html = build_page(&post, &canonical, &self.site)?;
        debug!(target = "quire::page", id, bytes = html.len(), "Built SSR page");
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> SiteProfile {
        SiteProfile::new("https://example.com", "Example Blog", "Jamie Doe", "blog")
    }

    fn post() -> Post {
        Post {
            id: "7".into(),
            title: Some("Hello <World>".into()),
            content: Some("# Heading\n\nSome **bold** text.".into()),
            created_at: Some("2024-05-01T08:00:00Z".into()),
            updated_at: Some("2024-05-02T09:30:00Z".into()),
            cover_image: Some("https://cdn.example.com/cover.png".into()),
        }
    }

    #[test]
    fn description_is_truncated_to_160_chars() {
        let body = "a".repeat(300);
        assert_eq!(plain_description(&body).chars().count(), 160);
    }

    #[test]
    fn description_strips_markdown_punctuation() {
        assert_eq!(
            plain_description("# Title\n\n> **quoted** [link](x)!"),
            "Title quoted linkx"
        );
    }

    #[test]
    fn page_carries_meta_and_structured_data() {
        let html = build_page(&post(), "https://example.com/blog/7", &site()).expect("builds");

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<link rel=\"canonical\" href=\"https://example.com/blog/7\" />"));
        assert!(html.contains("<meta property=\"og:title\""));
        assert!(!html.contains("Hello <World>"));
        assert!(html.contains("og:image"));
        assert!(html.contains("twitter:image"));
        assert!(html.contains("\"@type\":\"Article\""));
        assert!(html.contains("\"dateModified\":\"2024-05-02T09:30:00Z\""));
        assert!(html.contains("\"name\":\"Jamie Doe\""));
        assert!(html.contains("<h1>Heading</h1>"));
        assert!(html.contains("<strong>bold</strong>"));
    }

    #[test]
    fn missing_cover_omits_image_tags() {
        let mut post = post();
        post.cover_image = None;
        let html = build_page(&post, "https://example.com/blog/7", &site()).expect("builds");

        assert!(!html.contains("og:image"));
        assert!(!html.contains("twitter:image"));
        assert!(!html.contains("\"image\""));
    }

    #[test]
    fn missing_title_and_timestamps_use_placeholders() {
        let post = Post {
            id: "8".into(),
            ..Default::default()
        };
        let html = build_page(&post, "https://example.com/blog/8", &site()).expect("builds");

        assert!(html.contains("<meta property=\"og:title\" content=\"Untitled\" />"));
        assert!(html.contains("<meta property=\"article:published_time\" content=\"\" />"));
        assert!(html.contains("<meta property=\"article:modified_time\" content=\"\" />"));
        assert!(!html.contains("datePublished"));
        assert!(!html.contains("dateModified"));
    }

    #[test]
    fn json_ld_cannot_close_the_script_element() {
        let mut post = post();
        post.title = Some("</script><script>alert(1)".into());
        let html = build_page(&post, "https://example.com/blog/7", &site()).expect("builds");
        assert!(!html.contains("</script><script>alert(1)"));
    }
}
