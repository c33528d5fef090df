//! sitemap.xml and robots.txt generation from the post store.

use std::sync::Arc;

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::warn;

use crate::application::repos::{PostStore, PostStoreError};
use crate::application::site::SiteProfile;
use crate::domain::posts::Post;

const LISTING_PAGE_SIZE: u32 = 100;
const ITEM_CHANGEFREQ: &str = "weekly";
const ITEM_PRIORITY: &str = "0.7";
const ROOT_PRIORITY: &str = "0.5";

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("post `{id}` has an unparseable timestamp `{value}`")]
    Timestamp { id: String, value: String },
}

#[derive(Clone)]
pub struct SitemapService {
    posts: Arc<dyn PostStore>,
    site: SiteProfile,
}

impl SitemapService {
    pub fn new(posts: Arc<dyn PostStore>, site: SiteProfile) -> Self {
        Self { posts, site }
    }

    /// Generate sitemap.xml content.
    ///
    /// A failing post store yields an empty `<urlset>`; crawlers keep
    /// working off the previous sitemap instead of seeing an error.
    pub async fn sitemap_xml(&self) -> Result<String, SitemapError> {
        let posts = match self.collect_posts().await {
            Ok(posts) => posts,
            Err(err) => {
                warn!(
                    target = "quire::sitemap",
                    error = %err,
                    "Post listing failed; serving empty sitemap"
                );
                metrics::counter!("quire_sitemap_degraded_total").increment(1);
                return Ok(empty_urlset());
            }
        };

        build_sitemap(&posts, &self.site)
    }

    pub fn robots_txt(&self) -> String {
        format!(
            "User-agent: *\nAllow: /\nSitemap: {}\n",
            self.site.sitemap_url()
        )
    }

    async fn collect_posts(&self) -> Result<Vec<Post>, PostStoreError> {
        let mut posts = Vec::new();
        let mut offset = 0u64;
        loop {
            let listing = self.posts.list_posts(offset, LISTING_PAGE_SIZE).await?;
            if listing.posts.is_empty() {
                break;
            }
            offset += listing.posts.len() as u64;
            posts.extend(listing.posts);
            if offset >= listing.total {
                break;
            }
        }
        Ok(posts)
    }
}

/// Render the urlset for `posts`, root entry first.
///
/// Posts without any timestamp get no `<lastmod>`; a timestamp that is present
/// but unparseable is an error.
pub fn build_sitemap(posts: &[Post], site: &SiteProfile) -> Result<String, SitemapError> {
    let mut xml = String::from(URLSET_OPEN);
    xml.push_str(&sitemap_entry(site.root_url(), None, ROOT_PRIORITY));

    for post in posts {
        let lastmod = post
            .last_modified()
            .map(|value| {
                coerce_lastmod(value).ok_or_else(|| SitemapError::Timestamp {
                    id: post.id.clone(),
                    value: value.to_string(),
                })
            })
            .transpose()?;
        xml.push_str(&sitemap_entry(
            &site.item_url(&post.id),
            lastmod.as_deref(),
            ITEM_PRIORITY,
        ));
    }

    xml.push_str(URLSET_CLOSE);
    Ok(xml)
}

const URLSET_OPEN: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n";
const URLSET_CLOSE: &str = "</urlset>\n";

fn empty_urlset() -> String {
    format!("{URLSET_OPEN}{URLSET_CLOSE}")
}

fn sitemap_entry(loc: &str, lastmod: Option<&str>, priority: &str) -> String {
    let loc = escape_xml(loc);
    match lastmod {
        Some(lastmod) => format!(
            "  <url><loc>{loc}</loc><lastmod>{lastmod}</lastmod><changefreq>{ITEM_CHANGEFREQ}</changefreq><priority>{priority}</priority></url>\n"
        ),
        None => format!(
            "  <url><loc>{loc}</loc><changefreq>{ITEM_CHANGEFREQ}</changefreq><priority>{priority}</priority></url>\n"
        ),
    }
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates.
fn coerce_lastmod(value: &str) -> Option<String> {
    let value = value.trim();
    if let Ok(parsed) = OffsetDateTime::parse(value, &Rfc3339) {
        return parsed.format(&Rfc3339).ok();
    }
    let date = Date::parse(value, format_description!("[year]-[month]-[day]")).ok()?;
    date.midnight().assume_utc().format(&Rfc3339).ok()
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
