#![allow(dead_code)]

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use quire::application::content::ContentService;
use quire::application::page::BlogPageService;
use quire::application::ping::{PingClient, PingError, SearchEnginePinger};
use quire::application::render::{RendererConfig, ResilientRenderer};
use quire::application::repos::{PostStore, PostStoreError};
use quire::application::site::SiteProfile;
use quire::application::sitemap::SitemapService;
use quire::application::source::{ContentSource, SourceError};
use quire::domain::blocks::{Block, BlockPage};
use quire::domain::content::{CollectionPage, PageObject};
use quire::domain::posts::{Post, PostListing};
use quire::infra::http::{HttpState, build_router};
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;

pub fn paragraph(id: &str, text: &str) -> Block {
    Block::new(
        id,
        "paragraph",
        json!({ "rich_text": [{ "type": "text", "plain_text": text }] }),
    )
}

pub fn titled_page(id: &str, title: Option<&str>) -> PageObject {
    let mut properties = serde_json::Map::new();
    let runs = match title {
        Some(title) => json!([{ "plain_text": title }]),
        None => json!([]),
    };
    properties.insert("Name".into(), json!({ "type": "title", "title": runs }));
    PageObject {
        id: id.into(),
        created_time: Some("2024-01-01T00:00:00.000Z".into()),
        last_edited_time: Some("2024-01-02T00:00:00.000Z".into()),
        properties,
        ..Default::default()
    }
}

/// In-memory content source. Children are served one page per call.
#[derive(Default)]
pub struct MemorySource {
    pub children: HashMap<String, Vec<Block>>,
    pub pages: HashMap<String, PageObject>,
    pub collection: Vec<PageObject>,
    pub delays: HashMap<String, Duration>,
    pub calls: Mutex<Vec<String>>,
    pub collection_page_sizes: Mutex<Vec<u32>>,
}

impl MemorySource {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn list_children(
        &self,
        root_id: &str,
        _page_size: u32,
        _cursor: Option<&str>,
    ) -> Result<BlockPage, SourceError> {
        self.calls
            .lock()
            .expect("lock")
            .push(format!("children:{root_id}"));
        if let Some(delay) = self.delays.get(root_id) {
            tokio::time::sleep(*delay).await;
        }
        let blocks = self
            .children
            .get(root_id)
            .cloned()
            .ok_or_else(|| SourceError::not_found(root_id))?;
        Ok(BlockPage {
            results: blocks,
            has_more: false,
            next_cursor: None,
        })
    }

    async fn retrieve_page(&self, page_id: &str) -> Result<PageObject, SourceError> {
        self.calls
            .lock()
            .expect("lock")
            .push(format!("page:{page_id}"));
        self.pages
            .get(page_id)
            .cloned()
            .ok_or_else(|| SourceError::not_found(page_id))
    }

    async fn query_collection(
        &self,
        collection_id: &str,
        page_size: u32,
        _cursor: Option<&str>,
    ) -> Result<CollectionPage, SourceError> {
        self.calls
            .lock()
            .expect("lock")
            .push(format!("query:{collection_id}"));
        self.collection_page_sizes
            .lock()
            .expect("lock")
            .push(page_size);
        Ok(CollectionPage {
            results: self.collection.clone(),
            has_more: true,
            next_cursor: Some("cursor-2".into()),
        })
    }
}

/// In-memory post store; `fail` makes every call an upstream error.
#[derive(Default)]
pub struct MemoryPosts {
    pub posts: Vec<Post>,
    pub fail: bool,
}

#[async_trait]
impl PostStore for MemoryPosts {
    async fn list_posts(&self, offset: u64, limit: u32) -> Result<PostListing, PostStoreError> {
        if self.fail {
            return Err(PostStoreError::Upstream {
                status: 503,
                body: "maintenance".into(),
            });
        }
        let posts = self
            .posts
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(PostListing {
            posts,
            total: self.posts.len() as u64,
        })
    }

    async fn find_post(&self, id: &str) -> Result<Post, PostStoreError> {
        if self.fail {
            return Err(PostStoreError::Transport("connection refused".into()));
        }
        self.posts
            .iter()
            .find(|post| post.id == id)
            .cloned()
            .ok_or_else(|| PostStoreError::NotFound { id: id.into() })
    }
}

#[derive(Default)]
pub struct NullPingClient;

#[async_trait]
impl PingClient for NullPingClient {
    async fn get(&self, _url: &Url, _timeout: Duration) -> Result<u16, PingError> {
        Ok(200)
    }
}

pub fn site() -> SiteProfile {
    SiteProfile::new("https://example.com", "Example Blog", "Jamie Doe", "blog")
}

pub fn router(source: Arc<MemorySource>, posts: Arc<MemoryPosts>) -> Router {
    let renderer = ResilientRenderer::new(RendererConfig::default(), None);
    let concurrency = NonZeroUsize::new(2).expect("non-zero");
    let state = HttpState {
        content: Arc::new(ContentService::new(source, renderer, concurrency)),
        blog: Arc::new(BlogPageService::new(posts.clone(), site())),
        sitemap: Arc::new(SitemapService::new(posts, site())),
        pinger: Arc::new(SearchEnginePinger::new(
            Arc::new(NullPingClient),
            vec!["https://www.google.com/ping".into()],
            Duration::from_secs(4),
        )),
        site: site(),
    };
    build_router(state)
}

pub async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    router
        .clone()
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("router responds")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}

pub fn assert_status(response: &Response<Body>, expected: StatusCode) {
    assert_eq!(response.status(), expected, "unexpected status");
}
