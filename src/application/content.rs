//! Content-source operations behind the `/notion/*` surface: fetch, convert
//! and render single items or whole collection pages.

use std::{num::NonZeroUsize, sync::Arc};

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::application::fetcher::PaginatedFetcher;
use crate::application::normalize::normalize;
use crate::application::render::{
    RenderError, ResilientRenderer, blocks_to_markdown, markdown_to_html,
};
use crate::application::source::{ContentSource, SourceError};
use crate::domain::blocks::{Block, BlockPage};
use crate::domain::content::{ContentItem, PageObject};

pub const DEFAULT_COLLECTION_PAGE_SIZE: u32 = 10;
pub const MAX_COLLECTION_PAGE_SIZE: u32 = 20;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversion {
    pub markdown: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedItem {
    #[serde(flatten)]
    pub item: ContentItem,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedCollection {
    pub results: Vec<RenderedItem>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

pub struct ContentService {
    source: Arc<dyn ContentSource>,
    fetcher: PaginatedFetcher,
    renderer: ResilientRenderer,
    concurrency: NonZeroUsize,
}

impl ContentService {
    pub fn new(
        source: Arc<dyn ContentSource>,
        renderer: ResilientRenderer,
        concurrency: NonZeroUsize,
    ) -> Self {
        Self {
            fetcher: PaginatedFetcher::new(source.clone()),
            source,
            renderer,
            concurrency,
        }
    }

    /// Raw first page of children; no pagination walk.
    pub async fn first_page(&self, page_id: &str) -> Result<BlockPage, ContentError> {
        Ok(self.fetcher.first_page(page_id).await?)
    }

    pub async fn item(&self, page_id: &str) -> Result<ContentItem, ContentError> {
        let page = self.source.retrieve_page(page_id).await?;
        Ok(ContentItem::from(&page))
    }

    /// Full-tree fetch and render of one item.
    pub async fn render_item(&self, page_id: &str) -> Result<String, ContentError> {
        let blocks = self.fetcher.fetch_all(page_id).await?;
        Ok(self.renderer.render(blocks).await?)
    }

    pub async fn render_blocks(&self, blocks: Vec<Block>) -> Result<String, ContentError> {
        Ok(self.renderer.render(blocks).await?)
    }

    /// Markdown plus its plain HTML conversion for one item.
    pub async fn convert(&self, page_id: &str) -> Result<Conversion, ContentError> {
        let blocks = normalize(self.fetcher.fetch_all(page_id).await?);
        let markdown = blocks_to_markdown(&blocks);
        let html = markdown_to_html(&markdown)?;
        Ok(Conversion { markdown, html })
    }

    /// Metadata and rendered HTML for one collection page.
    ///
    /// Items are fetched and rendered with at most `concurrency` in flight and
    /// come back in listing order regardless of completion order. The first
    /// failing item fails the whole page.
    pub async fn render_collection(
        &self,
        collection_id: &str,
        page_size: Option<u32>,
        cursor: Option<&str>,
    ) -> Result<RenderedCollection, ContentError> {
        let page_size = page_size
            .unwrap_or(DEFAULT_COLLECTION_PAGE_SIZE)
            .clamp(1, MAX_COLLECTION_PAGE_SIZE);
        let listing = self
            .source
            .query_collection(collection_id, page_size, cursor)
            .await?;

        info!(
            target = "quire::content",
            collection_id,
            items = listing.results.len(),
            concurrency = self.concurrency.get(),
            "Rendering collection page"
        );

        let renders: Vec<_> = listing
            .results
            .iter()
            .map(|page| self.render_listed(page))
            .collect();
        let results: Vec<RenderedItem> = stream::iter(renders)
            .buffered(self.concurrency.get())
            .try_collect()
            .await?;

        Ok(RenderedCollection {
            results,
            has_more: listing.has_more,
            next_cursor: listing.next_cursor,
        })
    }

    async fn render_listed(&self, page: &PageObject) -> Result<RenderedItem, ContentError> {
        let item = ContentItem::from(page);
        let html = self.render_item(&page.id).await?;
        Ok(RenderedItem { item, html })
    }
}
