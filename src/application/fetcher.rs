//! Cursor-walking fetch of a complete block sequence.

use std::sync::Arc;

use tracing::debug;

use crate::application::source::{ContentSource, SourceError};
use crate::domain::blocks::{Block, BlockPage};

/// Page-size ceiling requested on every "list children" call.
pub const MAX_PAGE_SIZE: u32 = 1000;

#[derive(Clone)]
pub struct PaginatedFetcher {
    source: Arc<dyn ContentSource>,
}

impl PaginatedFetcher {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }

    /// Materialize every child block of `root_id` in upstream order.
    ///
    /// Any upstream error aborts the whole walk; partial sequences are never
    /// returned.
    pub async fn fetch_all(&self, root_id: &str) -> Result<Vec<Block>, SourceError> {
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .source
                .list_children(root_id, MAX_PAGE_SIZE, cursor.as_deref())
                .await?;
            pages += 1;

            let next = page.continuation().map(str::to_string);
            blocks.extend(page.results);

            match next {
                Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                    return Err(SourceError::Protocol(format!(
                        "cursor `{next}` repeated for root `{root_id}`"
                    )));
                }
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!(
            target = "quire::fetcher",
            root_id,
            pages,
            blocks = blocks.len(),
            "Fetched block tree"
        );
        Ok(blocks)
    }

    /// The raw first page of children, without walking the cursor.
    pub async fn first_page(&self, root_id: &str) -> Result<BlockPage, SourceError> {
        self.source.list_children(root_id, MAX_PAGE_SIZE, None).await
    }
}
