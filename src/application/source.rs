//! Content-source port: the "list children", "get item" and "query collection"
//! operations the pipeline consumes.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::blocks::BlockPage;
use crate::domain::content::{CollectionPage, PageObject};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("content `{id}` not found upstream")]
    NotFound { id: String },
    #[error("content source responded {status}: {message}")]
    Upstream {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("content source unreachable: {0}")]
    Transport(String),
    #[error("content source payload could not be decoded: {0}")]
    Decode(String),
    #[error("content source violated the pagination protocol: {0}")]
    Protocol(String),
}

impl SourceError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// One page of the children of `root_id`.
    async fn list_children(
        &self,
        root_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<BlockPage, SourceError>;

    /// Item properties (title, cover, timestamps).
    async fn retrieve_page(&self, page_id: &str) -> Result<PageObject, SourceError>;

    /// One page of a collection listing.
    async fn query_collection(
        &self,
        collection_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<CollectionPage, SourceError>;
}
