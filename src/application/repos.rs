//! Post-store port used for SEO artifacts.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::posts::{Post, PostListing};

#[derive(Debug, Error)]
pub enum PostStoreError {
    #[error("post `{id}` not found")]
    NotFound { id: String },
    #[error("post store responded {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("post store unreachable: {0}")]
    Transport(String),
    #[error("post store payload could not be decoded: {0}")]
    Decode(String),
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn list_posts(&self, offset: u64, limit: u32) -> Result<PostListing, PostStoreError>;

    async fn find_post(&self, id: &str) -> Result<Post, PostStoreError>;
}
