//! HTTP adapter for the external post store.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::application::repos::{PostStore, PostStoreError};
use crate::config::PostStoreSettings;
use crate::domain::posts::{Post, PostListing};
use crate::infra::error::InfraError;

#[derive(Clone)]
pub struct HttpPostStore {
    http: Client,
    base_url: Url,
}

impl HttpPostStore {
    pub fn new(settings: &PostStoreSettings) -> Result<Self, InfraError> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| InfraError::http(err.to_string()))?;
        Ok(Self {
            http,
            base_url: settings.base_url.clone(),
        })
    }

    /// `segments` are percent-encoded individually, so ids cannot escape the path.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, PostStoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| PostStoreError::Transport(format!("`{}` cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn fetch<T: DeserializeOwned>(&self, url: Url, id: &str) -> Result<T, PostStoreError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| PostStoreError::Transport(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PostStoreError::NotFound { id: id.to_string() });
        }

        let body = response
            .text()
            .await
            .map_err(|err| PostStoreError::Transport(err.to_string()))?;
        if !status.is_success() {
            return Err(PostStoreError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|err| PostStoreError::Decode(err.to_string()))
    }
}

#[async_trait]
impl PostStore for HttpPostStore {
    async fn list_posts(&self, offset: u64, limit: u32) -> Result<PostListing, PostStoreError> {
        let mut url = self.endpoint(&["posts"])?;
        url.query_pairs_mut()
            .append_pair("offset", &offset.to_string())
            .append_pair("limit", &limit.to_string());
        self.fetch(url, "").await
    }

    async fn find_post(&self, id: &str) -> Result<Post, PostStoreError> {
        let url = self.endpoint(&["posts", id])?;
        self.fetch(url, id).await
    }
}
