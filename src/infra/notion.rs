//! Notion REST adapter for the [`ContentSource`] port.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::application::source::{ContentSource, SourceError};
use crate::config::NotionSettings;
use crate::domain::blocks::BlockPage;
use crate::domain::content::{CollectionPage, PageObject};
use crate::infra::error::InfraError;

const NOTION_VERSION_HEADER: &str = "Notion-Version";

#[derive(Clone)]
pub struct NotionClient {
    http: Client,
    base_url: Url,
    token: String,
    version: String,
}

/// Error body returned by the Notion API.
#[derive(Debug, Default, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl NotionClient {
    pub fn new(settings: &NotionSettings) -> Result<Self, InfraError> {
        let token = settings
            .api_key
            .clone()
            .ok_or_else(|| InfraError::configuration("notion.api_key is required"))?;

        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| InfraError::http(err.to_string()))?;

        Ok(Self {
            http,
            base_url: settings.base_url.clone(),
            token,
            version: settings.version.clone(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, SourceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| SourceError::Transport(format!("`{}` cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header(NOTION_VERSION_HEADER, &self.version)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        id: &str,
        request: RequestBuilder,
    ) -> Result<T, SourceError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|err| SourceError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| SourceError::Transport(err.to_string()))?;

        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::not_found(id));
        }

        if !status.is_success() {
            let payload: ErrorPayload = serde_json::from_str(&body).unwrap_or_default();
            warn!(
                target = "quire::notion",
                status = status.as_u16(),
                code = payload.code.as_deref().unwrap_or(""),
                message = payload.message.as_deref().unwrap_or(&body),
                id,
                "Notion request failed"
            );
            return Err(SourceError::Upstream {
                status: status.as_u16(),
                code: payload.code,
                message: payload.message.unwrap_or(body),
            });
        }

        serde_json::from_str(&body).map_err(|err| SourceError::Decode(err.to_string()))
    }
}

#[async_trait]
impl ContentSource for NotionClient {
    async fn list_children(
        &self,
        root_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<BlockPage, SourceError> {
        let mut url = self.endpoint(&["blocks", root_id, "children"])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("page_size", &page_size.to_string());
            if let Some(cursor) = cursor {
                query.append_pair("start_cursor", cursor);
            }
        }
        debug!(
            target = "quire::notion",
            root_id,
            page_size,
            cursor = cursor.unwrap_or(""),
            "Listing children"
        );
        self.send(root_id, self.http.get(url)).await
    }

    async fn retrieve_page(&self, page_id: &str) -> Result<PageObject, SourceError> {
        let url = self.endpoint(&["pages", page_id])?;
        self.send(page_id, self.http.get(url)).await
    }

    async fn query_collection(
        &self,
        collection_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<CollectionPage, SourceError> {
        let url = self.endpoint(&["databases", collection_id, "query"])?;
        let mut body = Map::new();
        body.insert("page_size".into(), json!(page_size));
        if let Some(cursor) = cursor {
            body.insert("start_cursor".into(), json!(cursor));
        }
        self.send(collection_id, self.http.post(url).json(&Value::Object(body)))
            .await
    }
}
