use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Construction-time switches for a block renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererConfig {
    pub enable_embed_enrichment: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            enable_embed_enrichment: true,
        }
    }
}

/// Which enrichment set a renderer runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Highlighting plus network-backed link previews.
    Enriched,
    /// Highlighting only; bookmarks and embeds render as plain links.
    Degraded,
}

impl RenderMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderMode::Enriched => "enriched",
            RenderMode::Degraded => "degraded",
        }
    }
}

/// Network failure classes that justify a degraded retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    Timeout,
    /// Refused connections and failed name resolution.
    Connect,
    ConnectionReset,
    Fetch,
}

impl fmt::Display for TransientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransientKind::Timeout => "timeout",
            TransientKind::Connect => "connect failed",
            TransientKind::ConnectionReset => "connection reset",
            TransientKind::Fetch => "fetch failed",
        };
        f.write_str(label)
    }
}

/// Metadata shown on a bookmark card.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LinkPreview {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Error)]
pub enum EmbedError {
    #[error("transient network failure fetching `{url}`: {kind}: {message}")]
    Transient {
        url: String,
        kind: TransientKind,
        message: String,
    },
    #[error("embed url `{url}` is malformed: {message}")]
    Malformed { url: String, message: String },
    #[error("link preview for `{url}` failed: {message}")]
    Failed { url: String, message: String },
}

/// Enrichment step that builds link previews by fetching third-party URLs.
#[async_trait]
pub trait LinkPreviewer: Send + Sync {
    /// `Ok(None)` means the target answered but offered nothing to show.
    async fn preview(&self, url: &str) -> Result<Option<LinkPreview>, EmbedError>;
}

#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("transient network failure during enrichment of `{url}`: {kind}: {message}")]
    TransientNetwork {
        url: String,
        kind: TransientKind,
        message: String,
    },
    #[error("embed enrichment failed: {0}")]
    Embed(EmbedError),
    #[error("syntax highlighting failed: {language}: {message}")]
    Highlighting { language: String, message: String },
    #[error("markdown rendering failed: {message}")]
    Markdown { message: String },
}

impl RenderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, RenderError::TransientNetwork { .. })
    }
}

impl From<EmbedError> for RenderError {
    fn from(err: EmbedError) -> Self {
        match err {
            EmbedError::Transient { url, kind, message } => {
                RenderError::TransientNetwork { url, kind, message }
            }
            other => RenderError::Embed(other),
        }
    }
}
