use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{
    application::{
        content::ContentError, page::BlogPageError, repos::PostStoreError,
        sitemap::SitemapError, source::SourceError,
    },
    infra::error::InfraError,
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// JSON `{"error": ...}` response carrying an [`ErrorReport`] for the
/// response logger.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn bad_request(source: &'static str, public_message: &'static str) -> Self {
        Self::new(source, StatusCode::BAD_REQUEST, public_message, public_message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.public_message }));
        let mut response = (self.status, body).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<SourceError> for HttpError {
    fn from(error: SourceError) -> Self {
        match error {
            SourceError::NotFound { .. } => HttpError::from_error(
                "application::error::source_error",
                StatusCode::NOT_FOUND,
                "Not found",
                &error,
            ),
            _ => HttpError::from_error(
                "application::error::source_error",
                StatusCode::INTERNAL_SERVER_ERROR,
                "Content source request failed",
                &error,
            ),
        }
    }
}

impl From<ContentError> for HttpError {
    fn from(error: ContentError) -> Self {
        match error {
            ContentError::Source(err) => err.into(),
            ContentError::Render(err) => HttpError::from_error(
                "application::error::content_error",
                StatusCode::INTERNAL_SERVER_ERROR,
                "Rendering failed",
                &err,
            ),
        }
    }
}

impl From<PostStoreError> for HttpError {
    fn from(error: PostStoreError) -> Self {
        match error {
            PostStoreError::NotFound { .. } => HttpError::from_error(
                "application::error::post_store_error",
                StatusCode::NOT_FOUND,
                "Post not found",
                &error,
            ),
            _ => HttpError::from_error(
                "application::error::post_store_error",
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load post",
                &error,
            ),
        }
    }
}

impl From<BlogPageError> for HttpError {
    fn from(error: BlogPageError) -> Self {
        match error {
            BlogPageError::Store(err) => err.into(),
            BlogPageError::Build(err) => HttpError::from_error(
                "application::error::blog_page_error",
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to render page",
                &err,
            ),
        }
    }
}

impl From<SitemapError> for HttpError {
    fn from(error: SitemapError) -> Self {
        HttpError::from_error(
            "application::error::sitemap_error",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to generate sitemap",
            &error,
        )
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
