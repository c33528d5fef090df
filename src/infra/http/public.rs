//! Crawler-facing routes: SSR articles, sitemap, robots and pings.

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header::CONTENT_TYPE},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use crate::application::error::HttpError;

use super::HttpState;

pub(super) fn routes() -> Router<HttpState> {
    Router::new()
        .route("/blog/{id}", get(blog_page))
        .route("/sitemap.xml", get(sitemap))
        .route("/robots.txt", get(robots_txt))
        .route("/seo/ping", post(seo_ping))
        .route("/health", get(health))
}

async fn blog_page(State(state): State<HttpState>, Path(id): Path<String>) -> Response {
    match state.blog.render(&id).await {
        Ok(html) => Html(html).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn sitemap(State(state): State<HttpState>) -> Response {
    match state.sitemap.sitemap_xml().await {
        Ok(body) => text_response(body, "application/xml; charset=utf-8"),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn robots_txt(State(state): State<HttpState>) -> Response {
    text_response(state.sitemap.robots_txt(), "text/plain; charset=utf-8")
}

async fn seo_ping(State(state): State<HttpState>) -> Response {
    let report = state.pinger.ping(&state.site.sitemap_url()).await;
    Json(report).into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

fn text_response(body: String, content_type: &str) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
