//! JSON routes over the content source: fetch, convert and render.

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;

use crate::application::{content::MAX_COLLECTION_PAGE_SIZE, error::HttpError};
use crate::domain::blocks::Block;

use super::HttpState;

pub(super) fn routes() -> Router<HttpState> {
    Router::new()
        .route("/notion/convert", post(convert))
        .route("/notion/page/{page_id}", get(page_item))
        .route("/notion/fetchPageBlocks", post(fetch_page_blocks))
        .route("/notion/blocksToHtml", post(blocks_to_html))
        .route("/notion/render/{page_id}", get(render_page))
        .route("/notion/render-db/{database_id}", get(render_database))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PageRequest {
    page_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BlocksRequest {
    blocks: Option<Vec<Block>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RenderDbQuery {
    page_size: Option<String>,
    start_cursor: Option<String>,
}

/// Rejects the request before any upstream call when `pageId` is absent.
fn required_page_id(
    source: &'static str,
    body: Result<Json<PageRequest>, JsonRejection>,
) -> Result<String, HttpError> {
    let Json(request) = body.map_err(|rejection| {
        HttpError::from_error(
            source,
            StatusCode::BAD_REQUEST,
            "Invalid JSON body",
            &rejection,
        )
    })?;
    request
        .page_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| HttpError::bad_request(source, "pageId is required"))
}

async fn convert(
    State(state): State<HttpState>,
    body: Result<Json<PageRequest>, JsonRejection>,
) -> Result<Response, HttpError> {
    let page_id = required_page_id("infra::http::content::convert", body)?;
    let conversion = state.content.convert(&page_id).await?;
    Ok(Json(conversion).into_response())
}

async fn page_item(
    State(state): State<HttpState>,
    Path(page_id): Path<String>,
) -> Result<Response, HttpError> {
    let item = state.content.item(&page_id).await?;
    Ok(Json(item).into_response())
}

async fn fetch_page_blocks(
    State(state): State<HttpState>,
    body: Result<Json<PageRequest>, JsonRejection>,
) -> Result<Response, HttpError> {
    let page_id = required_page_id("infra::http::content::fetch_page_blocks", body)?;
    let page = state.content.first_page(&page_id).await?;
    Ok(Json(page).into_response())
}

async fn blocks_to_html(
    State(state): State<HttpState>,
    body: Result<Json<BlocksRequest>, JsonRejection>,
) -> Result<Response, HttpError> {
    const SOURCE: &str = "infra::http::content::blocks_to_html";

    let Json(request) = body.map_err(|rejection| {
        HttpError::from_error(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Invalid JSON body",
            &rejection,
        )
    })?;
    let blocks = request
        .blocks
        .filter(|blocks| !blocks.is_empty())
        .ok_or_else(|| HttpError::bad_request(SOURCE, "blocks must be a non-empty array"))?;

    let html = state.content.render_blocks(blocks).await?;
    Ok(Json(json!({ "html": html })).into_response())
}

async fn render_page(
    State(state): State<HttpState>,
    Path(page_id): Path<String>,
) -> Result<Response, HttpError> {
    let html = state.content.render_item(&page_id).await?;
    Ok(Json(json!({ "pageId": page_id, "html": html })).into_response())
}

async fn render_database(
    State(state): State<HttpState>,
    Path(database_id): Path<String>,
    Query(query): Query<RenderDbQuery>,
) -> Result<Response, HttpError> {
    // Unparseable sizes fall back to the default rather than failing.
    let page_size = query
        .page_size
        .as_deref()
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .map(|size| size.clamp(1, i64::from(MAX_COLLECTION_PAGE_SIZE)) as u32);
    let cursor = query
        .start_cursor
        .as_deref()
        .map(str::trim)
        .filter(|cursor| !cursor.is_empty());

    let collection = state
        .content
        .render_collection(&database_id, page_size, cursor)
        .await?;
    Ok(Json(collection).into_response())
}
