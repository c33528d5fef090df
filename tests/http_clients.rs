use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use quire::application::fetcher::PaginatedFetcher;
use quire::application::repos::{PostStore, PostStoreError};
use quire::application::source::{ContentSource, SourceError};
use quire::config::{NotionSettings, PostStoreSettings};
use quire::infra::notion::NotionClient;
use quire::infra::posts::HttpPostStore;
use serde_json::{Value, json};
use url::Url;

async fn spawn(router: Router) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server");
    });
    Url::parse(&format!("http://{addr}/")).expect("base url")
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer secret")
        && headers.get("notion-version").and_then(|v| v.to_str().ok()) == Some("2022-06-28")
}

fn notion_error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "object": "error",
            "status": status.as_u16(),
            "code": code,
            "message": message
        })),
    )
        .into_response()
}

async fn children(
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return notion_error(StatusCode::UNAUTHORIZED, "unauthorized", "bad token");
    }
    if id == "missing" {
        return notion_error(StatusCode::NOT_FOUND, "object_not_found", "no such block");
    }
    let body = match query.get("start_cursor").map(String::as_str) {
        None => json!({
            "object": "list",
            "results": [{ "id": "b1", "type": "paragraph", "paragraph": { "rich_text": [] } }],
            "has_more": true,
            "next_cursor": "c2"
        }),
        Some("c2") => json!({
            "object": "list",
            "results": [{ "id": "b2", "type": "divider", "divider": {} }],
            "has_more": false,
            "next_cursor": null
        }),
        Some(_) => return notion_error(StatusCode::BAD_REQUEST, "validation_error", "bad cursor"),
    };
    Json(body).into_response()
}

async fn page(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !authorized(&headers) {
        return notion_error(StatusCode::UNAUTHORIZED, "unauthorized", "bad token");
    }
    match id.as_str() {
        "boom" => notion_error(StatusCode::BAD_GATEWAY, "service_unavailable", "try again"),
        "missing" => notion_error(StatusCode::NOT_FOUND, "object_not_found", "no such page"),
        _ => Json(json!({
            "object": "page",
            "id": id,
            "created_time": "2024-01-01T00:00:00.000Z",
            "properties": { "Name": { "type": "title", "title": [{ "plain_text": "Hello" }] } }
        }))
        .into_response(),
    }
}

async fn query_database(Path(id): Path<String>, Json(body): Json<Value>) -> Response {
    Json(json!({
        "object": "list",
        "results": [{ "id": format!("{id}-{}", body["page_size"]) }],
        "has_more": false,
        "next_cursor": body.get("start_cursor").cloned().unwrap_or(Value::Null)
    }))
    .into_response()
}

async fn notion_client() -> NotionClient {
    let router = Router::new()
        .route("/v1/blocks/{id}/children", get(children))
        .route("/v1/pages/{id}", get(page))
        .route("/v1/databases/{id}/query", post(query_database));
    let base = spawn(router).await.join("v1/").expect("join");

    NotionClient::new(&NotionSettings {
        api_key: Some("secret".into()),
        base_url: base,
        version: "2022-06-28".into(),
        timeout: Duration::from_secs(5),
    })
    .expect("client")
}

#[tokio::test]
async fn fetcher_walks_every_notion_page() {
    let client = Arc::new(notion_client().await);
    let fetcher = PaginatedFetcher::new(client);

    let blocks = fetcher.fetch_all("root").await.expect("fetch succeeds");
    let ids: Vec<_> = blocks.iter().map(|block| block.id.as_str()).collect();
    assert_eq!(ids, ["b1", "b2"]);
}

#[tokio::test]
async fn notion_errors_are_classified() {
    let client = notion_client().await;

    let err = client.retrieve_page("missing").await.expect_err("404");
    assert!(matches!(err, SourceError::NotFound { .. }));

    let err = client.retrieve_page("boom").await.expect_err("502");
    match err {
        SourceError::Upstream {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 502);
            assert_eq!(code.as_deref(), Some("service_unavailable"));
            assert_eq!(message, "try again");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let page = client.retrieve_page("p1").await.expect("page");
    assert_eq!(page.id, "p1");
}

#[tokio::test]
async fn collection_query_sends_size_and_cursor() {
    let client = notion_client().await;

    let page = client
        .query_collection("db", 7, Some("next"))
        .await
        .expect("query");
    assert_eq!(page.results[0].id, "db-7");
    assert_eq!(page.next_cursor.as_deref(), Some("next"));
}

async fn list_posts(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let offset: usize = query.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    let limit: usize = query.get("limit").and_then(|v| v.parse().ok()).unwrap_or(10);
    let posts: Vec<Value> = (0..3)
        .skip(offset)
        .take(limit)
        .map(|n| json!({ "id": n, "title": format!("Post {n}") }))
        .collect();
    Json(json!({ "posts": posts, "total": 3 }))
}

async fn find_post(Path(id): Path<String>) -> Response {
    if id == "1" {
        Json(json!({ "id": 1, "title": "Post 1", "content": "Body" })).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

#[tokio::test]
async fn post_store_lists_and_finds() {
    let router = Router::new()
        .route("/api/posts", get(list_posts))
        .route("/api/posts/{id}", get(find_post));
    let base = spawn(router).await.join("api/").expect("join");
    let store = HttpPostStore::new(&PostStoreSettings {
        base_url: base,
        timeout: Duration::from_secs(5),
    })
    .expect("store");

    let listing = store.list_posts(1, 10).await.expect("listing");
    assert_eq!(listing.total, 3);
    assert_eq!(listing.posts.len(), 2);
    assert_eq!(listing.posts[0].id, "1");

    let post = store.find_post("1").await.expect("post");
    assert_eq!(post.body(), "Body");

    let err = store.find_post("9").await.expect_err("missing");
    assert!(matches!(err, PostStoreError::NotFound { .. }));
}
