mod content;
mod middleware;
mod public;

use std::sync::Arc;

use axum::{Router, middleware as axum_middleware};

use crate::application::{
    content::ContentService, page::BlogPageService, ping::SearchEnginePinger, site::SiteProfile,
    sitemap::SitemapService,
};

use middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub content: Arc<ContentService>,
    pub blog: Arc<BlogPageService>,
    pub sitemap: Arc<SitemapService>,
    pub pinger: Arc<SearchEnginePinger>,
    pub site: SiteProfile,
}

pub fn build_router(state: HttpState) -> Router {
    public::routes()
        .merge(content::routes())
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
