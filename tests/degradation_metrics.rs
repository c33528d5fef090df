mod support;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use quire::application::render::{
    EmbedError, LinkPreview, LinkPreviewer, RendererConfig, ResilientRenderer, TransientKind,
};
use quire::application::sitemap::SitemapService;
use quire::domain::blocks::Block;
use serde_json::json;

use support::{MemoryPosts, site};

struct ResetPreviewer;

#[async_trait]
impl LinkPreviewer for ResetPreviewer {
    async fn preview(&self, url: &str) -> Result<Option<LinkPreview>, EmbedError> {
        Err(EmbedError::Transient {
            url: url.to_string(),
            kind: TransientKind::ConnectionReset,
            message: "connection reset by peer".into(),
        })
    }
}

#[tokio::test]
async fn degradations_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let renderer = ResilientRenderer::new(RendererConfig::default(), Some(Arc::new(ResetPreviewer)));
    let html = renderer
        .render(vec![Block::new(
            "bm",
            "bookmark",
            json!({ "url": "https://flaky.example" }),
        )])
        .await
        .expect("degraded render succeeds");
    assert!(html.contains("https://flaky.example"));

    let failing = MemoryPosts {
        fail: true,
        ..Default::default()
    };
    let sitemap = SitemapService::new(Arc::new(failing), site());
    sitemap.sitemap_xml().await.expect("empty sitemap");

    let mut counters: HashMap<String, u64> = HashMap::new();
    for (key, _, _, value) in snapshotter.snapshot().into_vec() {
        if let DebugValue::Counter(count) = value {
            *counters.entry(key.key().name().to_string()).or_default() += count;
        }
    }

    assert_eq!(counters.get("quire_render_degraded_total"), Some(&1));
    assert_eq!(counters.get("quire_render_attempt_total"), Some(&2));
    assert_eq!(counters.get("quire_sitemap_degraded_total"), Some(&1));
}
