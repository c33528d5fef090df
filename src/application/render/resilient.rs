//! Render with embed enrichment, falling back once to a degraded pipeline when
//! enrichment hits a transient network failure.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};

use crate::application::normalize::normalize;
use crate::domain::blocks::Block;

use super::blocks::build_renderer;
use super::types::{LinkPreviewer, RenderError, RenderMode, RendererConfig};

#[derive(Clone)]
pub struct ResilientRenderer {
    config: RendererConfig,
    previewer: Option<Arc<dyn LinkPreviewer>>,
}

impl ResilientRenderer {
    pub fn new(config: RendererConfig, previewer: Option<Arc<dyn LinkPreviewer>>) -> Self {
        Self { config, previewer }
    }

    /// Mode the first attempt will run in.
    pub fn initial_mode(&self) -> RenderMode {
        if self.config.enable_embed_enrichment && self.previewer.is_some() {
            RenderMode::Enriched
        } else {
            RenderMode::Degraded
        }
    }

    pub async fn render(&self, blocks: Vec<Block>) -> Result<String, RenderError> {
        let blocks = normalize(blocks);

        let renderer = build_renderer(self.config, self.previewer.clone());
        let mode = renderer.mode();
        counter!("quire_render_attempt_total", "mode" => mode.as_str()).increment(1);

        match renderer.render(&blocks).await {
            Ok(html) => {
                debug!(
                    target = "quire::render",
                    mode = mode.as_str(),
                    blocks = blocks.len(),
                    "Rendered blocks"
                );
                Ok(html)
            }
            Err(err) if err.is_transient() && mode == RenderMode::Enriched => {
                warn!(
                    target = "quire::render",
                    error = %err,
                    "Embed enrichment failed transiently, retrying without embeds"
                );
                counter!("quire_render_degraded_total").increment(1);

                let degraded = build_renderer(
                    RendererConfig {
                        enable_embed_enrichment: false,
                    },
                    None,
                );
                counter!("quire_render_attempt_total", "mode" => degraded.mode().as_str())
                    .increment(1);
                degraded.render(&blocks).await
            }
            Err(err) => Err(err),
        }
    }
}
