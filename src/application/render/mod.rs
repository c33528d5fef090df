//! Block rendering pipeline.
//!
//! Blocks are normalized once, then rendered by an immutable [`BlockRenderer`]
//! built per attempt. Network-backed enrichment (link previews) sits behind the
//! [`LinkPreviewer`] trait so the retry decision in [`ResilientRenderer`] is a
//! match on [`RenderError::TransientNetwork`].

mod blocks;
mod document;
mod highlight;
mod markdown;
mod resilient;
pub mod rich_text;
mod types;

pub use blocks::{BlockRenderer, build_renderer};
pub use document::markdown_to_html;
pub use markdown::blocks_to_markdown;
pub use resilient::ResilientRenderer;
pub use types::{
    EmbedError, LinkPreview, LinkPreviewer, RenderError, RenderMode, RendererConfig,
    TransientKind,
};
