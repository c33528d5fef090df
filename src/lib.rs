//! Content sync and crawler-facing rendering for a Notion-backed blog.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
