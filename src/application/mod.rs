//! Application services layer.

pub mod content;
pub mod error;
pub mod fetcher;
pub mod normalize;
pub mod page;
pub mod ping;
pub mod render;
pub mod repos;
pub mod site;
pub mod sitemap;
pub mod source;
