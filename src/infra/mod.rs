//! Infrastructure adapters and runtime bootstrap.

pub mod embed;
pub mod error;
pub mod http;
pub mod notion;
pub mod ping;
pub mod posts;
pub mod telemetry;
