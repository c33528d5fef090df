//! Notify search engines that the sitemap changed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Error)]
#[error("{message}")]
pub struct PingError {
    pub message: String,
}

impl PingError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Minimal GET client; implementations return the response status.
#[async_trait]
pub trait PingClient: Send + Sync {
    async fn get(&self, url: &Url, timeout: Duration) -> Result<u16, PingError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PingReport {
    pub ok: bool,
}

pub struct SearchEnginePinger {
    client: Arc<dyn PingClient>,
    endpoints: Vec<String>,
    timeout: Duration,
}

impl SearchEnginePinger {
    pub fn new(client: Arc<dyn PingClient>, endpoints: Vec<String>, timeout: Duration) -> Self {
        Self {
            client,
            endpoints,
            timeout,
        }
    }

    /// Fire one ping per endpoint and wait for all of them. Individual
    /// failures are logged only; `ok` is false just when a request URL
    /// could not be built.
    pub async fn ping(&self, sitemap_url: &str) -> PingReport {
        let targets = match self.targets(sitemap_url) {
            Ok(targets) => targets,
            Err(err) => {
                warn!(
                    target = "quire::seo",
                    error = %err,
                    sitemap_url,
                    "Could not build ping requests"
                );
                return PingReport { ok: false };
            }
        };

        let pings = targets.iter().map(|url| async move {
            (url, self.client.get(url, self.timeout).await)
        });

        for (url, outcome) in join_all(pings).await {
            let engine = url.host_str().unwrap_or("unknown").to_string();
            match outcome {
                Ok(status) => {
                    info!(target = "quire::seo", %engine, status, "Search engine pinged");
                    metrics::counter!("quire_seo_ping_total", "engine" => engine, "outcome" => "ok")
                        .increment(1);
                }
                Err(err) => {
                    warn!(target = "quire::seo", %engine, error = %err, "Search engine ping failed");
                    metrics::counter!("quire_seo_ping_total", "engine" => engine, "outcome" => "error")
                        .increment(1);
                }
            }
        }

        PingReport { ok: true }
    }

    fn targets(&self, sitemap_url: &str) -> Result<Vec<Url>, url::ParseError> {
        Url::parse(sitemap_url)?;
        self.endpoints
            .iter()
            .map(|endpoint| Url::parse_with_params(endpoint, [("sitemap", sitemap_url)]))
            .collect()
    }
}
