use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::application::ping::{PingClient, PingError};
use crate::infra::error::InfraError;

/// [`PingClient`] over a shared reqwest client; the timeout is applied per request.
#[derive(Clone)]
pub struct HttpPingClient {
    http: Client,
}

impl HttpPingClient {
    pub fn new() -> Result<Self, InfraError> {
        let http = Client::builder()
            .build()
            .map_err(|err| InfraError::http(err.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl PingClient for HttpPingClient {
    async fn get(&self, url: &Url, timeout: Duration) -> Result<u16, PingError> {
        let response = self
            .http
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| PingError::new(err.to_string()))?;
        Ok(response.status().as_u16())
    }
}
