// reqwest-backed transport
use crate::application::transport::{Transport, TransportFailure};
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_text(&self, url: &str) -> Result<String, TransportFailure> {
        let response = self
            .client
            .get(url)
            .header("Cache-Control", "no-cache")
            .send()
            .await
            .map_err(|e| TransportFailure::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TransportFailure::Status(response.status().as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| TransportFailure::Network(format!("failed to read body: {}", e)))
    }
}
