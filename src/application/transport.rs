// Multi-strategy fetch of the remote CSV snapshot
use crate::error::{AttemptFailure, Result, TelemetryError};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Cache-busting query parameter appended to every attempt
pub const CACHE_BUST_PARAM: &str = "_t";

/// Why a single GET failed
#[derive(Debug, Clone, PartialEq)]
pub enum TransportFailure {
    Status(u16),
    Network(String),
}

impl std::fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportFailure::Status(code) => write!(f, "status {}", code),
            TransportFailure::Network(msg) => write!(f, "{}", msg),
        }
    }
}

/// Plain HTTP GET returning the body as text
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_text(&self, url: &str) -> std::result::Result<String, TransportFailure>;
}

/// One way of reaching the source
#[derive(Debug, Clone, PartialEq)]
pub enum TransportStrategy {
    Direct,
    /// Indirection endpoint that takes the target URL-encoded after `endpoint`
    Proxy { name: String, endpoint: String },
}

impl TransportStrategy {
    pub fn name(&self) -> &str {
        match self {
            TransportStrategy::Direct => "direct",
            TransportStrategy::Proxy { name, .. } => name.as_str(),
        }
    }

    /// Request URL for a target that already carries its cache buster
    pub fn request_url(&self, target: &str) -> String {
        match self {
            TransportStrategy::Direct => target.to_string(),
            TransportStrategy::Proxy { endpoint, .. } => {
                format!("{}{}", endpoint, urlencoding::encode(target))
            }
        }
    }
}

/// Append `_t=<unix millis>` to defeat source and proxy caches
pub fn with_cache_buster(url: &str, millis: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", url, separator, CACHE_BUST_PARAM, millis)
}

/// HTML error pages are rejected unless they could plausibly be CSV
pub fn looks_like_error_page(body: &str) -> bool {
    (body.trim_start().starts_with('<') || body.contains("Error")) && !body.contains(',')
}

/// Tries each strategy in order and returns the first usable body.
/// Strategies never run concurrently.
#[derive(Clone)]
pub struct TransportResolver {
    transport: Arc<dyn Transport>,
    strategies: Vec<TransportStrategy>,
}

impl TransportResolver {
    pub fn new(transport: Arc<dyn Transport>, strategies: Vec<TransportStrategy>) -> Self {
        Self {
            transport,
            strategies,
        }
    }

    pub fn strategies(&self) -> &[TransportStrategy] {
        &self.strategies
    }

    pub async fn fetch(&self, url: &str) -> Result<String> {
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            let target = with_cache_buster(url, Utc::now().timestamp_millis());
            let request_url = strategy.request_url(&target);
            tracing::debug!(strategy = strategy.name(), url = %request_url, "fetching source");

            let reason = match self.transport.get_text(&request_url).await {
                Ok(body) if looks_like_error_page(&body) => "invalid content (html or error page)".to_string(),
                Ok(body) => {
                    tracing::info!(strategy = strategy.name(), bytes = body.len(), "source fetched");
                    return Ok(body);
                }
                Err(failure) => failure.to_string(),
            };

            tracing::warn!(strategy = strategy.name(), %reason, "transport strategy failed");
            attempts.push(AttemptFailure {
                strategy: strategy.name().to_string(),
                reason,
            });
        }

        Err(TelemetryError::AllTransportsFailed { attempts })
    }
}
