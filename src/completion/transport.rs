use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::config::CompletionConfig;
use crate::error::{Result, TermkeepError};

/// Raw HTTP reply; status interpretation is left to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportReply {
    pub status: u16,
    pub body: String,
}

impl TransportReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One POST of a serialized completion request
///
/// Implementations report deadline expiry as [`TermkeepError::Timeout`] and
/// every other failure to reach the backend as [`TermkeepError::Transport`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, body: String) -> Result<TransportReply>;
}

/// reqwest-backed transport for OpenAI-compatible chat-completion APIs
pub struct HttpTransport {
    client: Client,
    url: String,
    api_key: String,
    referer: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: format!("{}/chat/completions", config.endpoint.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            referer: config.referer.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn classify(error: reqwest::Error) -> TermkeepError {
    if error.is_timeout() {
        TermkeepError::Timeout(error.to_string())
    } else {
        TermkeepError::Transport(error.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, body: String) -> Result<TransportReply> {
        debug!("Sending completion request to: {}", self.url);

        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);

        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }
        if let Some(referer) = &self.referer {
            request = request.header("HTTP-Referer", referer);
        }

        let response = request.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;

        Ok(TransportReply { status, body })
    }
}
