//! The upstream invoker: sends a translated request to the OpenAI-compatible
//! endpoint and returns its raw completion. One attempt, no retries.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::translate::openai_types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::translate::response::{truncate, upstream_error};

#[async_trait]
pub trait UpstreamInvoker: Send + Sync {
    async fn complete(&self, req: &ChatCompletionRequest) -> Result<ChatCompletionResponse>;
}

/// Invoker backed by `reqwest`, posting to `{base_url}/chat/completions`.
pub struct HttpUpstream {
    client: reqwest::Client,
    config: ProxyConfig,
    url: String,
}

impl HttpUpstream {
    pub fn new(config: ProxyConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream.timeout_secs))
            .build()?;
        Self::with_client(config, client)
    }

    pub fn with_client(config: ProxyConfig, client: reqwest::Client) -> Result<Self> {
        let base_url = config.effective_base_url()?;
        let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            config,
            url,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl UpstreamInvoker for HttpUpstream {
    async fn complete(&self, req: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        // Read per request: a missing key fails the request, not the process.
        let api_key = self.config.resolve_api_key()?;

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(req)
            .send()
            .await
            .map_err(|e| ProxyError::upstream(format!("Request failed: {e}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ProxyError::upstream(format!("Failed to read response body: {e}")))?;

        if status >= 400 {
            return Err(upstream_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProxyError::upstream(format!(
                "Failed to parse upstream response: {e}. Body: {}",
                truncate(&body, 300)
            ))
        })
    }
}
