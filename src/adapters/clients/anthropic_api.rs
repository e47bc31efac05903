//! Anthropic Messages API client.
//!
//! Sends one system + user exchange per call. Requests are throttled per
//! client with `governor` and rate-limit responses are retried by
//! [`RetryPolicy`].

use std::num::NonZeroU32;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::retry::RetryPolicy;
use crate::domain::errors::{DomainError, DomainResult, ModelCallError};
use crate::domain::models::{ClientConfig, ModelRequest};
use crate::domain::ports::ModelClient;

/// Configuration for the Anthropic API client.
#[derive(Debug, Clone)]
pub struct AnthropicApiConfig {
    /// API key (read from `api_key_env` if not set).
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset.
    pub api_key_env: String,
    /// API base URL.
    pub base_url: String,
    pub model: String,
    /// API version header.
    pub api_version: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub requests_per_second: f64,
}

impl Default for AnthropicApiConfig {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for AnthropicApiConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            api_key: None,
            api_key_env: config.api_key_env.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_version: config.api_version.clone(),
            timeout_secs: config.timeout_secs,
            max_tokens: config.max_tokens,
            requests_per_second: config.requests_per_second,
        }
    }
}

impl AnthropicApiConfig {
    /// Get API key from config or environment.
    pub fn get_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.is_empty())
    }

    /// Create config with explicit API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: [Message<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

/// Anthropic API model client.
pub struct AnthropicApiClient {
    config: AnthropicApiConfig,
    client: Client,
    limiter: DefaultDirectRateLimiter,
    retry: RetryPolicy,
}

impl AnthropicApiClient {
    pub fn new(config: AnthropicApiConfig, retry: RetryPolicy) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DomainError::Configuration(format!("Failed to create HTTP client: {e}")))?;

        let limiter = RateLimiter::direct(quota_for(config.requests_per_second)?);

        Ok(Self {
            config,
            client,
            limiter,
            retry,
        })
    }

    fn build_request<'a>(&'a self, request: &'a ModelRequest) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system: Some(request.instructions.as_str()).filter(|s| !s.is_empty()),
            messages: [Message {
                role: "user",
                content: &request.input,
            }],
            temperature: request.temperature,
        }
    }

    async fn send_once(&self, api_key: &str, request: &ModelRequest) -> Result<String, ModelCallError> {
        self.limiter.until_ready().await;

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url))
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", api_key)
            .header("anthropic-version", &self.config.api_version)
            .json(&self.build_request(request))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ModelCallError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelCallError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let result: MessagesResponse = response.json().await?;
        let text = result
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            return Err(ModelCallError::InvalidResponse(format!(
                "no text content (stop_reason: {})",
                result.stop_reason.as_deref().unwrap_or("unknown")
            )));
        }
        Ok(text)
    }
}

fn quota_for(requests_per_second: f64) -> DomainResult<Quota> {
    if !requests_per_second.is_finite() || requests_per_second <= 0.0 {
        return Err(DomainError::Configuration(format!(
            "requests_per_second must be positive, got {requests_per_second}"
        )));
    }
    let quota = Quota::with_period(Duration::from_secs_f64(1.0 / requests_per_second))
        .ok_or_else(|| DomainError::Configuration("request rate too high".to_string()))?;
    Ok(quota.allow_burst(NonZeroU32::MIN))
}

#[async_trait]
impl ModelClient for AnthropicApiClient {
    fn provider(&self) -> &'static str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: &ModelRequest) -> Result<String, ModelCallError> {
        let api_key = self
            .config
            .get_api_key()
            .ok_or_else(|| ModelCallError::MissingApiKey(self.config.api_key_env.clone()))?;

        let started = Instant::now();
        let text = self
            .retry
            .execute(|| self.send_once(&api_key, request))
            .await?;
        debug!(
            model = %self.config.model,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            chars = text.len(),
            "model call completed"
        );
        Ok(text)
    }
}
