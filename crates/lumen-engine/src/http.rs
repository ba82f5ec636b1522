//! HTTP model provider over an OpenAI-compatible chat-completions endpoint.
//!
//! Sends the composed request with `stream: true` and decodes the SSE chunk
//! stream into plain text deltas. The whole call, connection through last
//! byte, runs under one wall-clock deadline.
//!
//! Retry policy: only the initial request is retried. Once the response is
//! established and deltas may have reached the client, a failure is
//! surfaced rather than silently restarting the completion mid-answer.

use std::time::Duration;

use async_trait::async_trait;
use lumen_core::text::truncate_str;
use lumen_settings::ModelSettings;
use lumen_stream::{parse_sse_data, sse_data_stream, SseParserOptions};
use rand::Rng as _;
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::provider::{ChatRequest, DeltaStream, ModelProvider, ProviderError};

/// Retry policy for establishing the initial request.
#[derive(Clone, Copy, Debug)]
pub struct RetryConfig {
    /// Extra attempts after the first failure.
    pub max_retries: u32,
    /// Base backoff (milliseconds), doubled each retry.
    pub base_delay_ms: u64,
    /// Backoff ceiling (milliseconds).
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 300,
            max_delay_ms: 5_000,
        }
    }
}

impl RetryConfig {
    /// Backoff before the given retry (1-based), with jitter.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay_ms
            .saturating_mul(1_u64 << attempt.saturating_sub(1).min(16))
            .min(self.max_delay_ms);
        let jitter = rand::rng().random_range(0..=exp / 4 + 1);
        Duration::from_millis(exp + jitter)
    }
}

/// Endpoint configuration for [`HttpProvider`].
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    /// Chat-completions URL.
    pub endpoint: String,
    /// Model identifier sent with each request.
    pub model: String,
    /// Wall-clock deadline for one completion (milliseconds).
    pub timeout_ms: u64,
    /// Initial-request retry policy.
    pub retry: RetryConfig,
}

impl From<&ModelSettings> for ProviderConfig {
    fn from(settings: &ModelSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            timeout_ms: settings.timeout_ms,
            retry: RetryConfig::default(),
        }
    }
}

/// [`ModelProvider`] backed by a reqwest client.
#[derive(Clone, Debug)]
pub struct HttpProvider {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl HttpProvider {
    /// Build a provider with its own connection pool.
    ///
    /// The client-level timeout covers the full exchange, so a stall while
    /// streaming surfaces as [`ProviderError::Timeout`] mid-stream.
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(ProviderError::from_reqwest)?;
        Ok(Self { client, config })
    }

    async fn send_once(&self, wire: &WireRequest<'_>) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(wire)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: truncate_str(&body, 200),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ModelProvider for HttpProvider {
    async fn stream_completion(&self, request: &ChatRequest) -> Result<DeltaStream, ProviderError> {
        let wire = WireRequest::build(&self.config.model, request);

        let mut attempt = 0;
        let response = loop {
            attempt += 1;
            match self.send_once(&wire).await {
                Ok(response) => break response,
                Err(e) if e.is_retryable() && attempt <= self.config.retry.max_retries => {
                    let delay = self.config.retry.delay(attempt);
                    warn!(attempt, error = %e, delay_ms = delay.as_millis() as u64,
                        "model request failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        };
        debug!(attempt, "model stream established");

        let bytes = Box::pin(response.bytes_stream());
        let deltas = sse_data_stream(bytes, SseParserOptions::default()).filter_map(|item| {
            match item {
                Ok(data) => parse_sse_data::<WireChunk>(&data, "chat completion")
                    .and_then(WireChunk::into_content)
                    .map(Ok),
                Err(e) => Some(Err(ProviderError::from_reqwest(e))),
            }
        });
        Ok(Box::pin(deltas))
    }
}

// ── Wire format ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

impl<'a> WireRequest<'a> {
    fn build(model: &'a str, request: &'a ChatRequest) -> Self {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(WireMessage {
            role: "system",
            content: &request.system_prompt,
        });
        messages.extend(request.messages.iter().map(|m| WireMessage {
            role: m.role.as_str(),
            content: &m.content,
        }));
        Self {
            model,
            messages,
            stream: true,
        }
    }
}

#[derive(Deserialize)]
struct WireChunk {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    #[serde(default)]
    delta: WireDelta,
}

#[derive(Deserialize, Default)]
struct WireDelta {
    #[serde(default)]
    content: Option<String>,
}

impl WireChunk {
    /// Text carried by this chunk, if any.
    fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .filter(|s| !s.is_empty())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::messages::ChatMessage;

    // ── wire encoding ────────────────────────────────────────────────────

    #[test]
    fn request_puts_system_prompt_first() {
        let request = ChatRequest {
            system_prompt: "you are a coach".into(),
            messages: vec![
                ChatMessage::user("hi"),
                ChatMessage::assistant("hello"),
                ChatMessage::user("help me plan"),
            ],
        };
        let wire = WireRequest::build("lumen-coach-1", &request);
        let json = serde_json::to_value(&wire).unwrap();

        assert_eq!(json["model"], "lumen-coach-1");
        assert_eq!(json["stream"], true);
        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "you are a coach");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[3]["content"], "help me plan");
    }

    // ── chunk decoding ───────────────────────────────────────────────────

    #[test]
    fn chunk_with_content() {
        let chunk: WireChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":"Hel"}}]}"#).unwrap();
        assert_eq!(chunk.into_content().as_deref(), Some("Hel"));
    }

    #[test]
    fn chunk_without_content_is_skipped() {
        let role_only: WireChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap();
        assert_eq!(role_only.into_content(), None);

        let empty: WireChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":""}}]}"#).unwrap();
        assert_eq!(empty.into_content(), None);

        let no_choices: WireChunk = serde_json::from_str(r"{}").unwrap();
        assert_eq!(no_choices.into_content(), None);
    }

    // ── backoff ──────────────────────────────────────────────────────────

    #[test]
    fn backoff_grows_and_caps() {
        let retry = RetryConfig {
            max_retries: 5,
            base_delay_ms: 100,
            max_delay_ms: 1_000,
        };
        for _ in 0..20 {
            let first = retry.delay(1).as_millis();
            let third = retry.delay(3).as_millis();
            assert!((100..=126).contains(&first));
            assert!((400..=501).contains(&third));
            // Past the cap, exponent no longer matters.
            assert!(retry.delay(10).as_millis() <= 1_251);
        }
    }
}
