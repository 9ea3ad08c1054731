// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The [`CompletionClient`] gateway implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;
use sotto_core::{
    ChatMessage, ChunkStream, CompletionGateway, HealthStatus, ServiceAdapter, SottoError,
};
use tracing::debug;

use crate::sse;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

/// HTTP client for the OpenAI-compatible completion gateway.
///
/// Builds the streaming completion request with the configured system
/// prompt prepended, and maps the gateway's pre-stream failure statuses to
/// typed errors so the relay can surface them before spending a slot.
#[derive(Clone)]
pub struct CompletionClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    system_prompt: String,
}

impl CompletionClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: &str,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SottoError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| SottoError::Config(format!("invalid upstream API key: {e}")))?;
        auth.set_sensitive(true);
        headers.insert("authorization", auth);
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| SottoError::UpstreamGateway {
                status: 0,
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            system_prompt: system_prompt.into(),
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[redacted]")
            .finish()
    }
}

#[async_trait]
impl ServiceAdapter for CompletionClient {
    fn name(&self) -> &str {
        "upstream"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, SottoError> {
        // No side-effect-free probe exists on the completion endpoint, and a
        // real completion costs money; report configured-and-reachable only.
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl CompletionGateway for CompletionClient {
    async fn stream_completion(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<ChunkStream, SottoError> {
        let mut transcript = Vec::with_capacity(messages.len() + 1);
        transcript.push(ChatMessage::system(self.system_prompt.clone()));
        transcript.extend(messages);

        let request = CompletionRequest {
            model: &self.model,
            messages: &transcript,
            stream: true,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| SottoError::UpstreamGateway {
                status: 0,
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, model = %self.model, "upstream completion response");

        match status.as_u16() {
            200..=299 => Ok(sse::parse_completion_stream(response)),
            429 => Err(SottoError::UpstreamRateLimited),
            402 => Err(SottoError::UpstreamBilling),
            code => Err(SottoError::UpstreamGateway {
                status: code,
                source: None,
            }),
        }
    }
}
