// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for OpenAI-compatible chat completions endpoints.
//!
//! Provides [`OpenAiClient`] which handles request construction,
//! authentication, streaming SSE responses, and transient error retry.

use std::time::Duration;

use chatgate_config::model::BackendConfig;
use chatgate_core::ChatgateError;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::sse::{self, EventStream};
use crate::types::{ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse};

/// HTTP client for one backend endpoint.
///
/// Manages the bearer token, connection pooling, and retry logic for
/// transient errors (429, 500, 503).
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    endpoint: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl OpenAiClient {
    /// Creates a client for `{config.base_url}/chat/completions`.
    pub fn new(config: &BackendConfig) -> Result<Self, ChatgateError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| {
                ChatgateError::Config(format!("invalid API key header value: {e}"))
            })?;
            value.set_sensitive(true);
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| ChatgateError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            max_retries: config.max_retries,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Full URL requests are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Overrides the pause between retries.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sends a non-streaming request and returns the parsed response.
    pub async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ChatgateError> {
        let mut req = request.clone();
        req.stream = false;
        req.stream_options = None;

        let response = self.send(&req).await?;
        let body = response.text().await.map_err(|e| ChatgateError::Provider {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        serde_json::from_str(&body).map_err(|e| ChatgateError::Provider {
            message: format!("failed to parse API response: {e}"),
            source: Some(Box::new(e)),
        })
    }

    /// Sends a streaming request and returns a stream of SSE events.
    pub async fn stream(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<EventStream, ChatgateError> {
        let mut req = request.clone();
        req.stream = true;

        let response = self.send(&req).await?;
        Ok(sse::parse_sse_stream(response))
    }

    /// Posts `req`, retrying transient failures, and returns the first 2xx response.
    async fn send(
        &self,
        req: &ChatCompletionRequest,
    ) -> Result<reqwest::Response, ChatgateError> {
        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(&self.endpoint)
                .json(req)
                .send()
                .await
                .map_err(|e| ChatgateError::Provider {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, stream = req.stream, "backend response received");

            if status.is_success() {
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, attempt, "transient backend error, will retry");
                attempt += 1;
                tokio::time::sleep(self.retry_delay).await;
                continue;
            }

            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!("backend returned {status} ({})", api_err.error),
                Err(_) => format!("backend returned {status}: {body}"),
            };
            return Err(ChatgateError::provider(message));
        }
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}
