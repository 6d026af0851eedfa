// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible capability provider for chatgate.
//!
//! Implements [`CapabilityProvider`] against any server exposing
//! `/chat/completions` (OpenAI, vLLM, Ollama, llama.cpp, LiteLLM), with both
//! single-shot completion and SSE streaming. One instance serves one tier.

pub mod client;
pub mod sse;
pub mod types;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chatgate_config::model::BackendConfig;
use chatgate_core::{
    AdapterType, CapabilityProvider, ChatgateError, Fragment, FragmentStream, Generation,
    GenerationRequest, HealthStatus, PluginAdapter, TokenUsage,
};
use futures::future;
use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::sse::StreamEvent;
use crate::types::{ApiMessage, ApiUsage, ChatCompletionRequest, StreamOptions};

/// A capability provider backed by one OpenAI-compatible endpoint.
pub struct OpenAiProvider {
    name: String,
    client: OpenAiClient,
    model: String,
    max_tokens: Option<u32>,
    system_prompt: Option<String>,
}

impl OpenAiProvider {
    /// Creates a provider named `name` (reported as `provider` in verbose responses).
    pub fn new(name: impl Into<String>, config: &BackendConfig) -> Result<Self, ChatgateError> {
        let client = OpenAiClient::new(config)?;
        let name = name.into();
        info!(
            provider = name.as_str(),
            model = config.model.as_str(),
            endpoint = client.endpoint(),
            "OpenAI-compatible provider initialized"
        );
        Ok(Self::with_client(name, client, config))
    }

    /// Creates a provider around an existing client.
    pub fn with_client(name: impl Into<String>, client: OpenAiClient, config: &BackendConfig) -> Self {
        Self {
            name: name.into(),
            client,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            system_prompt: config.system_prompt.clone(),
        }
    }

    /// Converts a [`GenerationRequest`] into a chat completions body.
    ///
    /// Prior turns become prior messages. Requested capabilities and the
    /// workflow hint are described in the system message and repeated in
    /// `metadata` for servers that route on it.
    fn to_api_request(&self, request: &GenerationRequest) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(request.conversation.messages.len() + 2);
        if let Some(system) = self.system_message(request) {
            messages.push(ApiMessage::new("system", system));
        }
        messages.extend(
            request
                .conversation
                .messages
                .iter()
                .map(|m| ApiMessage::new(m.role.to_string(), m.content.clone())),
        );
        messages.push(ApiMessage::new("user", request.message.clone()));

        let mut metadata = BTreeMap::new();
        metadata.insert(
            "conversation_id".to_string(),
            request.conversation.id.to_string(),
        );
        if !request.capabilities.is_empty() {
            metadata.insert("capabilities".to_string(), joined(request));
        }
        if let Some(workflow) = &request.workflow {
            metadata.insert("workflow".to_string(), workflow.clone());
        }

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            stream: false,
            stream_options: None,
            metadata,
        }
    }

    fn system_message(&self, request: &GenerationRequest) -> Option<String> {
        let mut parts: Vec<String> = self.system_prompt.iter().cloned().collect();
        if !request.capabilities.is_empty() {
            parts.push(format!("Capabilities requested: {}.", joined(request)));
        }
        if let Some(workflow) = &request.workflow {
            parts.push(format!("Workflow: {workflow}."));
        }
        (!parts.is_empty()).then(|| parts.join("\n\n"))
    }
}

fn joined(request: &GenerationRequest) -> String {
    request
        .capabilities
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn to_usage(usage: ApiUsage) -> TokenUsage {
    TokenUsage {
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
    }
}

/// Fragments carried by one stream event.
fn fragments(event: Result<StreamEvent, ChatgateError>) -> Vec<Result<Fragment, ChatgateError>> {
    match event {
        Ok(StreamEvent::Chunk(chunk)) => {
            let text = chunk
                .choices
                .into_iter()
                .filter_map(|c| c.delta.content)
                .filter(|t| !t.is_empty())
                .map(|t| Ok(Fragment::Text(t)));
            let usage = chunk.usage.map(|u| Ok(Fragment::Usage(to_usage(u))));
            text.chain(usage).collect()
        }
        Ok(StreamEvent::Done) => Vec::new(),
        Err(e) => vec![Err(e)],
    }
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatgateError> {
        // Probing the endpoint would spend tokens; a constructed client is healthy.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ChatgateError> {
        debug!(provider = self.name.as_str(), "provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl CapabilityProvider for OpenAiProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerationRequest) -> Result<Generation, ChatgateError> {
        let api_request = self.to_api_request(&request);
        let response = self.client.complete(&api_request).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ChatgateError::provider("response contained no choices"))?;

        Ok(Generation {
            content: choice.message.content.unwrap_or_default(),
            model: response.model.unwrap_or_else(|| self.model.clone()),
            usage: response.usage.map(to_usage),
        })
    }

    async fn generate_stream(
        &self,
        request: GenerationRequest,
    ) -> Result<FragmentStream, ChatgateError> {
        let mut api_request = self.to_api_request(&request);
        api_request.stream_options = Some(StreamOptions {
            include_usage: true,
        });
        let events = self.client.stream(&api_request).await?;

        let text = events
            .take_while(|event| future::ready(!matches!(event, Ok(StreamEvent::Done))))
            .flat_map(|event| stream::iter(fragments(event)));

        Ok(Box::pin(text))
    }
}
