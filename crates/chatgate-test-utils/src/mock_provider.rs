// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock capability provider for deterministic testing.
//!
//! `MockProvider` implements `CapabilityProvider` with scripted outcomes,
//! enabling fast, CI-runnable tests without network calls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::stream;
use tokio::sync::Mutex;

use chatgate_core::{
    AdapterType, CapabilityProvider, ChatgateError, Fragment, FragmentStream, Generation,
    GenerationRequest, HealthStatus, PluginAdapter, TokenUsage,
};

/// Usage reported by every successful scripted call.
pub const MOCK_USAGE: TokenUsage = TokenUsage {
    input_tokens: 10,
    output_tokens: 20,
};

/// One scripted outcome, consumed per call.
#[derive(Debug, Clone)]
pub enum Script {
    /// Succeed with this text. Streams split it at spaces.
    Reply(String),
    /// Succeed; streams yield exactly these fragments.
    Fragments(Vec<String>),
    /// Streams yield these fragments, then fail. Non-streaming calls fail outright.
    FailAfter(Vec<String>, String),
    /// Fail immediately with a provider error.
    Fail(String),
    /// Never complete.
    Hang,
    /// Succeed with no text at all.
    Empty,
    /// Succeed with `echo: <message>`, tying the reply to the request.
    Echo,
}

impl Script {
    pub fn reply(text: impl Into<String>) -> Self {
        Script::Reply(text.into())
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Script::Fail(message.into())
    }
}

/// A provider that replays scripted outcomes in FIFO order.
///
/// When the script is exhausted every call answers `"mock response"`.
pub struct MockProvider {
    name: String,
    model: String,
    script: Mutex<VecDeque<Script>>,
    available: AtomicBool,
    calls: AtomicUsize,
    last_request: Mutex<Option<GenerationRequest>>,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            model: format!("{name}-model"),
            name,
            script: Mutex::new(VecDeque::new()),
            available: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a provider pre-loaded with outcomes.
    pub fn with_script(name: impl Into<String>, script: Vec<Script>) -> Self {
        let mut provider = Self::new(name);
        provider.script = Mutex::new(script.into());
        provider
    }

    /// Queue an outcome.
    pub async fn push(&self, outcome: Script) {
        self.script.lock().await.push_back(outcome);
    }

    /// Toggle the health check between healthy and unhealthy.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of generate or generate_stream calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent request received.
    pub async fn last_request(&self) -> Option<GenerationRequest> {
        self.last_request.lock().await.clone()
    }

    async fn next(&self, request: GenerationRequest) -> Script {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().await = Some(request);
        self.script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Script::reply("mock response"))
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
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
        if self.available.load(Ordering::SeqCst) {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy(format!("{} is switched off", self.name)))
        }
    }

    async fn shutdown(&self) -> Result<(), ChatgateError> {
        Ok(())
    }
}

#[async_trait]
impl CapabilityProvider for MockProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerationRequest) -> Result<Generation, ChatgateError> {
        let echo = format!("echo: {}", request.message);
        let content = match self.next(request).await {
            Script::Reply(text) => text,
            Script::Echo => echo,
            Script::Fragments(parts) => parts.concat(),
            Script::FailAfter(_, message) | Script::Fail(message) => {
                return Err(ChatgateError::provider(message));
            }
            Script::Hang => futures::future::pending().await,
            Script::Empty => String::new(),
        };
        Ok(Generation {
            content,
            model: self.model.clone(),
            usage: Some(MOCK_USAGE),
        })
    }

    async fn generate_stream(
        &self,
        request: GenerationRequest,
    ) -> Result<FragmentStream, ChatgateError> {
        let text = |parts: Vec<String>| parts.into_iter().map(|t| Ok(Fragment::Text(t)));
        let usage = std::iter::once(Ok(Fragment::Usage(MOCK_USAGE)));
        let echo = format!("echo: {}", request.message);

        let items: Vec<Result<Fragment, ChatgateError>> = match self.next(request).await {
            Script::Reply(reply) => text(reply.split_inclusive(' ').map(str::to_string).collect())
                .chain(usage)
                .collect(),
            Script::Fragments(parts) => text(parts).chain(usage).collect(),
            Script::Echo => text(vec![echo]).chain(usage).collect(),
            Script::FailAfter(parts, message) => text(parts)
                .chain(std::iter::once(Err(ChatgateError::provider(message))))
                .collect(),
            Script::Fail(message) => return Err(ChatgateError::provider(message)),
            Script::Hang => return Ok(Box::pin(stream::pending())),
            Script::Empty => usage.collect(),
        };
        Ok(Box::pin(stream::iter(items)))
    }
}
