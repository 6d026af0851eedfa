// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tier dispatch with a single fallback to the direct tier.
//!
//! Each tier maps to exactly one capability provider. A failed `tool` or
//! `workflow` attempt (timeout, unavailable, malformed output) is retried once
//! on `direct`; a second failure surfaces as `BackendUnavailable`. The turn is
//! appended to the conversation exactly once, after the full response is
//! known, and never for a failed or abandoned turn.

use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_stream::try_stream;
use chatgate_config::model::DispatchConfig;
use chatgate_core::{
    CanonicalResponse, CapabilityProvider, ChatMessage, ChatgateError, ConversationStore,
    Fragment, FragmentStream, Generation, GenerationRequest, Tier, TokenUsage,
};
use chrono::Utc;
use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

/// Capability providers keyed by tier. `direct` is mandatory.
#[derive(Clone)]
pub struct TierBackends {
    direct: Arc<dyn CapabilityProvider>,
    tool: Option<Arc<dyn CapabilityProvider>>,
    workflow: Option<Arc<dyn CapabilityProvider>>,
}

impl TierBackends {
    pub fn new(direct: Arc<dyn CapabilityProvider>) -> Self {
        Self {
            direct,
            tool: None,
            workflow: None,
        }
    }

    pub fn with_tool(mut self, provider: Arc<dyn CapabilityProvider>) -> Self {
        self.tool = Some(provider);
        self
    }

    pub fn with_workflow(mut self, provider: Arc<dyn CapabilityProvider>) -> Self {
        self.workflow = Some(provider);
        self
    }

    /// The provider serving `tier`, if one is configured.
    pub fn get(&self, tier: Tier) -> Option<&Arc<dyn CapabilityProvider>> {
        match tier {
            Tier::Direct => Some(&self.direct),
            Tier::Tool => self.tool.as_ref(),
            Tier::Workflow => self.workflow.as_ref(),
        }
    }

    /// Every configured provider with its tier.
    pub fn iter(&self) -> impl Iterator<Item = (Tier, &Arc<dyn CapabilityProvider>)> {
        [Tier::Direct, Tier::Tool, Tier::Workflow]
            .into_iter()
            .filter_map(|tier| self.get(tier).map(|p| (tier, p)))
    }
}

/// One item of a dispatched stream.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    /// Raw text as produced by the backend.
    Fragment(String),
    /// Emitted last, after the turn has been persisted.
    Finished(CanonicalResponse),
}

/// Lazy sequence of dispatch events. Dropping it cancels the backend call.
pub type DispatchStream = Pin<Box<dyn Stream<Item = Result<DispatchEvent, ChatgateError>> + Send>>;

/// Routes a classified request to its tier's provider.
#[derive(Clone)]
pub struct BackendDispatcher {
    backends: Arc<TierBackends>,
    store: Arc<dyn ConversationStore>,
    timeout: Duration,
    fallback_to_direct: bool,
}

/// A stream that produced its first text fragment.
struct OpenedStream {
    tier: Tier,
    provider: Arc<dyn CapabilityProvider>,
    stream: FragmentStream,
    first: String,
    usage: Option<TokenUsage>,
}

impl BackendDispatcher {
    pub fn new(
        backends: TierBackends,
        store: Arc<dyn ConversationStore>,
        config: &DispatchConfig,
    ) -> Self {
        Self {
            backends: Arc::new(backends),
            store,
            timeout: Duration::from_secs(config.timeout_secs),
            fallback_to_direct: config.fallback_to_direct,
        }
    }

    /// Override the per-call bound.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn backends(&self) -> &TierBackends {
        &self.backends
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one turn to completion and persist it.
    pub async fn dispatch(
        &self,
        tier: Tier,
        request: GenerationRequest,
    ) -> Result<CanonicalResponse, ChatgateError> {
        let started = Instant::now();

        let (served_by, provider, generation) = match self.attempt(tier, &request).await {
            Ok((provider, generation)) => (tier, provider, generation),
            Err(primary) => {
                let Some(fallback) = self.fallback_for(tier) else {
                    return Err(surface(tier, primary));
                };
                warn!(
                    conversation_id = %request.conversation.id,
                    from = %tier,
                    error = %primary,
                    "backend failed, falling back to direct"
                );
                chatgate_prometheus::record_fallback(tier);
                match self.attempt(fallback, &request).await {
                    Ok((provider, generation)) => (fallback, provider, generation),
                    Err(secondary) => return Err(exhausted(tier, &primary, &secondary)),
                }
            }
        };

        let response = CanonicalResponse {
            content: generation.content,
            usage: generation.usage,
            backend_tier: served_by,
            requested_tier: tier,
            conversation_id: request.conversation.id.clone(),
            fallback: served_by != tier,
            provider: provider.name().to_string(),
            model: generation.model,
            latency_ms: started.elapsed().as_millis() as u64,
            created_at: Utc::now(),
        };
        self.persist(&request, &response).await?;
        Ok(response)
    }

    /// Run one turn as a stream of raw fragments.
    ///
    /// Fallback is only possible until the first fragment arrives: the
    /// stream is opened (and its first text awaited) before this returns.
    /// Failures after that point end the stream with an error and nothing is
    /// persisted.
    pub async fn dispatch_stream(
        &self,
        tier: Tier,
        request: GenerationRequest,
    ) -> Result<DispatchStream, ChatgateError> {
        let started = Instant::now();

        let opened = match self.open(tier, &request).await {
            Ok(opened) => opened,
            Err(primary) => {
                let Some(fallback) = self.fallback_for(tier) else {
                    return Err(surface(tier, primary));
                };
                warn!(
                    conversation_id = %request.conversation.id,
                    from = %tier,
                    error = %primary,
                    "stream failed to open, falling back to direct"
                );
                chatgate_prometheus::record_fallback(tier);
                self.open(fallback, &request)
                    .await
                    .map_err(|secondary| exhausted(tier, &primary, &secondary))?
            }
        };

        let this = self.clone();
        let stream = try_stream! {
            let OpenedStream { tier: served_by, provider, mut stream, first, mut usage } = opened;
            let mut content = first.clone();
            yield DispatchEvent::Fragment(first);

            loop {
                let next = tokio::time::timeout(this.timeout, stream.next())
                    .await
                    .map_err(|_| {
                        chatgate_prometheus::record_backend_error(served_by, "timeout");
                        ChatgateError::Timeout { duration: this.timeout }
                    })?;
                let Some(item) = next else { break };
                match item.map_err(|e| {
                    chatgate_prometheus::record_backend_error(served_by, e.kind());
                    surface(served_by, e)
                })? {
                    Fragment::Text(text) => {
                        if !text.is_empty() {
                            content.push_str(&text);
                            yield DispatchEvent::Fragment(text);
                        }
                    }
                    Fragment::Usage(u) => usage = Some(u),
                }
            }

            let response = CanonicalResponse {
                content,
                usage,
                backend_tier: served_by,
                requested_tier: tier,
                conversation_id: request.conversation.id.clone(),
                fallback: served_by != tier,
                provider: provider.name().to_string(),
                model: provider.model().to_string(),
                latency_ms: started.elapsed().as_millis() as u64,
                created_at: Utc::now(),
            };
            this.persist(&request, &response).await?;
            yield DispatchEvent::Finished(response);
        };

        Ok(Box::pin(stream) as DispatchStream)
    }

    fn fallback_for(&self, tier: Tier) -> Option<Tier> {
        match tier {
            Tier::Direct => None,
            Tier::Tool | Tier::Workflow => self.fallback_to_direct.then_some(Tier::Direct),
        }
    }

    fn provider(&self, tier: Tier) -> Result<Arc<dyn CapabilityProvider>, ChatgateError> {
        self.backends
            .get(tier)
            .cloned()
            .ok_or_else(|| ChatgateError::provider(format!("no backend configured for {tier} tier")))
    }

    /// One bounded, non-streaming generation on `tier`.
    async fn attempt(
        &self,
        tier: Tier,
        request: &GenerationRequest,
    ) -> Result<(Arc<dyn CapabilityProvider>, Generation), ChatgateError> {
        let result = async {
            let provider = self.provider(tier)?;
            let generation = tokio::time::timeout(self.timeout, async {
                ensure_available(provider.as_ref()).await?;
                provider.generate(request.clone()).await
            })
            .await
            .map_err(|_| ChatgateError::Timeout {
                duration: self.timeout,
            })??;
            if generation.content.trim().is_empty() {
                return Err(ChatgateError::provider(format!(
                    "{} returned an empty response",
                    provider.name()
                )));
            }
            Ok::<_, ChatgateError>((provider, generation))
        }
        .await;

        if let Err(e) = &result {
            chatgate_prometheus::record_backend_error(tier, e.kind());
        }
        result
    }

    /// Open a stream on `tier` and wait (bounded) for its first text.
    async fn open(
        &self,
        tier: Tier,
        request: &GenerationRequest,
    ) -> Result<OpenedStream, ChatgateError> {
        let result = async {
            let provider = self.provider(tier)?;
            let (stream, first, usage) = tokio::time::timeout(self.timeout, async {
                ensure_available(provider.as_ref()).await?;
                let mut stream = provider.generate_stream(request.clone()).await?;
                let mut usage = None;
                while let Some(item) = stream.next().await {
                    match item? {
                        Fragment::Text(text) if !text.is_empty() => {
                            return Ok((stream, text, usage));
                        }
                        Fragment::Text(_) => {}
                        Fragment::Usage(u) => usage = Some(u),
                    }
                }
                Err(ChatgateError::provider(format!(
                    "{} ended the stream without text",
                    provider.name()
                )))
            })
            .await
            .map_err(|_| ChatgateError::Timeout {
                duration: self.timeout,
            })??;
            debug!(tier = %tier, provider = provider.name(), "stream opened");
            Ok::<_, ChatgateError>(OpenedStream {
                tier,
                provider,
                stream,
                first,
                usage,
            })
        }
        .await;

        if let Err(e) = &result {
            chatgate_prometheus::record_backend_error(tier, e.kind());
        }
        result
    }

    /// Append the user and assistant messages of a finished turn, then record metrics.
    async fn persist(
        &self,
        request: &GenerationRequest,
        response: &CanonicalResponse,
    ) -> Result<(), ChatgateError> {
        self.store
            .append_turn(
                &response.conversation_id,
                ChatMessage::user(request.message.clone()),
                ChatMessage::assistant(response.content.clone()),
            )
            .await?;

        chatgate_prometheus::record_latency(
            response.backend_tier,
            response.latency_ms as f64 / 1000.0,
        );
        if let Some(usage) = response.usage {
            chatgate_prometheus::record_tokens(
                response.backend_tier,
                usage.input_tokens,
                usage.output_tokens,
            );
        }
        info!(
            conversation_id = %response.conversation_id,
            tier = %response.backend_tier,
            requested_tier = %response.requested_tier,
            fallback = response.fallback,
            provider = response.provider.as_str(),
            latency_ms = response.latency_ms,
            "turn completed"
        );
        Ok(())
    }
}

async fn ensure_available(provider: &dyn CapabilityProvider) -> Result<(), ChatgateError> {
    if provider.is_available().await {
        Ok(())
    } else {
        Err(ChatgateError::provider(format!(
            "{} reports itself unavailable",
            provider.name()
        )))
    }
}

/// The caller-facing error for a failure with no fallback left.
///
/// Timeouts keep their identity; everything else is `BackendUnavailable`.
fn surface(tier: Tier, err: ChatgateError) -> ChatgateError {
    match err {
        ChatgateError::Timeout { .. } | ChatgateError::BackendUnavailable { .. } => err,
        other => ChatgateError::BackendUnavailable {
            tier,
            message: other.to_string(),
        },
    }
}

fn exhausted(tier: Tier, primary: &ChatgateError, secondary: &ChatgateError) -> ChatgateError {
    ChatgateError::BackendUnavailable {
        tier,
        message: format!("{tier} failed ({primary}); direct fallback failed ({secondary})"),
    }
}
