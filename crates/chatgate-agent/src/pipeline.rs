// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-request orchestration: resolve conversation, classify, dispatch,
//! chunk. Wire formatting stays with the transport.

use std::collections::BTreeSet;
use std::pin::Pin;
use std::sync::Arc;

use async_stream::try_stream;
use chatgate_config::model::ChunkingConfig;
use chatgate_core::{
    CanonicalResponse, ChatgateError, Chunk, Conversation, ConversationId, ConversationStore,
    GenerationRequest, HealthStatus, PluginAdapter, RoutingDecision,
};
use chatgate_router::TierClassifier;
use futures::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::chunker::ChunkBuffer;
use crate::dispatch::{BackendDispatcher, DispatchEvent};

/// One inbound chat turn, transport-independent.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub message: String,
    /// Client-supplied id. Unknown or malformed ids start a new conversation.
    pub conversation_id: Option<String>,
    pub requested_capabilities: BTreeSet<String>,
    pub workflow_hint: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// One item of a streamed turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    /// First event: the conversation id is known before any text.
    Started {
        conversation_id: ConversationId,
        decision: RoutingDecision,
    },
    Chunk(Chunk),
    /// Last event, emitted after the turn has been persisted.
    Completed(CanonicalResponse),
}

pub type TurnStream = Pin<Box<dyn Stream<Item = Result<TurnEvent, ChatgateError>> + Send>>;

/// Health of one component, for the health endpoint.
#[derive(Debug, Clone)]
pub struct ComponentHealth {
    pub name: String,
    pub role: String,
    pub status: HealthStatus,
}

/// The request router: the composition root of a turn.
#[derive(Clone)]
pub struct ChatPipeline {
    classifier: Arc<TierClassifier>,
    dispatcher: BackendDispatcher,
    store: Arc<dyn ConversationStore>,
    chunking: ChunkingConfig,
    strict_resume: bool,
}

impl ChatPipeline {
    pub fn new(
        classifier: TierClassifier,
        dispatcher: BackendDispatcher,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            classifier: Arc::new(classifier),
            dispatcher,
            store,
            chunking: ChunkingConfig::default(),
            strict_resume: false,
        }
    }

    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    /// Reject unknown conversation ids with `ConversationNotFound`.
    pub fn with_strict_resume(mut self, strict: bool) -> Self {
        self.strict_resume = strict;
        self
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub fn dispatcher(&self) -> &BackendDispatcher {
        &self.dispatcher
    }

    /// Handle a non-streaming turn.
    pub async fn handle(&self, request: ChatRequest) -> Result<CanonicalResponse, ChatgateError> {
        let (generation, decision) = self.prepare(request).await?;
        self.dispatcher.dispatch(decision.tier, generation).await
    }

    /// Handle a streaming turn.
    ///
    /// Validation and conversation resolution errors are returned directly.
    /// Everything after that is delivered through the stream, which starts
    /// with [`TurnEvent::Started`] before the backend is contacted.
    pub async fn handle_stream(&self, request: ChatRequest) -> Result<TurnStream, ChatgateError> {
        let (generation, decision) = self.prepare(request).await?;
        let dispatcher = self.dispatcher.clone();
        let chunking = self.chunking;

        let stream = try_stream! {
            let _active = chatgate_prometheus::StreamGuard::start();
            yield TurnEvent::Started {
                conversation_id: generation.conversation.id.clone(),
                decision: decision.clone(),
            };

            let mut upstream = dispatcher.dispatch_stream(decision.tier, generation).await?;
            let mut buffer = ChunkBuffer::new(chunking);
            let mut released = 0u64;

            while let Some(event) = upstream.next().await {
                match event? {
                    DispatchEvent::Fragment(text) => {
                        for chunk in buffer.add_text(&text) {
                            released += 1;
                            yield TurnEvent::Chunk(chunk);
                        }
                    }
                    DispatchEvent::Finished(response) => {
                        if let Some(last) = buffer.flush() {
                            released += 1;
                            yield TurnEvent::Chunk(last);
                        }
                        chatgate_prometheus::record_chunks(released);
                        yield TurnEvent::Completed(response);
                    }
                }
            }
        };

        Ok(Box::pin(stream) as TurnStream)
    }

    /// Classify without dispatching.
    pub fn classify(&self, request: &ChatRequest) -> RoutingDecision {
        self.classifier.classify(
            &request.message,
            &request.requested_capabilities,
            request.workflow_hint.as_deref(),
        )
    }

    /// Health of the store and every configured backend.
    pub async fn health(&self) -> Vec<ComponentHealth> {
        let mut components = Vec::new();
        components.push(ComponentHealth {
            name: self.store.name().to_string(),
            role: "store".to_string(),
            status: probe(self.store.as_ref()).await,
        });
        for (tier, provider) in self.dispatcher.backends().iter() {
            components.push(ComponentHealth {
                name: provider.name().to_string(),
                role: tier.to_string(),
                status: probe(provider.as_ref()).await,
            });
        }
        components
    }

    /// Shut down backends and the store, logging failures.
    pub async fn shutdown(&self) {
        for (tier, provider) in self.dispatcher.backends().iter() {
            if let Err(e) = provider.shutdown().await {
                warn!(tier = %tier, error = %e, "backend shutdown failed");
            }
        }
        if let Err(e) = self.store.shutdown().await {
            warn!(error = %e, "store shutdown failed");
        }
    }

    async fn prepare(
        &self,
        request: ChatRequest,
    ) -> Result<(GenerationRequest, RoutingDecision), ChatgateError> {
        if request.message.trim().is_empty() {
            return Err(ChatgateError::Validation(
                "message must not be empty".to_string(),
            ));
        }

        let conversation = self
            .resolve_conversation(request.conversation_id.as_deref())
            .await?;
        let decision = self.classify(&request);
        debug!(
            conversation_id = %conversation.id,
            tier = %decision.tier,
            confidence = decision.confidence,
            reason = decision.reason,
            "request classified"
        );

        Ok((
            GenerationRequest {
                conversation,
                message: request.message,
                capabilities: decision.required_capabilities.clone(),
                workflow: request.workflow_hint,
            },
            decision,
        ))
    }

    /// Load the conversation named by `raw`, or start a new one.
    ///
    /// New conversations are not persisted here; the first successful turn
    /// creates them, so failed first turns leave nothing behind.
    async fn resolve_conversation(
        &self,
        raw: Option<&str>,
    ) -> Result<Conversation, ChatgateError> {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return Ok(Conversation::new(ConversationId::generate()));
        };

        let existing = match ConversationId::parse(raw) {
            Some(id) => self.store.get(&id).await?,
            None => None,
        };
        match existing {
            Some(conversation) => Ok(conversation),
            None if self.strict_resume => Err(ChatgateError::ConversationNotFound {
                id: raw.to_string(),
            }),
            None => {
                debug!("unknown conversation id supplied, starting a new conversation");
                Ok(Conversation::new(ConversationId::generate()))
            }
        }
    }
}

async fn probe<A: PluginAdapter + ?Sized>(adapter: &A) -> HealthStatus {
    adapter
        .health_check()
        .await
        .unwrap_or_else(|e| HealthStatus::Unhealthy(e.to_string()))
}
