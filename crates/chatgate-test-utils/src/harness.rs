// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end pipeline testing.
//!
//! `TestHarness` assembles a complete pipeline with one [`MockProvider`] per
//! tier over an in-memory conversation store. The classifier knows the
//! workflow `research` and the complex combination `{toolA, toolB, toolC}`.

use std::sync::Arc;
use std::time::Duration;

use chatgate_agent::{BackendDispatcher, ChatPipeline, ChatRequest, TierBackends};
use chatgate_config::model::{ChunkingConfig, DispatchConfig, RoutingConfig};
use chatgate_core::{CanonicalResponse, ChatgateError, ConversationStore};
use chatgate_router::TierClassifier;
use chatgate_storage::InMemoryConversationStore;

use crate::mock_provider::MockProvider;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    timeout: Duration,
    fallback_to_direct: bool,
    strict_resume: bool,
    with_tool: bool,
    with_workflow: bool,
    chunking: ChunkingConfig,
    store: Option<Arc<dyn ConversationStore>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            fallback_to_direct: true,
            strict_resume: false,
            with_tool: true,
            with_workflow: true,
            chunking: ChunkingConfig::default(),
            store: None,
        }
    }

    /// Per-call backend bound.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn without_fallback(mut self) -> Self {
        self.fallback_to_direct = false;
        self
    }

    pub fn strict_resume(mut self) -> Self {
        self.strict_resume = true;
        self
    }

    /// Leave the tool tier unconfigured.
    pub fn without_tool(mut self) -> Self {
        self.with_tool = false;
        self
    }

    /// Leave the workflow tier unconfigured.
    pub fn without_workflow(mut self) -> Self {
        self.with_workflow = false;
        self
    }

    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    /// Use this store instead of a fresh in-memory one.
    pub fn with_store(mut self, store: Arc<dyn ConversationStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> TestHarness {
        let direct = Arc::new(MockProvider::new("direct"));
        let tool = Arc::new(MockProvider::new("tool"));
        let workflow = Arc::new(MockProvider::new("workflow"));

        let mut backends = TierBackends::new(direct.clone());
        if self.with_tool {
            backends = backends.with_tool(tool.clone());
        }
        if self.with_workflow {
            backends = backends.with_workflow(workflow.clone());
        }

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryConversationStore::new()));
        let dispatch = DispatchConfig {
            timeout_secs: self.timeout.as_secs().max(1),
            fallback_to_direct: self.fallback_to_direct,
        };
        let dispatcher =
            BackendDispatcher::new(backends, store.clone(), &dispatch).with_timeout(self.timeout);

        let routing = RoutingConfig {
            workflows: vec!["research".to_string()],
            complex_combinations: vec![vec![
                "toolA".to_string(),
                "toolB".to_string(),
                "toolC".to_string(),
            ]],
            heuristic_fallback: true,
        };
        let pipeline = ChatPipeline::new(TierClassifier::new(&routing), dispatcher, store.clone())
            .with_chunking(self.chunking)
            .with_strict_resume(self.strict_resume);

        TestHarness {
            pipeline,
            store,
            direct,
            tool,
            workflow,
        }
    }
}

/// A complete pipeline wired to mock backends.
pub struct TestHarness {
    pub pipeline: ChatPipeline,
    pub store: Arc<dyn ConversationStore>,
    pub direct: Arc<MockProvider>,
    pub tool: Arc<MockProvider>,
    pub workflow: Arc<MockProvider>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with defaults: all tiers configured, fallback on, 5s timeout.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Send a plain message on a new conversation.
    pub async fn chat(&self, message: &str) -> Result<CanonicalResponse, ChatgateError> {
        self.pipeline.handle(ChatRequest::new(message)).await
    }

    /// Send a message on an existing conversation.
    pub async fn chat_in(
        &self,
        conversation_id: &str,
        message: &str,
    ) -> Result<CanonicalResponse, ChatgateError> {
        self.pipeline
            .handle(ChatRequest {
                conversation_id: Some(conversation_id.to_string()),
                ..ChatRequest::new(message)
            })
            .await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
