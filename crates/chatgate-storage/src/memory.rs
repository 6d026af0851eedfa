// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local conversation store.
//!
//! Each conversation sits behind its own async mutex. The map shard lock is
//! only held long enough to clone the conversation's `Arc`, so writers on
//! different ids never wait for each other and writers on one id queue up
//! in lock order.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use chatgate_core::{
    AdapterType, ChatMessage, ChatgateError, Conversation, ConversationId, ConversationStore,
    HealthStatus, PluginAdapter,
};

/// In-memory [`ConversationStore`]. Conversations are lost on restart.
#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: DashMap<ConversationId, Arc<Mutex<Conversation>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of conversations held.
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// The slot for `id`, created empty if absent.
    fn slot(&self, id: &ConversationId) -> Arc<Mutex<Conversation>> {
        let entry = self
            .conversations
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Conversation::new(id.clone()))));
        Arc::clone(entry.value())
    }

    fn existing(&self, id: &ConversationId) -> Option<Arc<Mutex<Conversation>>> {
        self.conversations.get(id).map(|e| Arc::clone(e.value()))
    }
}

#[async_trait]
impl PluginAdapter for InMemoryConversationStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatgateError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ChatgateError> {
        debug!(conversations = self.conversations.len(), "in-memory store shutting down");
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get(&self, id: &ConversationId) -> Result<Option<Conversation>, ChatgateError> {
        match self.existing(id) {
            Some(slot) => Ok(Some(slot.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn create(&self) -> Result<Conversation, ChatgateError> {
        let conversation = Conversation::new(ConversationId::generate());
        self.conversations.insert(
            conversation.id.clone(),
            Arc::new(Mutex::new(conversation.clone())),
        );
        Ok(conversation)
    }

    async fn append(&self, id: &ConversationId, message: ChatMessage) -> Result<(), ChatgateError> {
        let slot = self.slot(id);
        let mut conversation = slot.lock().await;
        conversation.messages.push(message);
        conversation.updated_at = Utc::now();
        Ok(())
    }

    async fn append_turn(
        &self,
        id: &ConversationId,
        user: ChatMessage,
        assistant: ChatMessage,
    ) -> Result<(), ChatgateError> {
        let slot = self.slot(id);
        let mut conversation = slot.lock().await;
        conversation.messages.push(user);
        conversation.messages.push(assistant);
        conversation.updated_at = Utc::now();
        Ok(())
    }

    async fn clear(&self, id: &ConversationId) -> Result<(), ChatgateError> {
        if let Some(slot) = self.existing(id) {
            let mut conversation = slot.lock().await;
            conversation.messages.clear();
            conversation.updated_at = Utc::now();
        }
        Ok(())
    }
}
