// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation store trait for persistence backends.

use async_trait::async_trait;

use crate::error::ChatgateError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatMessage, Conversation, ConversationId};

/// Per-conversation ordered message log.
///
/// Implementations must serialize writes per conversation id: concurrent
/// appends to one id never interleave or get lost. Appends must be durable
/// before they return.
#[async_trait]
pub trait ConversationStore: PluginAdapter {
    /// Fetch a conversation. Unknown ids yield `Ok(None)`, never an error.
    async fn get(&self, id: &ConversationId) -> Result<Option<Conversation>, ChatgateError>;

    /// Create and persist an empty conversation with a fresh id.
    async fn create(&self) -> Result<Conversation, ChatgateError>;

    /// Append a single message, creating the conversation if needed.
    async fn append(&self, id: &ConversationId, message: ChatMessage) -> Result<(), ChatgateError>;

    /// Append one turn (user then assistant) as a single atomic write,
    /// creating the conversation if needed.
    async fn append_turn(
        &self,
        id: &ConversationId,
        user: ChatMessage,
        assistant: ChatMessage,
    ) -> Result<(), ChatgateError>;

    /// Remove every message from a conversation. Unknown ids are a no-op.
    async fn clear(&self, id: &ConversationId) -> Result<(), ChatgateError>;
}
