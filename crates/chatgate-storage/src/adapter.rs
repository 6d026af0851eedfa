// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the ConversationStore trait.

use async_trait::async_trait;
use tracing::debug;

use chatgate_config::model::StorageConfig;
use chatgate_core::{
    AdapterType, ChatMessage, ChatgateError, Conversation, ConversationId, ConversationStore,
    HealthStatus, PluginAdapter,
};

use crate::database::{map_tr_err, Database};
use crate::queries;

/// SQLite-backed conversation store.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
/// Every write runs on the single connection thread, so appends to one
/// conversation are serialized and each turn commits in one transaction
/// before the call returns.
pub struct SqliteConversationStore {
    db: Database,
}

impl SqliteConversationStore {
    /// Open the configured database file.
    pub async fn open(config: &StorageConfig) -> Result<Self, ChatgateError> {
        let db = Database::open_with(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite conversation store initialized");
        Ok(Self { db })
    }

    /// Wrap an already-open database.
    pub fn from_database(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PluginAdapter for SqliteConversationStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatgateError> {
        let probe = self
            .db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err);
        Ok(match probe {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), ChatgateError> {
        self.db.checkpoint().await?;
        debug!("shutdown: WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn get(&self, id: &ConversationId) -> Result<Option<Conversation>, ChatgateError> {
        queries::conversations::get_conversation(&self.db, id).await
    }

    async fn create(&self) -> Result<Conversation, ChatgateError> {
        let conversation = Conversation::new(ConversationId::generate());
        queries::conversations::insert_conversation(&self.db, &conversation).await?;
        Ok(conversation)
    }

    async fn append(&self, id: &ConversationId, message: ChatMessage) -> Result<(), ChatgateError> {
        queries::messages::append_messages(&self.db, id, vec![message]).await
    }

    async fn append_turn(
        &self,
        id: &ConversationId,
        user: ChatMessage,
        assistant: ChatMessage,
    ) -> Result<(), ChatgateError> {
        queries::messages::append_messages(&self.db, id, vec![user, assistant]).await
    }

    async fn clear(&self, id: &ConversationId) -> Result<(), ChatgateError> {
        let existed = queries::conversations::clear_conversation(&self.db, id).await?;
        if !existed {
            debug!(conversation_id = %id, "clear on unknown conversation");
        }
        Ok(())
    }
}
