// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation persistence for the chatgate gateway.
//!
//! Two [`ConversationStore`] implementations:
//! - [`InMemoryConversationStore`]: a process-local map with one lock per conversation
//! - [`SqliteConversationStore`]: WAL-mode SQLite with embedded migrations and a
//!   single-writer connection via `tokio-rusqlite`
//!
//! Both serialize writes per conversation id so concurrent turns never interleave.

pub mod adapter;
pub mod database;
pub mod memory;
pub mod migrations;
pub mod queries;

use std::sync::Arc;

use chatgate_config::model::{StorageBackend, StorageConfig};
use chatgate_core::{ChatgateError, ConversationStore};

pub use adapter::SqliteConversationStore;
pub use database::Database;
pub use memory::InMemoryConversationStore;

/// Open the store selected by the configuration.
pub async fn open_store(
    config: &StorageConfig,
) -> Result<Arc<dyn ConversationStore>, ChatgateError> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(InMemoryConversationStore::new())),
        StorageBackend::Sqlite => Ok(Arc::new(SqliteConversationStore::open(config).await?)),
    }
}
