// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation row operations.

use chatgate_core::{ChatgateError, Conversation, ConversationId};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::queries::messages::load_messages;

/// Insert an empty conversation row.
pub async fn insert_conversation(db: &Database, conversation: &Conversation) -> Result<(), ChatgateError> {
    let id = conversation.id.as_str().to_string();
    let now = conversation.updated_at;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversations (id, created_at, updated_at) VALUES (?1, ?2, ?2)",
                params![id, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Load a conversation and its full message log, ordered by `seq`.
pub async fn get_conversation(
    db: &Database,
    id: &ConversationId,
) -> Result<Option<Conversation>, ChatgateError> {
    let id = id.clone();
    db.connection()
        .call(move |conn| {
            let updated_at: Option<DateTime<Utc>> = conn
                .query_row(
                    "SELECT updated_at FROM conversations WHERE id = ?1",
                    params![id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(updated_at) = updated_at else {
                return Ok(None);
            };
            let messages = load_messages(conn, id.as_str())?;
            Ok(Some(Conversation {
                id,
                messages,
                updated_at,
            }))
        })
        .await
        .map_err(map_tr_err)
}

/// Delete every message of a conversation, keeping the conversation itself.
///
/// Returns whether the conversation existed.
pub async fn clear_conversation(db: &Database, id: &ConversationId) -> Result<bool, ChatgateError> {
    let id = id.as_str().to_string();
    let now = Utc::now();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM messages WHERE conversation_id = ?1", params![id])?;
            let touched = tx.execute(
                "UPDATE conversations SET updated_at = ?2 WHERE id = ?1",
                params![id, now],
            )?;
            tx.commit()?;
            Ok(touched > 0)
        })
        .await
        .map_err(map_tr_err)
}
