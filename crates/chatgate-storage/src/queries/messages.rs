// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message log operations.

use chatgate_core::{ChatMessage, ChatgateError, ConversationId, Role};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection};

use crate::database::{map_tr_err, Database};

/// Append messages to a conversation in one transaction.
///
/// Creates the conversation row if it does not exist. Each message gets the
/// next `seq` value, so the batch lands contiguously and in order.
pub async fn append_messages(
    db: &Database,
    id: &ConversationId,
    messages: Vec<ChatMessage>,
) -> Result<(), ChatgateError> {
    let id = id.as_str().to_string();
    let now = Utc::now();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT OR IGNORE INTO conversations (id, created_at, updated_at) VALUES (?1, ?2, ?2)",
                params![id, now],
            )?;
            let last: i64 = tx.query_row(
                "SELECT COALESCE(MAX(seq), 0) FROM messages WHERE conversation_id = ?1",
                params![id],
                |row| row.get(0),
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO messages (conversation_id, seq, role, content, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for (offset, msg) in messages.iter().enumerate() {
                    stmt.execute(params![
                        id,
                        last + 1 + offset as i64,
                        msg.role.to_string(),
                        msg.content,
                        msg.created_at,
                    ])?;
                }
            }
            tx.execute(
                "UPDATE conversations SET updated_at = ?2 WHERE id = ?1",
                params![id, now],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Read the message log of one conversation, ordered by `seq`.
///
/// Runs on the connection thread; callers are inside `call()`.
pub(crate) fn load_messages(
    conn: &Connection,
    conversation_id: &str,
) -> Result<Vec<ChatMessage>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT role, content, created_at FROM messages
         WHERE conversation_id = ?1 ORDER BY seq ASC",
    )?;
    let rows = stmt.query_map(params![conversation_id], |row| {
        let role: String = row.get(0)?;
        let role = role
            .parse::<Role>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;
        Ok(ChatMessage {
            role,
            content: row.get(1)?,
            created_at: row.get(2)?,
        })
    })?;
    rows.collect()
}
