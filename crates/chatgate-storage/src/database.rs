// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;
use std::time::Duration;

use chatgate_core::ChatgateError;
use tracing::debug;

use crate::migrations;

/// Handle to the single SQLite connection.
///
/// Cloning shares the same background thread.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) a database file, apply PRAGMAs, and run migrations.
    pub async fn open(path: &str) -> Result<Self, ChatgateError> {
        Self::open_with(path, true).await
    }

    /// Open with explicit WAL setting.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, ChatgateError> {
        if path != ":memory:"
            && let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| ChatgateError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| ChatgateError::Storage {
                source: e.to_string().into(),
            })?;

        conn.call(move |conn| {
            if wal_mode {
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
            }
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.busy_timeout(Duration::from_secs(5))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| Ok::<_, rusqlite::Error>(migrations::run_migrations(conn)))
            .await
            .map_err(map_tr_err)??;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying async connection. Query modules go through `call()`.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL into the main database file.
    pub async fn checkpoint(&self) -> Result<(), ChatgateError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Map a tokio-rusqlite error into the storage error variant.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> ChatgateError {
    ChatgateError::Storage {
        source: e.to_string().into(),
    }
}
