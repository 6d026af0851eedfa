// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the chatgate gateway.

use thiserror::Error;

use crate::types::Tier;

/// The primary error type used across all chatgate adapter traits and core operations.
#[derive(Debug, Error)]
pub enum ChatgateError {
    /// The inbound request is malformed (missing or empty message).
    #[error("validation error: {0}")]
    Validation(String),

    /// No backend could serve the request, including the fallback tier.
    #[error("backend unavailable for {tier} tier: {message}")]
    BackendUnavailable { tier: Tier, message: String },

    /// The caller demanded strict resume semantics for an unknown conversation.
    #[error("conversation not found: {id}")]
    ConversationNotFound { id: String },

    /// A backend call exceeded its bound.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Response format selection failed. Always resolved to a default by callers.
    #[error("format error: {0}")]
    Format(String),

    /// A single capability provider failed (network, API error, malformed output).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Conversation store errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (invalid TOML, missing backends, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ChatgateError {
    /// Shorthand for a provider error without an underlying source.
    pub fn provider(message: impl Into<String>) -> Self {
        ChatgateError::Provider {
            message: message.into(),
            source: None,
        }
    }

    /// Stable snake_case label for wire error bodies and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            ChatgateError::Validation(_) => "validation_error",
            ChatgateError::BackendUnavailable { .. } => "backend_unavailable",
            ChatgateError::ConversationNotFound { .. } => "conversation_not_found",
            ChatgateError::Timeout { .. } => "timeout",
            ChatgateError::Format(_) => "format_error",
            ChatgateError::Provider { .. } => "provider_error",
            ChatgateError::Storage { .. } => "storage_error",
            ChatgateError::Config(_) => "config_error",
            ChatgateError::Internal(_) => "internal_error",
        }
    }
}
