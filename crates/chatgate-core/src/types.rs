// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data model shared by the classifier, dispatcher, stores, and wire adapters.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::ChatgateError;

/// Opaque, collision-resistant conversation identifier (UUID v4).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Parse a client-supplied identifier.
    ///
    /// Returns `None` for anything that is not a UUID, so malformed ids are
    /// indistinguishable from unknown ones. Accepted ids are normalized to the
    /// lower-case hyphenated form.
    pub fn parse(raw: &str) -> Option<Self> {
        uuid::Uuid::parse_str(raw.trim())
            .ok()
            .map(|u| Self(u.hyphenated().to_string()))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Author of a stored message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single message in a conversation log. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// A user message stamped with the current time.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// An assistant message stamped with the current time.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// The ordered, append-only message log for one conversation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub messages: Vec<ChatMessage>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// An empty conversation with the given id.
    pub fn new(id: ConversationId) -> Self {
        Self {
            id,
            messages: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Number of completed turns (user + assistant pairs).
    pub fn turns(&self) -> usize {
        self.messages.len() / 2
    }
}

/// Backend handling strategy assigned to a request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Plain language-model generation.
    Direct,
    /// Generation with a single tool-augmented call.
    Tool,
    /// Multi-step agent workflow.
    Workflow,
}

/// Classifier output. Computed per request, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingDecision {
    pub tier: Tier,
    pub required_capabilities: BTreeSet<String>,
    /// Confidence in the tier (0.0-1.0). Rule-based decisions are always 1.0.
    pub confidence: f32,
    /// Human-readable reason, for logs and verbose metadata.
    pub reason: &'static str,
}

/// Token accounting reported by a backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Sum of both counts, saturating at `u32::MAX` for out-of-range
    /// backend reports.
    pub fn total(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// The single internal response shape produced per request.
///
/// This is the sole input to wire formatting. Only the verbose format
/// exposes `provider`, `model`, `usage`, and the routing fields.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalResponse {
    pub content: String,
    pub usage: Option<TokenUsage>,
    /// Tier that actually produced `content`.
    pub backend_tier: Tier,
    /// Tier the classifier selected.
    pub requested_tier: Tier,
    pub conversation_id: ConversationId,
    /// Set when the requested tier failed and `direct` answered instead.
    pub fallback: bool,
    pub provider: String,
    pub model: String,
    pub latency_ms: u64,
    pub created_at: DateTime<Utc>,
}

/// A sentence-bounded unit of streamed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub is_final: bool,
}

/// Wire representation requested by the caller.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// OpenAI-style envelope with usage and routing metadata.
    #[default]
    Verbose,
    /// Only the response text and the conversation id.
    Minimal,
}

impl ResponseFormat {
    /// Strictly parse a selector value (case-insensitive, surrounding whitespace ignored).
    pub fn parse(raw: &str) -> Result<Self, ChatgateError> {
        raw.trim()
            .parse()
            .map_err(|_| ChatgateError::Format(format!("unrecognized response format `{raw}`")))
    }

    /// Resolve an optional selector, defaulting to verbose on absence or error.
    pub fn select(raw: Option<&str>) -> Self {
        raw.and_then(|r| Self::parse(r).ok()).unwrap_or_default()
    }
}

/// What a capability provider receives for one generation.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Conversation history prior to this turn.
    pub conversation: Conversation,
    pub message: String,
    pub capabilities: BTreeSet<String>,
    pub workflow: Option<String>,
}

/// A complete, non-streamed provider result.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub content: String,
    pub model: String,
    pub usage: Option<TokenUsage>,
}

/// One item of a streamed provider result.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Text(String),
    Usage(TokenUsage),
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Storage,
    Observability,
}
