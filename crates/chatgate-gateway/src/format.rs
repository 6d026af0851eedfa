// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response format adapter: [`CanonicalResponse`] to wire JSON.
//!
//! `verbose` is an OpenAI-style `chat.completion` envelope with usage and a
//! `metadata` object. `minimal` carries only the response text and the
//! conversation id, and never any provider, model, or tier field.
//!
//! Streaming uses four typed events: `metadata` (first, carries the
//! conversation id), `chunk`, `done` (terminal), and `error`.

use chatgate_core::{
    CanonicalResponse, ChatgateError, Chunk, ConversationId, ResponseFormat, RoutingDecision,
};
use serde::Serialize;
use serde_json::{Value, json};

/// Serialize a finished turn.
///
/// With `streaming` set this is the payload of the terminal `done` event: the
/// text has already been delivered as chunks, so only the envelope remains.
pub fn to_wire(response: &CanonicalResponse, format: ResponseFormat, streaming: bool) -> Value {
    match (format, streaming) {
        (ResponseFormat::Minimal, false) => json!(MinimalResponse {
            response: &response.content,
            conversation_id: response.conversation_id.as_str(),
        }),
        (ResponseFormat::Minimal, true) => json!({
            "conversation_id": response.conversation_id.as_str(),
        }),
        (ResponseFormat::Verbose, false) => json!(VerboseResponse::new(response, "chat.completion")),
        (ResponseFormat::Verbose, true) => {
            let mut envelope = VerboseResponse::new(response, "chat.completion.done");
            envelope.choices.clear();
            json!(envelope)
        }
    }
}

/// Wire body for an error, in the requested format.
///
/// Minimal bodies use a fixed message per error kind, since backend error
/// text can name providers or endpoints.
pub fn error_body(err: &ChatgateError, format: ResponseFormat) -> Value {
    let message = match format {
        ResponseFormat::Verbose => err.to_string(),
        ResponseFormat::Minimal => public_message(err).to_string(),
    };
    json!({
        "error": {
            "kind": err.kind(),
            "message": message,
        }
    })
}

fn public_message(err: &ChatgateError) -> &'static str {
    match err {
        ChatgateError::Validation(_) => "invalid request",
        ChatgateError::ConversationNotFound { .. } => "conversation not found",
        ChatgateError::Timeout { .. } => "the request timed out",
        ChatgateError::BackendUnavailable { .. } | ChatgateError::Provider { .. } => {
            "no backend could serve the request"
        }
        _ => "internal error",
    }
}

#[derive(Serialize)]
struct MinimalResponse<'a> {
    response: &'a str,
    conversation_id: &'a str,
}

#[derive(Serialize)]
struct VerboseResponse<'a> {
    id: String,
    object: &'static str,
    created: i64,
    model: &'a str,
    provider: &'a str,
    choices: Vec<VerboseChoice<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<VerboseUsage>,
    metadata: VerboseMetadata<'a>,
}

impl<'a> VerboseResponse<'a> {
    fn new(response: &'a CanonicalResponse, object: &'static str) -> Self {
        Self {
            id: format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
            object,
            created: response.created_at.timestamp(),
            model: &response.model,
            provider: &response.provider,
            choices: vec![VerboseChoice {
                index: 0,
                message: VerboseMessage {
                    role: "assistant",
                    content: &response.content,
                },
                finish_reason: "stop",
            }],
            usage: response.usage.map(|u| VerboseUsage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: u.total(),
            }),
            metadata: VerboseMetadata {
                conversation_id: response.conversation_id.as_str(),
                tier: response.backend_tier.to_string(),
                requested_tier: response.requested_tier.to_string(),
                fallback: response.fallback,
                latency_ms: response.latency_ms,
            },
        }
    }
}

#[derive(Serialize)]
struct VerboseChoice<'a> {
    index: u32,
    message: VerboseMessage<'a>,
    finish_reason: &'static str,
}

#[derive(Serialize)]
struct VerboseMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct VerboseUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Serialize)]
struct VerboseMetadata<'a> {
    conversation_id: &'a str,
    tier: String,
    requested_tier: String,
    fallback: bool,
    latency_ms: u64,
}

/// One typed streaming event, independent of the SSE transport.
#[derive(Debug, Clone, PartialEq)]
pub struct WireEvent {
    pub name: &'static str,
    pub data: Value,
}

/// Turns the events of one streamed turn into wire events.
#[derive(Debug, Clone)]
pub struct StreamEncoder {
    format: ResponseFormat,
    id: String,
    created: i64,
}

impl StreamEncoder {
    pub fn new(format: ResponseFormat) -> Self {
        Self {
            format,
            id: format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
            created: chrono::Utc::now().timestamp(),
        }
    }

    pub fn format(&self) -> ResponseFormat {
        self.format
    }

    /// The first event, sent before any text.
    pub fn metadata(&self, conversation_id: &ConversationId, decision: &RoutingDecision) -> WireEvent {
        let data = match self.format {
            ResponseFormat::Minimal => json!({ "conversation_id": conversation_id.as_str() }),
            ResponseFormat::Verbose => json!({
                "id": self.id,
                "conversation_id": conversation_id.as_str(),
                "tier": decision.tier,
                "confidence": decision.confidence,
                "reason": decision.reason,
            }),
        };
        WireEvent {
            name: "metadata",
            data,
        }
    }

    pub fn chunk(&self, chunk: &Chunk) -> WireEvent {
        let data = match self.format {
            ResponseFormat::Minimal => json!({ "response": chunk.text }),
            ResponseFormat::Verbose => json!({
                "id": self.id,
                "object": "chat.completion.chunk",
                "created": self.created,
                "choices": [{
                    "index": 0,
                    "delta": { "content": chunk.text },
                }],
                "is_final": chunk.is_final,
            }),
        };
        WireEvent { name: "chunk", data }
    }

    /// The terminal event.
    pub fn done(&self, response: &CanonicalResponse) -> WireEvent {
        let mut data = to_wire(response, self.format, true);
        if let (ResponseFormat::Verbose, Some(obj)) = (self.format, data.as_object_mut()) {
            obj.insert("id".to_string(), json!(self.id));
        }
        WireEvent { name: "done", data }
    }

    pub fn error(&self, err: &ChatgateError) -> WireEvent {
        WireEvent {
            name: "error",
            data: error_body(err, self.format),
        }
    }
}
