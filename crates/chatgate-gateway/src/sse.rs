// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events streaming for POST /v1/chat.
//!
//! SSE event format:
//! ```text
//! event: metadata
//! data: {"conversation_id": "..."}
//!
//! event: chunk
//! data: {"response": "A sentence."}
//!
//! event: done
//! data: {"conversation_id": "..."}
//! ```
//!
//! A failure after the stream has started is sent as an `error` event, then
//! the stream closes. Dropping the response (client disconnect) drops the
//! turn stream, which cancels the backend call and skips the append.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use chatgate_agent::{ChatRequest, TurnEvent};
use chatgate_core::ResponseFormat;
use futures::stream::StreamExt;

use crate::error::ApiError;
use crate::format::{StreamEncoder, WireEvent};
use crate::server::GatewayState;

/// Stream one turn as Server-Sent Events.
///
/// Errors raised before the stream starts (validation, strict resume) are
/// plain HTTP error responses.
pub async fn stream_chat(
    state: GatewayState,
    request: ChatRequest,
    format: ResponseFormat,
) -> Response {
    let turn = match state.pipeline.handle_stream(request).await {
        Ok(turn) => turn,
        Err(err) => return ApiError::new(err, format).into_response(),
    };

    let encoder = StreamEncoder::new(format);
    let events = turn.map(move |item| {
        let wire = match item {
            Ok(TurnEvent::Started {
                conversation_id,
                decision,
            }) => encoder.metadata(&conversation_id, &decision),
            Ok(TurnEvent::Chunk(chunk)) => encoder.chunk(&chunk),
            Ok(TurnEvent::Completed(response)) => encoder.done(&response),
            Err(err) => {
                tracing::warn!(kind = err.kind(), error = %err, "stream failed");
                encoder.error(&err)
            }
        };
        Ok::<_, Infallible>(to_event(wire))
    });

    Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response()
}

fn to_event(wire: WireEvent) -> Event {
    Event::default().event(wire.name).data(wire.data.to_string())
}
