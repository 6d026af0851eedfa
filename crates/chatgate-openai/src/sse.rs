// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE stream parser for streamed chat completions.
//!
//! Converts a reqwest response byte stream into typed [`StreamEvent`]s using
//! `eventsource-stream`. The stream ends at the `data: [DONE]` sentinel.

use std::pin::Pin;

use chatgate_core::ChatgateError;
use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};

use crate::types::{ApiErrorResponse, ChatCompletionChunk};

/// Sentinel payload that terminates an OpenAI-style stream.
const DONE: &str = "[DONE]";

/// Typed events from a chat completions stream.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Chunk(ChatCompletionChunk),
    Done,
}

pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ChatgateError>> + Send>>;

/// Parses a streaming response into [`StreamEvent`]s.
///
/// An `{"error": ...}` payload becomes a `Provider` error. Empty keep-alive
/// payloads are skipped.
pub fn parse_sse_stream(response: reqwest::Response) -> EventStream {
    let events = response.bytes_stream().eventsource();

    let mapped = events.filter_map(|result| async move {
        match result {
            Ok(event) => {
                let data = event.data.trim();
                if data.is_empty() {
                    return None;
                }
                if data == DONE {
                    return Some(Ok(StreamEvent::Done));
                }
                Some(parse_chunk(data))
            }
            Err(e) => Some(Err(ChatgateError::Provider {
                message: format!("SSE stream error: {e}"),
                source: None,
            })),
        }
    });

    Box::pin(mapped)
}

fn parse_chunk(data: &str) -> Result<StreamEvent, ChatgateError> {
    // Every chunk field is optional, so the error envelope is checked first.
    if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(data) {
        return Err(ChatgateError::provider(format!(
            "backend error during stream ({})",
            api_err.error
        )));
    }
    serde_json::from_str::<ChatCompletionChunk>(data)
        .map(StreamEvent::Chunk)
        .map_err(|e| ChatgateError::Provider {
            message: format!("failed to parse stream chunk: {e}"),
            source: Some(Box::new(e)),
        })
}
