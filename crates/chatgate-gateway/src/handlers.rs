// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use chatgate_agent::ChatRequest;
use chatgate_core::{
    ChatMessage, ChatgateError, ConversationId, HealthStatus, ResponseFormat,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::format::to_wire;
use crate::server::GatewayState;
use crate::sse;

/// Header carrying the response format selector.
pub const FORMAT_HEADER: &str = "x-response-format";

/// Request body for POST /v1/chat.
#[derive(Debug, Default, Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub requested_capabilities: Vec<String>,
    #[serde(default)]
    pub workflow_hint: Option<String>,
    #[serde(default)]
    pub stream: bool,
}

impl From<ChatBody> for ChatRequest {
    fn from(body: ChatBody) -> Self {
        ChatRequest {
            message: body.message,
            conversation_id: body.conversation_id,
            requested_capabilities: body.requested_capabilities.into_iter().collect(),
            workflow_hint: body.workflow_hint,
        }
    }
}

/// `?format=` query parameter.
#[derive(Debug, Default, Deserialize)]
pub struct FormatQuery {
    #[serde(default)]
    pub format: Option<String>,
}

/// Resolve the response format: header first, then query; verbose otherwise.
pub fn select_format(headers: &HeaderMap, query: &FormatQuery) -> ResponseFormat {
    let raw = headers
        .get(FORMAT_HEADER)
        .and_then(|v| v.to_str().ok())
        .or(query.format.as_deref());
    if let Some(raw) = raw
        && ResponseFormat::parse(raw).is_err()
    {
        debug!(format = raw, "unrecognized response format, using verbose");
    }
    ResponseFormat::select(raw)
}

fn wants_stream(headers: &HeaderMap, body: &ChatBody) -> bool {
    body.stream
        || headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|accept| accept.contains("text/event-stream"))
}

/// POST /v1/chat
///
/// Runs one turn. Streams Server-Sent Events when `"stream": true` or the
/// client accepts `text/event-stream`.
pub async fn post_chat(
    State(state): State<GatewayState>,
    Query(query): Query<FormatQuery>,
    headers: HeaderMap,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Response {
    let format = select_format(&headers, &query);
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            let err = ChatgateError::Validation(rejection.body_text());
            return ApiError::new(err, format).into_response();
        }
    };

    let stream = wants_stream(&headers, &body);
    let request = ChatRequest::from(body);
    let tier = state.pipeline.classify(&request).tier;
    chatgate_prometheus::record_request(tier, &format.to_string(), stream);

    if stream {
        return sse::stream_chat(state, request, format).await;
    }

    match state.pipeline.handle(request).await {
        Ok(response) => Json(to_wire(&response, format, false)).into_response(),
        Err(err) => ApiError::new(err, format).into_response(),
    }
}

#[derive(Debug, Serialize)]
pub struct ConversationCreated {
    pub conversation_id: String,
}

/// POST /v1/conversations
pub async fn post_conversation(
    State(state): State<GatewayState>,
) -> Result<(StatusCode, Json<ConversationCreated>), ApiError> {
    let conversation = state
        .pipeline
        .store()
        .create()
        .await
        .map_err(|e| ApiError::new(e, ResponseFormat::Verbose))?;
    Ok((
        StatusCode::CREATED,
        Json(ConversationCreated {
            conversation_id: conversation.id.to_string(),
        }),
    ))
}

/// Response body for GET /v1/conversations/{id}.
#[derive(Debug, Serialize)]
pub struct ConversationView {
    pub conversation_id: String,
    pub updated_at: String,
    pub messages: Vec<ChatMessage>,
}

fn not_found(raw: &str) -> ApiError {
    ApiError::new(
        ChatgateError::ConversationNotFound { id: raw.to_string() },
        ResponseFormat::Verbose,
    )
}

/// GET /v1/conversations/{id}
pub async fn get_conversation(
    State(state): State<GatewayState>,
    Path(raw): Path<String>,
) -> Result<Json<ConversationView>, ApiError> {
    let id = ConversationId::parse(&raw).ok_or_else(|| not_found(&raw))?;
    let conversation = state
        .pipeline
        .store()
        .get(&id)
        .await
        .map_err(|e| ApiError::new(e, ResponseFormat::Verbose))?
        .ok_or_else(|| not_found(&raw))?;

    Ok(Json(ConversationView {
        conversation_id: conversation.id.to_string(),
        updated_at: conversation.updated_at.to_rfc3339(),
        messages: conversation.messages,
    }))
}

/// DELETE /v1/conversations/{id}
///
/// Clears the message log. Unknown ids are a no-op.
pub async fn delete_conversation(
    State(state): State<GatewayState>,
    Path(raw): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = ConversationId::parse(&raw).ok_or_else(|| not_found(&raw))?;
    state
        .pipeline
        .store()
        .clear(&id)
        .await
        .map_err(|e| ApiError::new(e, ResponseFormat::Verbose))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub name: String,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub components: Vec<ComponentView>,
}

#[derive(Debug, Serialize)]
pub struct ComponentView {
    pub name: String,
    pub role: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// GET /health
///
/// `unhealthy` (503) when the store or the direct backend is down, since no
/// turn can complete without them. Other failing backends only degrade.
pub async fn get_health(State(state): State<GatewayState>) -> (StatusCode, Json<HealthResponse>) {
    let components = state.pipeline.health().await;

    let critical_down = components.iter().any(|c| {
        matches!(c.role.as_str(), "store" | "direct")
            && matches!(c.status, HealthStatus::Unhealthy(_))
    });
    let overall = if critical_down {
        "unhealthy"
    } else if components
        .iter()
        .all(|c| c.status == HealthStatus::Healthy)
    {
        "ok"
    } else {
        "degraded"
    };

    let components = components
        .into_iter()
        .map(|c| {
            let (status, detail) = match c.status {
                HealthStatus::Healthy => ("healthy", None),
                HealthStatus::Degraded(d) => ("degraded", Some(d)),
                HealthStatus::Unhealthy(d) => ("unhealthy", Some(d)),
            };
            ComponentView {
                name: c.name,
                role: c.role,
                status,
                detail,
            }
        })
        .collect();

    let code = if overall == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        code,
        Json(HealthResponse {
            status: overall,
            name: state.health.name.clone(),
            version: env!("CARGO_PKG_VERSION"),
            uptime_secs: state.health.start_time.elapsed().as_secs(),
            components,
        }),
    )
}

/// GET /metrics
///
/// Prometheus text format, or 404 when metrics are disabled.
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn chat_body_deserializes_with_message_only() {
        let body: ChatBody = serde_json::from_str(r#"{"message": "hi"}"#).unwrap();
        assert_eq!(body.message, "hi");
        assert!(!body.stream);
        assert!(body.requested_capabilities.is_empty());
    }

    #[test]
    fn chat_body_converts_capabilities_to_set() {
        let body: ChatBody = serde_json::from_str(
            r#"{"message": "hi", "requested_capabilities": ["b", "a", "b"], "workflow_hint": "research"}"#,
        )
        .unwrap();
        let request = ChatRequest::from(body);
        assert_eq!(request.requested_capabilities.len(), 2);
        assert_eq!(request.workflow_hint.as_deref(), Some("research"));
    }

    #[test]
    fn header_wins_over_query() {
        let mut headers = HeaderMap::new();
        headers.insert(FORMAT_HEADER, HeaderValue::from_static("Minimal"));
        let query = FormatQuery {
            format: Some("verbose".into()),
        };
        assert_eq!(select_format(&headers, &query), ResponseFormat::Minimal);
    }

    #[test]
    fn query_selects_when_no_header() {
        let query = FormatQuery {
            format: Some("MINIMAL".into()),
        };
        assert_eq!(select_format(&HeaderMap::new(), &query), ResponseFormat::Minimal);
    }

    #[test]
    fn unknown_format_is_verbose() {
        let mut headers = HeaderMap::new();
        headers.insert(FORMAT_HEADER, HeaderValue::from_static("yaml"));
        assert_eq!(
            select_format(&headers, &FormatQuery::default()),
            ResponseFormat::Verbose
        );
    }

    #[test]
    fn accept_header_requests_stream() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/event-stream"));
        assert!(wants_stream(&headers, &ChatBody::default()));
        assert!(!wants_stream(&HeaderMap::new(), &ChatBody::default()));
    }
}
