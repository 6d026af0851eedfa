// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chatgate_core::{ChatgateError, ResponseFormat};
use tracing::{error, warn};

use crate::format::error_body;

/// A [`ChatgateError`] rendered in the caller's response format.
#[derive(Debug)]
pub struct ApiError {
    pub error: ChatgateError,
    pub format: ResponseFormat,
}

impl ApiError {
    pub fn new(error: ChatgateError, format: ResponseFormat) -> Self {
        Self { error, format }
    }
}

/// HTTP status for an error.
pub fn status_for(err: &ChatgateError) -> StatusCode {
    match err {
        ChatgateError::Validation(_) => StatusCode::BAD_REQUEST,
        ChatgateError::ConversationNotFound { .. } => StatusCode::NOT_FOUND,
        ChatgateError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        ChatgateError::BackendUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.error);
        if status.is_server_error() {
            error!(kind = self.error.kind(), error = %self.error, "request failed");
        } else {
            warn!(kind = self.error.kind(), error = %self.error, "request rejected");
        }
        (status, Json(error_body(&self.error, self.format))).into_response()
    }
}
