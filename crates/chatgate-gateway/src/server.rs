// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    routing::{get, post},
};
use chatgate_agent::ChatPipeline;
use chatgate_core::ChatgateError;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;

/// Health state for the unauthenticated health and metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Instance name reported by `/health`.
    pub name: String,
    /// Process start time for uptime calculation.
    pub start_time: Instant,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

impl HealthState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start_time: Instant::now(),
            prometheus_render: None,
        }
    }

    pub fn with_metrics(mut self, render: Arc<dyn Fn() -> String + Send + Sync>) -> Self {
        self.prometheus_render = Some(render);
        self
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub pipeline: ChatPipeline,
    pub health: HealthState,
}

/// Gateway server configuration (mirrors `GatewayConfig` from chatgate-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Attach a permissive CORS layer.
    pub cors_permissive: bool,
}

/// Build the application router.
///
/// Routes:
/// - POST /v1/chat
/// - POST /v1/conversations
/// - GET|DELETE /v1/conversations/{id}
/// - GET /health
/// - GET /metrics
pub fn build_router(state: GatewayState, cors_permissive: bool) -> Router {
    let app = Router::new()
        .route("/v1/chat", post(handlers::post_chat))
        .route("/v1/conversations", post(handlers::post_conversation))
        .route(
            "/v1/conversations/{id}",
            get(handlers::get_conversation).delete(handlers::delete_conversation),
        )
        .route("/health", get(handlers::get_health))
        .route("/metrics", get(handlers::get_metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors_permissive {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Start the gateway HTTP server and serve until `shutdown` is cancelled.
///
/// In-flight requests are drained before this returns.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), ChatgateError> {
    let app = build_router(state, config.cors_permissive);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ChatgateError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| ChatgateError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
