// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP transport for the chatgate gateway.
//!
//! Exposes the chat pipeline over a small REST API with SSE streaming, and
//! owns the response format adapter that turns a canonical response into the
//! `verbose` or `minimal` wire shape.

pub mod error;
pub mod format;
pub mod handlers;
pub mod server;
pub mod sse;

pub use error::{ApiError, status_for};
pub use format::{StreamEncoder, WireEvent, error_body, to_wire};
pub use server::{GatewayState, HealthState, ServerConfig, build_router, start_server};
