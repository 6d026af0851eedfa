// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn handling for the chatgate gateway.
//!
//! The [`ChatPipeline`] is the composition root that:
//! - Resolves (or starts) the conversation named by the request
//! - Classifies the request into a tier
//! - Dispatches it through the [`BackendDispatcher`], falling back to `direct` once
//! - Re-chunks streamed output with the [`ChunkBuffer`]
//! - Persists each successful turn exactly once

pub mod chunker;
pub mod dispatch;
pub mod pipeline;
pub mod shutdown;

pub use chunker::ChunkBuffer;
pub use dispatch::{BackendDispatcher, DispatchEvent, DispatchStream, TierBackends};
pub use pipeline::{ChatPipeline, ChatRequest, ComponentHealth, TurnEvent, TurnStream};
pub use shutdown::install_signal_handler;
