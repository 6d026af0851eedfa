// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability provider trait for response-generation backends.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::ChatgateError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Fragment, Generation, GenerationRequest, HealthStatus};

/// Lazy sequence of raw fragments from a streaming backend.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment, ChatgateError>> + Send>>;

/// A backend that generates assistant text: a plain model, a tool-augmented
/// model, or a multi-step workflow. The gateway treats all three as opaque.
#[async_trait]
pub trait CapabilityProvider: PluginAdapter {
    /// Whether the provider can currently accept work.
    ///
    /// Anything other than an explicit `Unhealthy` (or a failing health check)
    /// counts as available.
    async fn is_available(&self) -> bool {
        matches!(
            self.health_check().await,
            Ok(HealthStatus::Healthy | HealthStatus::Degraded(_))
        )
    }

    /// Model identifier, reported in verbose responses for streamed turns.
    fn model(&self) -> &str;

    /// Generates the full response for one turn.
    async fn generate(&self, request: GenerationRequest) -> Result<Generation, ChatgateError>;

    /// Generates the response as a stream of fragments.
    async fn generate_stream(
        &self,
        request: GenerationRequest,
    ) -> Result<FragmentStream, ChatgateError>;
}
