// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics adapter for the chatgate gateway.
//!
//! Uses the metrics-rs facade with the Prometheus exporter.
//! Metrics are rendered as Prometheus text format via the `render()` method,
//! which is exposed through the gateway's /metrics endpoint.

pub mod recording;

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use chatgate_core::{AdapterType, ChatgateError, HealthStatus, PluginAdapter};

pub use recording::{
    record_backend_error, record_chunks, record_fallback, record_latency, record_request,
    record_tokens, StreamGuard,
};

/// Prometheus metrics adapter.
///
/// Installs the Prometheus recorder and exposes a handle for rendering
/// metrics in Prometheus text format.
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
}

impl PrometheusAdapter {
    /// Create a new PrometheusAdapter.
    ///
    /// Installs the Prometheus recorder globally. Only one recorder can be
    /// installed per process. Returns an error if a recorder is already installed.
    pub fn new() -> Result<Self, ChatgateError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            ChatgateError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();

        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Get a reference to the Prometheus handle for rendering.
    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[async_trait]
impl PluginAdapter for PrometheusAdapter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Observability
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatgateError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ChatgateError> {
        Ok(())
    }
}
