// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics. Without an installed recorder every call is a no-op.

use chatgate_core::Tier;
use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// Register all chatgate metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("chatgate_requests_total", "Chat requests accepted");
    describe_counter!(
        "chatgate_fallbacks_total",
        "Requests answered by the direct tier after the requested tier failed"
    );
    describe_counter!(
        "chatgate_backend_errors_total",
        "Failed capability provider calls"
    );
    describe_counter!("chatgate_tokens_total", "Tokens reported by backends");
    describe_counter!("chatgate_chunks_total", "Streamed chunks released to clients");
    describe_gauge!("chatgate_active_streams", "Streaming responses in flight");
    describe_histogram!(
        "chatgate_response_latency_seconds",
        Unit::Seconds,
        "Backend response latency in seconds"
    );
}

/// Record an accepted chat request.
pub fn record_request(tier: Tier, format: &str, stream: bool) {
    metrics::counter!(
        "chatgate_requests_total",
        "tier" => tier.to_string(),
        "format" => format.to_string(),
        "stream" => if stream { "true" } else { "false" }
    )
    .increment(1);
}

/// Record a fallback away from `from`.
pub fn record_fallback(from: Tier) {
    metrics::counter!("chatgate_fallbacks_total", "from" => from.to_string()).increment(1);
}

/// Record a failed provider call.
pub fn record_backend_error(tier: Tier, kind: &'static str) {
    metrics::counter!("chatgate_backend_errors_total", "tier" => tier.to_string(), "kind" => kind)
        .increment(1);
}

/// Record response latency for the tier that answered.
pub fn record_latency(tier: Tier, seconds: f64) {
    metrics::histogram!("chatgate_response_latency_seconds", "tier" => tier.to_string())
        .record(seconds);
}

/// Record token consumption.
pub fn record_tokens(tier: Tier, input: u32, output: u32) {
    metrics::counter!("chatgate_tokens_total", "tier" => tier.to_string(), "type" => "input")
        .increment(u64::from(input));
    metrics::counter!("chatgate_tokens_total", "tier" => tier.to_string(), "type" => "output")
        .increment(u64::from(output));
}

/// Record released stream chunks.
pub fn record_chunks(count: u64) {
    metrics::counter!("chatgate_chunks_total").increment(count);
}

/// Tracks one in-flight stream in `chatgate_active_streams`.
///
/// The gauge is decremented on drop, so a client disconnect that drops the
/// stream is counted as well.
#[must_use]
pub struct StreamGuard(());

impl StreamGuard {
    pub fn start() -> Self {
        metrics::gauge!("chatgate_active_streams").increment(1.0);
        Self(())
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        metrics::gauge!("chatgate_active_streams").decrement(1.0);
    }
}
