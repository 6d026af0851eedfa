// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatgate serve` command implementation.
//!
//! Builds the conversation store, one OpenAI-compatible provider per
//! configured tier, the classifier, dispatcher, and pipeline, then serves the
//! HTTP gateway until SIGINT or SIGTERM.

use std::sync::Arc;

use chatgate_agent::{BackendDispatcher, ChatPipeline, TierBackends, install_signal_handler};
use chatgate_config::model::{BackendsConfig, ChatgateConfig};
use chatgate_core::{ChatgateError, PluginAdapter};
use chatgate_gateway::{GatewayState, HealthState, ServerConfig};
use chatgate_openai::OpenAiProvider;
use chatgate_router::TierClassifier;
use tracing::{debug, info, warn};

/// Runs the `chatgate serve` command.
pub async fn run_serve(config: ChatgateConfig) -> Result<(), ChatgateError> {
    init_tracing(&config.gateway.log_level);

    info!(name = config.gateway.name.as_str(), "starting chatgate serve");

    let prometheus = if config.metrics.enabled {
        match chatgate_prometheus::PrometheusAdapter::new() {
            Ok(adapter) => {
                info!("prometheus metrics enabled");
                Some(Arc::new(adapter))
            }
            Err(e) => {
                warn!(error = %e, "prometheus initialization failed, continuing without metrics");
                None
            }
        }
    } else {
        debug!("prometheus metrics disabled by configuration");
        None
    };
    let prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>> =
        prometheus.map(|adapter| {
            Arc::new(move || adapter.render()) as Arc<dyn Fn() -> String + Send + Sync>
        });

    let store = chatgate_storage::open_store(&config.storage).await?;
    info!(store = store.name(), "conversation store ready");

    let backends = build_backends(&config.backends)?;
    let dispatcher = BackendDispatcher::new(backends, store.clone(), &config.dispatch);
    let classifier = TierClassifier::new(&config.routing);
    let pipeline = ChatPipeline::new(classifier, dispatcher, store)
        .with_chunking(config.chunking)
        .with_strict_resume(config.conversation.strict_resume);

    let mut health = HealthState::new(config.gateway.name.clone());
    if let Some(render) = prometheus_render {
        health = health.with_metrics(render);
    }
    let state = GatewayState {
        pipeline: pipeline.clone(),
        health,
    };
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
        cors_permissive: config.gateway.cors_permissive,
    };

    let cancel = install_signal_handler();
    let served = chatgate_gateway::start_server(&server_config, state, cancel).await;

    info!("shutting down backends and store");
    pipeline.shutdown().await;
    served
}

/// One provider per configured tier. Unconfigured tiers fall back to direct.
fn build_backends(config: &BackendsConfig) -> Result<TierBackends, ChatgateError> {
    let mut backends = TierBackends::new(Arc::new(OpenAiProvider::new("direct", &config.direct)?));
    if let Some(tool) = &config.tool {
        backends = backends.with_tool(Arc::new(OpenAiProvider::new("tool", tool)?));
    } else {
        debug!("no tool backend configured, tool requests will use direct");
    }
    if let Some(workflow) = &config.workflow {
        backends = backends.with_workflow(Arc::new(OpenAiProvider::new("workflow", workflow)?));
    } else {
        debug!("no workflow backend configured, workflow requests will use direct");
    }
    Ok(backends)
}

/// Initializes the tracing subscriber with an env filter.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chatgate={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
