// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the chatgate gateway.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level chatgate configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatgateConfig {
    /// HTTP listener and process settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Tier classification settings.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Backend dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Streaming chunk sizing.
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Conversation resolution settings.
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Conversation store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Capability providers, one per tier.
    #[serde(default)]
    pub backends: BackendsConfig,

    /// Prometheus metrics settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Instance name, reported by the health endpoint.
    #[serde(default = "default_gateway_name")]
    pub name: String,

    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Attach a permissive CORS layer.
    #[serde(default)]
    pub cors_permissive: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            name: default_gateway_name(),
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            cors_permissive: false,
        }
    }
}

fn default_gateway_name() -> String {
    "chatgate".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Tier classification configuration.
///
/// Loaded once at startup and shared read-only by every request.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Known multi-step workflow names. A matching `workflow_hint` routes to the workflow tier.
    #[serde(default = "default_workflows")]
    pub workflows: Vec<String>,

    /// Capability sets known to require multi-step coordination.
    #[serde(default = "default_complex_combinations")]
    pub complex_combinations: Vec<Vec<String>>,

    /// Score free-text signals to lower confidence on ambiguous tool-tier decisions.
    #[serde(default = "default_true")]
    pub heuristic_fallback: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            workflows: default_workflows(),
            complex_combinations: default_complex_combinations(),
            heuristic_fallback: true,
        }
    }
}

fn default_workflows() -> Vec<String> {
    ["research", "deep_research", "report", "plan_and_execute"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_complex_combinations() -> Vec<Vec<String>> {
    [
        &["web_search", "web_fetch", "code_execution"][..],
        &["file_read", "code_execution", "file_write"][..],
        &["calendar", "email"][..],
        &["database_query", "chart"][..],
    ]
    .iter()
    .map(|set| set.iter().map(|s| s.to_string()).collect())
    .collect()
}

fn default_true() -> bool {
    true
}

/// Backend dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Bound on a single backend call, and on the gap between streamed fragments.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry a failed tool/workflow call once on the direct tier.
    #[serde(default = "default_true")]
    pub fallback_to_direct: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            fallback_to_direct: true,
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}

/// Streaming chunk sizing, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChunkingConfig {
    /// Sentence chunks shorter than this are held back for more input.
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,

    /// Upper end of the preferred chunk window.
    #[serde(default = "default_preferred_max_chars")]
    pub preferred_max_chars: usize,

    /// Hard limit; a buffer past this length is force-split.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            min_chars: default_min_chars(),
            preferred_max_chars: default_preferred_max_chars(),
            max_chars: default_max_chars(),
        }
    }
}

fn default_min_chars() -> usize {
    50
}

fn default_preferred_max_chars() -> usize {
    150
}

fn default_max_chars() -> usize {
    200
}

/// Conversation resolution configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConversationConfig {
    /// Reject unknown conversation ids instead of starting a new conversation.
    #[serde(default)]
    pub strict_resume: bool,
}

/// Which conversation store implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local map. Conversations are lost on restart.
    #[default]
    Memory,
    /// SQLite database file.
    Sqlite,
}

/// Conversation store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Store implementation.
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("chatgate").join("conversations.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("conversations.db"))
        .to_string_lossy()
        .into_owned()
}

/// Capability providers keyed by tier.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackendsConfig {
    /// Plain generation. Always required: it is the fallback for the other tiers.
    #[serde(default)]
    pub direct: BackendConfig,

    /// Tool-augmented generation. Requests for this tier fall back to direct when unset.
    #[serde(default)]
    pub tool: Option<BackendConfig>,

    /// Multi-step workflow backend. Requests for this tier fall back to direct when unset.
    #[serde(default)]
    pub workflow: Option<BackendConfig>,
}

/// One OpenAI-compatible backend endpoint.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Base URL; `/chat/completions` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier sent to the backend.
    #[serde(default = "default_model")]
    pub model: String,

    /// Bearer token. `None` sends no Authorization header.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Maximum tokens to generate per response.
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// System prompt prepended to every request.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Retries on transient HTTP errors (429, 500, 503).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            max_tokens: None,
            system_prompt: None,
            max_retries: default_max_retries(),
        }
    }
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("max_tokens", &self.max_tokens)
            .field("system_prompt", &self.system_prompt.is_some())
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:11434/v1".to_string()
}

fn default_model() -> String {
    "llama3.1".to_string()
}

fn default_max_retries() -> u32 {
    1
}

/// Prometheus metrics configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder and serve `/metrics`.
    #[serde(default)]
    pub enabled: bool,
}
