// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./chatgate.toml` > `~/.config/chatgate/chatgate.toml` >
//! `/etc/chatgate/chatgate.toml` with environment variable overrides via `CHATGATE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::ChatgateConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/chatgate/chatgate.toml` (system-wide)
/// 3. `~/.config/chatgate/chatgate.toml` (user XDG config)
/// 4. `./chatgate.toml` (local directory)
/// 5. `CHATGATE_*` environment variables
pub fn load_config() -> Result<ChatgateConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<ChatgateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChatgateConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ChatgateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChatgateConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ChatgateConfig::default()))
        .merge(Toml::file("/etc/chatgate/chatgate.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("chatgate/chatgate.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("chatgate.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `CHATGATE_DISPATCH_TIMEOUT_SECS` must map to
/// `dispatch.timeout_secs`, not `dispatch.timeout.secs`.
fn env_provider() -> Env {
    Env::prefixed("CHATGATE_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    const NESTED: &[&str] = &[
        "backends_direct_",
        "backends_tool_",
        "backends_workflow_",
    ];
    const SECTIONS: &[&str] = &[
        "gateway_",
        "routing_",
        "dispatch_",
        "chunking_",
        "conversation_",
        "storage_",
        "metrics_",
    ];

    for prefix in NESTED {
        if let Some(rest) = key.strip_prefix(prefix) {
            let section = prefix.trim_end_matches('_').replacen('_', ".", 1);
            return format!("{section}.{rest}");
        }
    }
    for prefix in SECTIONS {
        if let Some(rest) = key.strip_prefix(prefix) {
            return format!("{}.{rest}", prefix.trim_end_matches('_'));
        }
    }
    key.to_string()
}
