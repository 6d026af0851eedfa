// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express: chunk window ordering,
//! non-empty backend endpoints, non-zero timeouts.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::{BackendConfig, ChatgateConfig, StorageBackend};

/// Validate a deserialized configuration.
///
/// Collects every violation instead of stopping at the first one.
pub fn validate_config(config: &ChatgateConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::validation("gateway.host must not be empty"));
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        errors.push(ConfigError::validation(format!(
            "gateway.host `{host}` is not a valid IP address or hostname"
        )));
    }

    const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
    if !LOG_LEVELS.contains(&config.gateway.log_level.to_lowercase().as_str()) {
        errors.push(ConfigError::validation(format!(
            "gateway.log_level `{}` must be one of: {}",
            config.gateway.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    let chunking = &config.chunking;
    if chunking.min_chars == 0 {
        errors.push(ConfigError::validation("chunking.min_chars must be at least 1"));
    }
    if chunking.min_chars > chunking.preferred_max_chars
        || chunking.preferred_max_chars > chunking.max_chars
    {
        errors.push(ConfigError::validation(format!(
            "chunking window must satisfy min_chars <= preferred_max_chars <= max_chars, got {} / {} / {}",
            chunking.min_chars, chunking.preferred_max_chars, chunking.max_chars
        )));
    }

    if config.dispatch.timeout_secs == 0 {
        errors.push(ConfigError::validation("dispatch.timeout_secs must be greater than 0"));
    }

    for (i, set) in config.routing.complex_combinations.iter().enumerate() {
        if set.is_empty() || set.iter().any(|c| c.trim().is_empty()) {
            errors.push(ConfigError::validation(format!(
                "routing.complex_combinations[{i}] must be a non-empty list of non-empty capability names"
            )));
        }
    }

    let mut seen = HashSet::new();
    for name in &config.routing.workflows {
        let normalized = name.trim().to_lowercase();
        if normalized.is_empty() {
            errors.push(ConfigError::validation("routing.workflows entries must not be empty"));
        } else if !seen.insert(normalized) {
            errors.push(ConfigError::validation(format!(
                "duplicate workflow name `{name}` in routing.workflows"
            )));
        }
    }

    if config.storage.backend == StorageBackend::Sqlite
        && config.storage.database_path.trim().is_empty()
    {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty when storage.backend = \"sqlite\"",
        ));
    }

    validate_backend("backends.direct", &config.backends.direct, &mut errors);
    if let Some(tool) = &config.backends.tool {
        validate_backend("backends.tool", tool, &mut errors);
    }
    if let Some(workflow) = &config.backends.workflow {
        validate_backend("backends.workflow", workflow, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_backend(section: &str, backend: &BackendConfig, errors: &mut Vec<ConfigError>) {
    let url = backend.base_url.trim();
    if url.is_empty() {
        errors.push(ConfigError::validation(format!("{section}.base_url must not be empty")));
    } else if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(ConfigError::validation(format!(
            "{section}.base_url `{url}` must start with http:// or https://"
        )));
    }
    if backend.model.trim().is_empty() {
        errors.push(ConfigError::validation(format!("{section}.model must not be empty")));
    }
    if backend.max_tokens == Some(0) {
        errors.push(ConfigError::validation(format!(
            "{section}.max_tokens must be greater than 0 when set"
        )));
    }
}
