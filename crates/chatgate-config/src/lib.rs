// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the chatgate gateway.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, environment variable overrides, and miette
//! diagnostics with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use chatgate_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("listening on {}:{}", config.gateway.host, config.gateway.port);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::ChatgateConfig;

/// Load configuration from the XDG hierarchy and validate it.
///
/// Returns either a valid `ChatgateConfig` or every diagnostic found.
pub fn load_and_validate() -> Result<ChatgateConfig, Vec<ConfigError>> {
    finish(loader::load_config(), collect_toml_sources)
}

/// Load configuration from one explicit file (plus env overrides) and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<ChatgateConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_path(path), || {
        std::fs::read_to_string(path)
            .map(|content| vec![(path.display().to_string(), content)])
            .unwrap_or_default()
    })
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<ChatgateConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

fn finish(
    loaded: Result<ChatgateConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<ChatgateConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources())),
    }
}

/// Collect TOML source file contents for error span resolution.
fn collect_toml_sources() -> Vec<(String, String)> {
    let mut candidates = vec![std::env::current_dir()
        .map(|d| d.join("chatgate.toml"))
        .unwrap_or_else(|_| "chatgate.toml".into())];
    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join("chatgate/chatgate.toml"));
    }
    candidates.push("/etc/chatgate/chatgate.toml".into());

    candidates
        .into_iter()
        .filter_map(|path| {
            std::fs::read_to_string(&path)
                .ok()
                .map(|content| (path.display().to_string(), content))
        })
        .collect()
}
