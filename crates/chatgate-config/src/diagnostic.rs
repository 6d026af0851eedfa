// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge with fuzzy match suggestions.
//!
//! Turns Figment deserialization errors into miette diagnostics that point at
//! the offending key in the TOML source and suggest the closest valid key.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity for a "did you mean" suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error with rich diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// An unknown key was found in the configuration.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(chatgate::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A configuration value has the wrong type.
    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(chatgate::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    /// A required configuration key is missing.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(chatgate::config::missing_key),
        help("add `{key} = <value>` to your chatgate.toml")
    )]
    MissingKey { key: String },

    /// A value parsed but violates a semantic constraint.
    #[error("validation error: {message}")]
    #[diagnostic(code(chatgate::config::validation))]
    Validation { message: String },

    /// Catch-all for other configuration errors.
    #[error("configuration error: {0}")]
    #[diagnostic(code(chatgate::config::other))]
    Other(String),
}

impl ConfigError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        ConfigError::Validation {
            message: message.into(),
        }
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Convert a `figment::Error` (which may hold several errors) into diagnostics.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(field, expected) => {
                let valid_keys: Vec<&str> = expected.to_vec();
                let (span, src) = locate(&error, field, toml_sources);
                ConfigError::UnknownKey {
                    key: field.clone(),
                    suggestion: suggest_key(field, &valid_keys),
                    valid_keys: valid_keys.join(", "),
                    span,
                    src,
                }
            }
            Kind::MissingField(field) => ConfigError::MissingKey {
                key: field.clone().into_owned(),
            },
            Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                key: error.path.join("."),
                detail: format!("found {actual}, expected {expected}"),
                expected: expected.to_string(),
            },
            _ => ConfigError::Other(error.to_string()),
        })
        .collect()
}

/// Resolve the TOML file and byte span an error points at, when the source is a file.
fn locate(
    error: &figment::error::Error,
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    let Some((path, content)) = origin.and_then(|origin| {
        toml_sources
            .iter()
            .find(|(p, _)| *p == origin)
            .map(|(p, c)| (p.clone(), c.clone()))
    }) else {
        return (None, None);
    };

    match find_key_offset(&content, &error.path, field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(path, content)),
        ),
        None => (None, None),
    }
}

/// Find the byte offset of `field` in TOML content, relative to a section path.
///
/// For `path = ["backends", "direct"]` the search starts after the
/// `[backends.direct]` header; for an empty path it starts at the top.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let search_start = if path.is_empty() {
        0
    } else {
        let header = format!("[{}]", path.join("."));
        content.find(&header).map(|pos| pos + header.len())?
    };

    let mut offset = search_start;
    for line in content[search_start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(after) = trimmed.strip_prefix(field)
            && (after.starts_with([' ', '\t', '=']))
        {
            return Some(offset + (line.len() - trimmed.len()));
        }
        offset += line.len();
    }
    None
}

/// Suggest the most similar valid key above [`SUGGESTION_THRESHOLD`].
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Render diagnostics to stderr using miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        let diagnostic: &dyn Diagnostic = error;
        if handler.render_report(&mut buf, diagnostic).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_timeout_secs_for_typo() {
        let valid = &["timeout_secs", "fallback_to_direct"];
        assert_eq!(
            suggest_key("timout_secs", valid),
            Some("timeout_secs".to_string())
        );
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        let valid = &["min_chars", "preferred_max_chars", "max_chars"];
        assert_eq!(suggest_key("zzzzzz", valid), None);
    }

    #[test]
    fn find_key_offset_in_nested_section() {
        let content = "[gateway]\nport = 1\n\n[backends.direct]\nmodle = \"x\"\n";
        let path = vec!["backends".to_string(), "direct".to_string()];
        let o = find_key_offset(content, &path, "modle").unwrap();
        assert_eq!(&content[o..o + 5], "modle");
    }

    #[test]
    fn find_key_offset_missing_section() {
        let content = "[gateway]\nport = 1\n";
        let path = vec!["routing".to_string()];
        assert_eq!(find_key_offset(content, &path, "workflows"), None);
    }
}
