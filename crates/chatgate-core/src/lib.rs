// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the chatgate gateway.
//!
//! This crate provides the error taxonomy, the data model that flows between
//! classifier, dispatcher, stores, and wire adapters, and the collaborator
//! traits every backend and store implements.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ChatgateError;
pub use types::{
    AdapterType, CanonicalResponse, ChatMessage, Chunk, Conversation, ConversationId, Fragment,
    Generation, GenerationRequest, HealthStatus, ResponseFormat, Role, RoutingDecision, Tier,
    TokenUsage,
};

pub use traits::{CapabilityProvider, ConversationStore, FragmentStream, PluginAdapter};

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    use proptest::prelude::*;

    #[test]
    fn error_kinds_are_distinct() {
        let errors = [
            ChatgateError::Validation("empty".into()),
            ChatgateError::BackendUnavailable {
                tier: Tier::Direct,
                message: "down".into(),
            },
            ChatgateError::ConversationNotFound { id: "x".into() },
            ChatgateError::Timeout {
                duration: std::time::Duration::from_secs(30),
            },
            ChatgateError::Format("bad".into()),
            ChatgateError::provider("boom"),
            ChatgateError::Storage {
                source: Box::new(std::io::Error::other("disk")),
            },
            ChatgateError::Config("bad".into()),
            ChatgateError::Internal("bug".into()),
        ];
        let kinds: std::collections::HashSet<_> = errors.iter().map(|e| e.kind()).collect();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn backend_unavailable_names_tier() {
        let err = ChatgateError::BackendUnavailable {
            tier: Tier::Workflow,
            message: "all tiers failed".into(),
        };
        assert_eq!(
            err.to_string(),
            "backend unavailable for workflow tier: all tiers failed"
        );
    }

    #[test]
    fn tier_display_and_parse() {
        for tier in [Tier::Direct, Tier::Tool, Tier::Workflow] {
            assert_eq!(Tier::from_str(&tier.to_string()).unwrap(), tier);
        }
        assert_eq!(Tier::Tool.to_string(), "tool");
        assert_eq!(serde_json::to_string(&Tier::Workflow).unwrap(), "\"workflow\"");
    }

    #[test]
    fn role_round_trips_through_strum() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::from_str("assistant").unwrap(), Role::Assistant);
        assert!(Role::from_str("system").is_err());
    }

    #[test]
    fn conversation_id_rejects_malformed_input() {
        assert!(ConversationId::parse("not-a-real-id").is_none());
        assert!(ConversationId::parse("").is_none());
        assert!(ConversationId::parse("12345").is_none());
    }

    #[test]
    fn conversation_id_normalizes_case_and_whitespace() {
        let id = ConversationId::generate();
        let shouted = format!("  {}  ", id.as_str().to_uppercase());
        assert_eq!(ConversationId::parse(&shouted), Some(id));
    }

    #[test]
    fn generated_ids_do_not_collide() {
        let ids: std::collections::HashSet<_> =
            (0..1000).map(|_| ConversationId::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn response_format_selection_is_case_insensitive() {
        assert_eq!(ResponseFormat::select(Some("MINIMAL")), ResponseFormat::Minimal);
        assert_eq!(ResponseFormat::select(Some(" Minimal ")), ResponseFormat::Minimal);
        assert_eq!(ResponseFormat::select(Some("verbose")), ResponseFormat::Verbose);
    }

    #[test]
    fn response_format_defaults_to_verbose() {
        assert_eq!(ResponseFormat::select(None), ResponseFormat::Verbose);
        assert_eq!(ResponseFormat::select(Some("xml")), ResponseFormat::Verbose);
        assert!(matches!(
            ResponseFormat::parse("xml"),
            Err(ChatgateError::Format(_))
        ));
    }

    #[test]
    fn token_usage_total() {
        let usage = TokenUsage {
            input_tokens: 12,
            output_tokens: 30,
        };
        assert_eq!(usage.total(), 42);
    }

    #[test]
    fn token_usage_total_saturates() {
        let usage = TokenUsage {
            input_tokens: u32::MAX,
            output_tokens: 1,
        };
        assert_eq!(usage.total(), u32::MAX);
    }

    #[test]
    fn conversation_turns_counts_pairs() {
        let mut conv = Conversation::new(ConversationId::generate());
        conv.messages.push(ChatMessage::user("hi"));
        conv.messages.push(ChatMessage::assistant("hello"));
        conv.messages.push(ChatMessage::user("again"));
        assert_eq!(conv.turns(), 1);
    }

    proptest! {
        #[test]
        fn format_selection_never_fails(raw in ".*") {
            let format = ResponseFormat::select(Some(&raw));
            let expected = if raw.trim().eq_ignore_ascii_case("minimal") {
                ResponseFormat::Minimal
            } else {
                ResponseFormat::Verbose
            };
            prop_assert_eq!(format, expected);
        }
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_provider<T: CapabilityProvider>() {}
        fn _assert_store<T: ConversationStore>() {}
        fn _assert_plugin<T: PluginAdapter>() {}
    }
}
