// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend dispatch: fallback, timeouts, and exactly-once persistence.

use std::collections::BTreeSet;
use std::time::Duration;

use chatgate_agent::ChatRequest;
use chatgate_core::{ChatgateError, ConversationId, Role, Tier};
use chatgate_test_utils::{Script, TestHarness};

fn caps(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn workflow_request(message: &str) -> ChatRequest {
    ChatRequest {
        workflow_hint: Some("research".to_string()),
        ..ChatRequest::new(message)
    }
}

fn tool_request(message: &str) -> ChatRequest {
    ChatRequest {
        requested_capabilities: caps(&["toolA"]),
        ..ChatRequest::new(message)
    }
}

async fn message_count(h: &TestHarness, id: &ConversationId) -> usize {
    h.store
        .get(id)
        .await
        .unwrap()
        .map_or(0, |c| c.messages.len())
}

#[tokio::test]
async fn direct_tier_answers_plain_messages() {
    let h = TestHarness::new();
    h.direct.push(Script::reply("hi there")).await;

    let response = h.chat("hello").await.unwrap();
    assert_eq!(response.content, "hi there");
    assert_eq!(response.backend_tier, Tier::Direct);
    assert_eq!(response.requested_tier, Tier::Direct);
    assert!(!response.fallback);
    assert_eq!(response.provider, "direct");
    assert_eq!(h.tool.calls() + h.workflow.calls(), 0);
}

#[tokio::test]
async fn each_tier_reaches_its_own_backend() {
    let h = TestHarness::new();
    let tool = h.pipeline.handle(tool_request("x")).await.unwrap();
    let workflow = h.pipeline.handle(workflow_request("x")).await.unwrap();
    assert_eq!(tool.backend_tier, Tier::Tool);
    assert_eq!(workflow.backend_tier, Tier::Workflow);
    assert_eq!((h.direct.calls(), h.tool.calls(), h.workflow.calls()), (0, 1, 1));
}

#[tokio::test]
async fn workflow_failure_falls_back_to_direct_and_appends_once() {
    let h = TestHarness::new();
    h.workflow.push(Script::fail("workflow exploded")).await;
    h.direct.push(Script::reply("plain answer")).await;

    let response = h.pipeline.handle(workflow_request("plan a trip")).await.unwrap();
    assert!(response.fallback);
    assert_eq!(response.requested_tier, Tier::Workflow);
    assert_eq!(response.backend_tier, Tier::Direct);
    assert_eq!(response.content, "plain answer");

    let conversation = h.store.get(&response.conversation_id).await.unwrap().unwrap();
    assert_eq!(conversation.messages.len(), 2);
    assert_eq!(conversation.messages[0].role, Role::User);
    assert_eq!(conversation.messages[0].content, "plan a trip");
    assert_eq!(conversation.messages[1].content, "plain answer");
}

#[tokio::test(start_paused = true)]
async fn tool_timeout_falls_back_to_direct() {
    let h = TestHarness::builder()
        .with_timeout(Duration::from_secs(2))
        .build();
    h.tool.push(Script::Hang).await;

    let response = h.pipeline.handle(tool_request("x")).await.unwrap();
    assert!(response.fallback);
    assert_eq!(response.backend_tier, Tier::Direct);
}

#[tokio::test]
async fn unavailable_backend_is_not_called() {
    let h = TestHarness::new();
    h.workflow.set_available(false);

    let response = h.pipeline.handle(workflow_request("x")).await.unwrap();
    assert!(response.fallback);
    assert_eq!(h.workflow.calls(), 0);
    assert_eq!(h.direct.calls(), 1);
}

#[tokio::test]
async fn empty_output_counts_as_failure() {
    let h = TestHarness::new();
    h.tool.push(Script::Empty).await;

    let response = h.pipeline.handle(tool_request("x")).await.unwrap();
    assert!(response.fallback);
    assert_eq!(response.content, "mock response");
}

#[tokio::test]
async fn unconfigured_tier_falls_back() {
    let h = TestHarness::builder().without_tool().build();
    let response = h.pipeline.handle(tool_request("x")).await.unwrap();
    assert!(response.fallback);
    assert_eq!(response.requested_tier, Tier::Tool);
}

#[tokio::test]
async fn second_failure_is_backend_unavailable_without_append() {
    let h = TestHarness::new();
    h.workflow.push(Script::fail("first")).await;
    h.direct.push(Script::fail("second")).await;

    let err = h
        .pipeline
        .handle(workflow_request("x"))
        .await
        .unwrap_err();
    match err {
        ChatgateError::BackendUnavailable { tier, message } => {
            assert_eq!(tier, Tier::Workflow);
            assert!(message.contains("first"));
            assert!(message.contains("second"));
        }
        other => panic!("expected BackendUnavailable, got {other:?}"),
    }
    assert_eq!(h.direct.calls(), 1, "exactly one fallback attempt");
}

#[tokio::test]
async fn direct_failure_is_not_retried() {
    let h = TestHarness::new();
    h.direct.push(Script::fail("down")).await;

    let err = h.chat("hello").await.unwrap_err();
    assert!(matches!(err, ChatgateError::BackendUnavailable { tier: Tier::Direct, .. }));
    assert_eq!(h.direct.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn direct_timeout_surfaces_as_timeout() {
    let h = TestHarness::builder()
        .with_timeout(Duration::from_secs(1))
        .build();
    h.direct.push(Script::Hang).await;

    let err = h.chat("hello").await.unwrap_err();
    assert!(matches!(err, ChatgateError::Timeout { .. }), "got {err:?}");
}

#[tokio::test]
async fn fallback_can_be_disabled() {
    let h = TestHarness::builder().without_fallback().build();
    h.tool.push(Script::fail("nope")).await;

    let err = h.pipeline.handle(tool_request("x")).await.unwrap_err();
    assert!(matches!(err, ChatgateError::BackendUnavailable { tier: Tier::Tool, .. }));
    assert_eq!(h.direct.calls(), 0);
}

#[tokio::test]
async fn failed_turn_on_existing_conversation_leaves_log_untouched() {
    let h = TestHarness::new();
    let first = h.chat("one").await.unwrap();
    h.direct.push(Script::fail("down")).await;

    assert!(h.chat_in(first.conversation_id.as_str(), "two").await.is_err());
    assert_eq!(message_count(&h, &first.conversation_id).await, 2);
}

#[tokio::test]
async fn provider_sees_history_and_capabilities() {
    let h = TestHarness::new();
    let first = h.chat("remember me").await.unwrap();

    h.pipeline
        .handle(ChatRequest {
            conversation_id: Some(first.conversation_id.to_string()),
            requested_capabilities: caps(&["toolA"]),
            ..ChatRequest::new("now use a tool")
        })
        .await
        .unwrap();

    let seen = h.tool.last_request().await.unwrap();
    assert_eq!(seen.conversation.messages.len(), 2);
    assert_eq!(seen.conversation.messages[0].content, "remember me");
    assert!(seen.capabilities.contains("toolA"));
    assert_eq!(seen.message, "now use a tool");
}

#[tokio::test]
async fn usage_is_carried_into_the_response() {
    let h = TestHarness::new();
    let response = h.chat("hello").await.unwrap();
    let usage = response.usage.unwrap();
    assert_eq!(usage.total(), 30);
    assert_eq!(response.model, "direct-model");
}
