// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming turns: event order, chunking, and persistence on completion only.

use std::collections::BTreeSet;
use std::time::Duration;

use chatgate_agent::{ChatRequest, TurnEvent};
use chatgate_config::model::ChunkingConfig;
use chatgate_core::{ChatgateError, ConversationId, Tier};
use chatgate_test_utils::{Script, TestHarness};
use futures::StreamExt;

fn small_chunks() -> ChunkingConfig {
    ChunkingConfig {
        min_chars: 5,
        preferred_max_chars: 20,
        max_chars: 40,
    }
}

fn tool_request(message: &str) -> ChatRequest {
    ChatRequest {
        requested_capabilities: BTreeSet::from(["toolA".to_string()]),
        ..ChatRequest::new(message)
    }
}

async fn collect(h: &TestHarness, request: ChatRequest) -> Vec<Result<TurnEvent, ChatgateError>> {
    h.pipeline
        .handle_stream(request)
        .await
        .unwrap()
        .collect()
        .await
}

fn started_id(events: &[Result<TurnEvent, ChatgateError>]) -> ConversationId {
    match &events[0] {
        Ok(TurnEvent::Started {
            conversation_id, ..
        }) => conversation_id.clone(),
        other => panic!("first event must be Started, got {other:?}"),
    }
}

#[tokio::test]
async fn stream_emits_started_chunks_then_completed() {
    let h = TestHarness::builder().with_chunking(small_chunks()).build();
    h.direct
        .push(Script::Fragments(vec![
            "Hello there. ".into(),
            "This is a streamed ".into(),
            "answer. Bye".into(),
        ]))
        .await;

    let events = collect(&h, ChatRequest::new("hi")).await;
    let id = started_id(&events);

    let chunks: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            Ok(TurnEvent::Chunk(c)) => Some(c.text.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        chunks,
        ["Hello there.", "This is a streamed answer.", "Bye"]
    );

    let Some(Ok(TurnEvent::Completed(response))) = events.last() else {
        panic!("last event must be Completed");
    };
    assert_eq!(response.content, "Hello there. This is a streamed answer. Bye");
    assert_eq!(response.conversation_id, id);
    assert_eq!(response.usage.unwrap().total(), 30);

    let stored = h.store.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.messages.len(), 2);
    assert_eq!(stored.messages[1].content, response.content);
}

#[tokio::test]
async fn only_the_last_chunk_is_final() {
    let h = TestHarness::builder().with_chunking(small_chunks()).build();
    h.direct
        .push(Script::reply("One sentence here. Another one follows. And the end."))
        .await;

    let events = collect(&h, ChatRequest::new("hi")).await;
    let finals: Vec<bool> = events
        .iter()
        .filter_map(|e| match e {
            Ok(TurnEvent::Chunk(c)) => Some(c.is_final),
            _ => None,
        })
        .collect();
    assert!(finals.len() >= 2);
    assert!(finals.last().copied().unwrap());
    assert!(finals[..finals.len() - 1].iter().all(|f| !f));
}

#[tokio::test]
async fn mid_stream_failure_ends_with_error_and_persists_nothing() {
    let h = TestHarness::builder().with_chunking(small_chunks()).build();
    h.direct
        .push(Script::FailAfter(
            vec!["Partial sentence one. ".into(), "More text".into()],
            "connection reset".into(),
        ))
        .await;

    let events = collect(&h, ChatRequest::new("hi")).await;
    let id = started_id(&events);
    assert!(matches!(
        events.last(),
        Some(Err(ChatgateError::BackendUnavailable { .. }))
    ));
    assert!(
        events
            .iter()
            .all(|e| !matches!(e, Ok(TurnEvent::Completed(_))))
    );
    assert!(h.store.get(&id).await.unwrap().is_none());
    assert_eq!(h.direct.calls(), 1, "no fallback after text was released");
}

#[tokio::test]
async fn stream_open_failure_falls_back_to_direct() {
    let h = TestHarness::new();
    h.tool.push(Script::fail("tool is down")).await;
    h.direct.push(Script::reply("fallback text.")).await;

    let events = collect(&h, tool_request("x")).await;
    let Some(Ok(TurnEvent::Completed(response))) = events.last() else {
        panic!("expected Completed, got {:?}", events.last());
    };
    assert!(response.fallback);
    assert_eq!(response.requested_tier, Tier::Tool);
    assert_eq!(response.backend_tier, Tier::Direct);
    assert_eq!(response.content, "fallback text.");
}

#[tokio::test]
async fn empty_stream_counts_as_failure() {
    let h = TestHarness::new();
    h.tool.push(Script::Empty).await;

    let events = collect(&h, tool_request("x")).await;
    let Some(Ok(TurnEvent::Completed(response))) = events.last() else {
        panic!("expected Completed");
    };
    assert!(response.fallback);
}

#[tokio::test(start_paused = true)]
async fn stalled_stream_times_out() {
    let h = TestHarness::builder()
        .with_timeout(Duration::from_secs(1))
        .build();
    h.direct.push(Script::Hang).await;

    let events = collect(&h, ChatRequest::new("hi")).await;
    assert!(matches!(events[0], Ok(TurnEvent::Started { .. })));
    assert!(matches!(
        events.last(),
        Some(Err(ChatgateError::Timeout { .. }))
    ));
}

#[tokio::test]
async fn validation_errors_are_returned_before_streaming() {
    let h = TestHarness::new();
    let result = h.pipeline.handle_stream(ChatRequest::new("  ")).await;
    assert!(matches!(result, Err(ChatgateError::Validation(_))));
    assert_eq!(h.direct.calls(), 0);
}

#[tokio::test]
async fn dropped_stream_persists_nothing() {
    let h = TestHarness::builder().with_chunking(small_chunks()).build();
    h.direct
        .push(Script::reply("First full sentence here. Second sentence here too."))
        .await;

    let mut stream = h.pipeline.handle_stream(ChatRequest::new("hi")).await.unwrap();
    let id = match stream.next().await {
        Some(Ok(TurnEvent::Started {
            conversation_id, ..
        })) => conversation_id,
        other => panic!("unexpected {other:?}"),
    };
    assert!(matches!(stream.next().await, Some(Ok(TurnEvent::Chunk(_)))));
    drop(stream);

    assert!(h.store.get(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn streamed_turn_continues_an_existing_conversation() {
    let h = TestHarness::new();
    let first = h.chat("first").await.unwrap();

    let events = collect(
        &h,
        ChatRequest {
            conversation_id: Some(first.conversation_id.to_string()),
            ..ChatRequest::new("second")
        },
    )
    .await;
    assert_eq!(started_id(&events), first.conversation_id);

    let stored = h.store.get(&first.conversation_id).await.unwrap().unwrap();
    assert_eq!(stored.messages.len(), 4);
    assert_eq!(stored.messages[2].content, "second");
}
