// SPDX-FileCopyrightText: 2026 Chatgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: HTTP router, pipeline, SQLite store, and the
//! OpenAI-compatible provider talking to a wiremock backend.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use chatgate_agent::{BackendDispatcher, ChatPipeline, TierBackends};
use chatgate_config::model::{
    BackendConfig, ChatgateConfig, DispatchConfig, StorageBackend, StorageConfig,
};
use chatgate_core::{ConversationId, ConversationStore};
use chatgate_gateway::{GatewayState, HealthState, build_router};
use chatgate_openai::OpenAiProvider;
use chatgate_router::TierClassifier;
use chatgate_storage::SqliteConversationStore;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Stack {
    app: Router,
    store: Arc<dyn ConversationStore>,
    _dir: tempfile::TempDir,
}

fn backend(server: &MockServer, model: &str) -> BackendConfig {
    BackendConfig {
        base_url: format!("{}/v1", server.uri()),
        model: model.to_string(),
        max_retries: 0,
        ..BackendConfig::default()
    }
}

fn completion(text: &str) -> Value {
    json!({
        "model": "served-model",
        "choices": [{"message": {"role": "assistant", "content": text}, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": 9, "completion_tokens": 4}
    })
}

async fn stack(server: &MockServer) -> Stack {
    let dir = tempfile::tempdir().unwrap();
    let storage = StorageConfig {
        backend: StorageBackend::Sqlite,
        database_path: dir.path().join("chatgate.db").display().to_string(),
        wal_mode: true,
    };
    let store: Arc<dyn ConversationStore> =
        Arc::new(SqliteConversationStore::open(&storage).await.unwrap());

    let config: ChatgateConfig = chatgate_config::load_and_validate_str(
        r#"
        [routing]
        workflows = ["research"]
        "#,
    )
    .unwrap();

    let direct = OpenAiProvider::new("direct", &backend(server, "direct-model")).unwrap();
    let workflow = OpenAiProvider::new("workflow", &backend(server, "workflow-model")).unwrap();
    let backends =
        TierBackends::new(Arc::new(direct)).with_workflow(Arc::new(workflow));

    let dispatcher = BackendDispatcher::new(
        backends,
        store.clone(),
        &DispatchConfig {
            timeout_secs: 10,
            fallback_to_direct: true,
        },
    );
    let pipeline = ChatPipeline::new(TierClassifier::new(&config.routing), dispatcher, store.clone())
        .with_chunking(config.chunking);

    let app = build_router(
        GatewayState {
            pipeline,
            health: HealthState::new("e2e"),
        },
        false,
    );
    Stack {
        app,
        store,
        _dir: dir,
    }
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Vec<u8>) {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn turns_reach_the_backend_with_history_and_persist() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"model": "direct-model"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Paris.")))
        .mount(&server)
        .await;
    let s = stack(&server).await;

    let (status, body) = post(&s.app, "/v1/chat", json!({"message": "Capital of France?"})).await;
    assert_eq!(status, StatusCode::OK);
    let first: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(first["choices"][0]["message"]["content"], "Paris.");
    assert_eq!(first["model"], "served-model");
    assert_eq!(first["usage"]["total_tokens"], 13);
    let id = first["metadata"]["conversation_id"].as_str().unwrap().to_string();

    let (status, body) = post(
        &s.app,
        "/v1/chat?format=minimal",
        json!({"message": "And of Spain?", "conversation_id": id}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let second: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(second, json!({"response": "Paris.", "conversation_id": id}));

    let requests = server.received_requests().await.unwrap();
    let last: Value = serde_json::from_slice(&requests.last().unwrap().body).unwrap();
    let roles: Vec<&str> = last["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, ["user", "assistant", "user"]);

    let stored = s
        .store
        .get(&ConversationId::parse(&id).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.messages.len(), 4);
    assert_eq!(stored.messages[2].content, "And of Spain?");
}

#[tokio::test]
async fn failing_workflow_backend_falls_back_to_direct() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"model": "workflow-model"})))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "unknown workflow", "type": "invalid_request_error"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"model": "direct-model"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Plain answer.")))
        .mount(&server)
        .await;
    let s = stack(&server).await;

    let (status, body) = post(
        &s.app,
        "/v1/chat",
        json!({"message": "Plan a study", "workflow_hint": "Research"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let wire: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(wire["metadata"]["requested_tier"], "workflow");
    assert_eq!(wire["metadata"]["tier"], "direct");
    assert_eq!(wire["metadata"]["fallback"], true);
    assert_eq!(wire["provider"], "direct");
}

#[tokio::test]
async fn all_backends_down_is_503_and_nothing_is_stored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    let s = stack(&server).await;

    let (status, body) = post(
        &s.app,
        "/v1/chat",
        json!({"message": "hi", "workflow_hint": "research"}),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let wire: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(wire["error"]["kind"], "backend_unavailable");
}

#[tokio::test]
async fn streamed_turn_is_chunked_and_persisted() {
    let server = MockServer::start().await;
    let sse = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"The first sentence is comfortably longer than fifty \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"characters in total. Then \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"a short ending.\"}}]}\n\n",
        "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":5,\"completion_tokens\":15}}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse),
        )
        .mount(&server)
        .await;
    let s = stack(&server).await;

    let (status, body) = post(
        &s.app,
        "/v1/chat?format=minimal",
        json!({"message": "Tell me something", "stream": true}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let text = String::from_utf8(body).unwrap();
    let events: Vec<(String, Value)> = text
        .split("\n\n")
        .filter_map(|block| {
            let name = block.lines().find_map(|l| l.strip_prefix("event:"))?;
            let data = block.lines().find_map(|l| l.strip_prefix("data:"))?;
            Some((name.trim().to_string(), serde_json::from_str(data.trim()).unwrap()))
        })
        .collect();

    let names: Vec<&str> = events.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["metadata", "chunk", "chunk", "done"]);
    assert_eq!(
        events[1].1["response"],
        "The first sentence is comfortably longer than fifty characters in total."
    );
    assert_eq!(events[2].1["response"], "Then a short ending.");

    let id = events[0].1["conversation_id"].as_str().unwrap();
    let stored = s
        .store
        .get(&ConversationId::parse(id).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.messages.len(), 2);
    assert_eq!(
        stored.messages[1].content,
        "The first sentence is comfortably longer than fifty characters in total. Then a short ending."
    );
}
