//! Agent chat end to end: request body, streamed events folded into a session,
//! and single-flight submission.

use ken_core::api::ApiClient;
use ken_core::chat::{ChatSession, Role};
use ken_core::document::Chunk;
use ken_core::error::ChatError;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn event_body(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|l| format!("data: {l}\n\n"))
        .collect()
}

fn stream_response(lines: &[&str]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(event_body(lines), "text/event-stream")
}

#[tokio::test]
async fn streamed_text_accumulates_and_agent_id_sticks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent/query/stream"))
        .and(header("authorization", "Bearer s"))
        .and(body_json(json!({
            "workspace_id": "ws000001",
            "agent_id": null,
            "prompt": "summarize",
            "chunk_id": "c1",
            "chunk_content": "Revenue grew",
        })))
        .respond_with(stream_response(&[
            r#"{"type":"agent_id","agent_id":"X"}"#,
            r#"{"type":"text","content":"ab"}"#,
            r#"{"type":"agent_id","agent_id":"Y"}"#,
            r#"{"type":"text","content":"cd"}"#,
            r#"{"type":"text","content":"ef"}"#,
            r#"{"type":"done"}"#,
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiClient::new(server.uri(), Some("s".into())).unwrap();
    let chunk = Chunk {
        id: "c1".into(),
        markdown: "Revenue grew".into(),
    };
    let mut chat = ChatSession::new("ws000001");
    let query = chat.begin_request("summarize", Some(&chunk)).unwrap();
    let events = api.query_agent_stream(&query).await.unwrap();
    chat.consume(events).await;

    assert!(!chat.is_streaming());
    assert_eq!(chat.agent_id(), Some("X"));
    assert_eq!(chat.messages().len(), 2);
    assert_eq!(chat.messages()[1].role, Role::Assistant);
    assert_eq!(chat.messages()[1].content, "abcdef");
}

#[tokio::test]
async fn error_event_halts_the_stream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent/query/stream"))
        .respond_with(stream_response(&[
            r#"{"type":"text","content":"par"}"#,
            r#"{"type":"error","content":"Agent failed"}"#,
            r#"{"type":"text","content":"ignored"}"#,
        ]))
        .mount(&server)
        .await;

    let api = ApiClient::new(server.uri(), None).unwrap();
    let mut chat = ChatSession::new("ws000001");
    let query = chat.begin_request("go", None).unwrap();
    chat.consume(api.query_agent_stream(&query).await.unwrap()).await;

    let contents: Vec<(Role, &str)> = chat
        .messages()
        .iter()
        .map(|m| (m.role, m.content.as_str()))
        .collect();
    assert_eq!(
        contents,
        vec![
            (Role::User, "go"),
            (Role::Assistant, "par"),
            (Role::Error, "Agent failed"),
        ]
    );
}

#[tokio::test]
async fn second_prompt_is_rejected_while_streaming() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent/query/stream"))
        .respond_with(stream_response(&[
            r#"{"type":"text","content":"one"}"#,
            r#"{"type":"done"}"#,
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiClient::new(server.uri(), None).unwrap();
    let mut chat = ChatSession::new("ws000001");
    let query = chat.begin_request("first", None).unwrap();
    let events = api.query_agent_stream(&query).await.unwrap();

    assert_eq!(chat.begin_request("second", None), Err(ChatError::Busy));

    chat.consume(events).await;
    assert_eq!(chat.messages().len(), 2);
    assert!(!chat.is_streaming());
}

#[tokio::test]
async fn failed_request_surfaces_one_error_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent/query/stream"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let api = ApiClient::new(server.uri(), None).unwrap();
    let mut chat = ChatSession::new("ws000001");
    let query = chat.begin_request("hello", None).unwrap();
    let err = api.query_agent_stream(&query).await.err();
    assert!(err.is_some());
    chat.fail(ken_core::chat::SEND_FAILED);

    assert!(!chat.is_streaming());
    let last = chat.messages().last().unwrap();
    assert_eq!(last.role, Role::Error);
    assert_eq!(last.content, "Failed to send message");
}
