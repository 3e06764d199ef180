//! Backend client against a mock server.
//!
//! Exercises: envelope decoding, bearer credentials, status errors, missing
//! entities, multipart workspace creation and download content resolution.

use ken_core::api::ApiClient;
use ken_core::document::DocumentContent;
use ken_core::error::ApiError;
use ken_core::pending::{PendingWorkspace, UploadFile};
use ken_core::types::Document;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "test-secret";

fn envelope(response: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "status": 200, "response": response }))
}

fn document(id: &str, file_path: &str) -> Document {
    Document {
        id: id.into(),
        workspace_id: "ws000001".into(),
        doc_type: "10_K".into(),
        file_path: file_path.into(),
        filing_date: None,
        reporting_date: None,
        doc_id: None,
    }
}

#[tokio::test]
async fn search_sends_query_and_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search_listed"))
        .and(query_param("query", "apple"))
        .and(header("authorization", "Bearer test-secret"))
        .respond_with(envelope(json!([{ "symbol": "AAPL", "name": "Apple Inc." }])))
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiClient::new(server.uri(), Some(SECRET.into())).unwrap();
    let results = api.search_listed("apple").await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].symbol, "AAPL");
}

#[tokio::test]
async fn null_response_is_empty_list_or_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/workspace"))
        .respond_with(envelope(serde_json::Value::Null))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/workspace/nope1234"))
        .respond_with(envelope(serde_json::Value::Null))
        .mount(&server)
        .await;

    let api = ApiClient::new(server.uri(), Some(SECRET.into())).unwrap();
    assert!(api.list_workspaces().await.unwrap().is_empty());
    let err = api.get_workspace("nope1234").await.unwrap_err();
    assert_eq!(err.to_string(), "Workspace not found");
}

#[tokio::test]
async fn non_success_status_carries_reason_phrase() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/documents"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let api = ApiClient::new(server.uri(), None).unwrap();
    let err = api.list_documents("ws000001").await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 500, .. }));
    assert_eq!(err.to_string(), "API Error: Internal Server Error");
}

#[tokio::test]
async fn create_workspace_is_multipart_without_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/create_workspace"))
        .respond_with(envelope(json!({
            "workspace": { "id": "ws000001", "name": "AAPL", "ticker": "AAPL" },
            "documents": [{
                "id": "d1",
                "workspace_id": "ws000001",
                "doc_type": "10_K",
                "file_path": "/data/d1.txt"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiClient::new(server.uri(), Some(SECRET.into())).unwrap();
    let pending = PendingWorkspace {
        workspace_id: "ws000001".into(),
        ticker: Some("AAPL".into()),
        file: Some(UploadFile {
            name: "notes.txt".into(),
            bytes: b"hello".to_vec(),
        }),
    };
    let created = api.create_workspace(&pending).await.unwrap();
    assert_eq!(created.workspace.id, "ws000001");
    assert_eq!(created.documents.len(), 1);

    let requests = server.received_requests().await.unwrap();
    let request = &requests[0];
    assert!(!request.headers.contains_key("authorization"));
    let body = String::from_utf8_lossy(&request.body);
    assert!(body.contains("name=\"workspace_id\""));
    assert!(body.contains("ws000001"));
    assert!(body.contains("name=\"ticker\""));
    assert!(body.contains("filename=\"notes.txt\""));
}

#[tokio::test]
async fn download_resolves_each_content_kind() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/documents/pdf1/download"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(&b"%PDF-1.7"[..], "application/pdf"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/documents/json1/download"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            json!({ "markdown": "<a id=\"c1\"></a>Revenue", "chunks": [{ "id": "c1", "markdown": "Revenue" }] })
                .to_string(),
            "application/json",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/documents/txt1/download"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("line one\nline two", "text/plain"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/documents/img1/download"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(&b"\x89PNG"[..], "image/png"))
        .mount(&server)
        .await;

    let api = ApiClient::new(server.uri(), Some(SECRET.into())).unwrap();

    let pdf = api.download_document(&document("pdf1", "a.pdf")).await.unwrap();
    assert!(matches!(pdf, DocumentContent::Pdf(ref b) if &b[..] == b"%PDF-1.7"));

    let parsed = api.download_document(&document("json1", "b.htm")).await.unwrap();
    let DocumentContent::StructuredText(parsed) = parsed else {
        panic!("expected structured text");
    };
    assert_eq!(parsed.chunks.len(), 1);

    let text = api.download_document(&document("txt1", "c.txt")).await.unwrap();
    assert!(matches!(text, DocumentContent::PlainText(ref t) if t == "line one\nline two"));

    let err = api.download_document(&document("img1", "d.png")).await.unwrap_err();
    assert!(matches!(err, ApiError::UnsupportedContentType(_)));
}

#[tokio::test]
async fn activities_decode() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/activity"))
        .and(query_param("workspace_id", "ws000001"))
        .respond_with(envelope(json!([{
            "id": "a1",
            "workspace_id": "ws000001",
            "category": "workspace",
            "status": 201,
            "title": "Workspace created",
            "message": "2 documents",
            "created_at": "2024-06-10T11:00:00"
        }])))
        .mount(&server)
        .await;

    let api = ApiClient::new(server.uri(), Some(SECRET.into())).unwrap();
    let activities = api.list_activities("ws000001").await.unwrap();
    assert_eq!(activities[0].title, "Workspace created");
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let api = ApiClient::new("http://127.0.0.1:9", None).unwrap();
    let err = api.list_workspaces().await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
}
