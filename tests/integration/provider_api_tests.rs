/*!
 * Integration tests for the OpenAI-compatible client against a local stub server
 */

use pagetran::errors::NetworkError;
use pagetran::providers::TranslationClient;
use pagetran::providers::openai::OpenAICompatible;
use pagetran::translation::planner::Batch;
use pagetran::translation::{PageRecord, PromptBuilder, ResponseParser};

use crate::common::{self, StubServer};

fn client(url: &str, api_key: &str, timeout_secs: u64) -> OpenAICompatible {
    let prompts = PromptBuilder::new(
        "Translate {source_language} to {target_language}. Context: {context}\n{batch_content}",
        "English",
        "German",
    );
    OpenAICompatible::new(url, "test-model", api_key, timeout_secs, prompts).unwrap()
}

fn batch() -> Batch {
    Batch {
        index: 0,
        items: vec![PageRecord::new(1, "Good morning"), PageRecord::new(2, "Good night")],
        context: "previous page".to_string(),
    }
}

#[tokio::test]
async fn test_translate_withValidReply_shouldReturnTrimmedContent() {
    let reply = r#"[{"page": 1, "translated_text": "Guten Morgen"}, {"page": 2, "translated_text": "Gute Nacht"}]"#;
    let server = StubServer::start("200 OK", common::chat_body(&format!("\n{}\n", reply))).await;

    let raw = client(&server.url, "", 5).translate(&batch()).await.unwrap();
    assert_eq!(raw, reply);

    let pages = ResponseParser::default().parse(&raw).unwrap();
    assert_eq!(pages[&2], "Gute Nacht");
}

#[tokio::test]
async fn test_translate_shouldSendModelPromptAndBearerToken() {
    let server = StubServer::start("200 OK", common::chat_body("ok")).await;

    client(&server.url, "sk-test", 5).translate(&batch()).await.unwrap();

    let requests = server.requests.lock().clone();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert!(request.starts_with("POST /v1/chat/completions"));
    assert!(request.to_lowercase().contains("authorization: bearer sk-test"));
    assert!(request.contains(r#""model":"test-model""#));
    assert!(request.contains(r#""role":"user""#));
    assert!(request.contains("Translate English to German. Context: previous page"));
    assert!(request.contains("Good morning"));
}

#[tokio::test]
async fn test_translate_withoutApiKey_shouldOmitAuthorization() {
    let server = StubServer::start("200 OK", common::chat_body("ok")).await;

    client(&server.url, "", 5).translate(&batch()).await.unwrap();

    let requests = server.requests.lock().clone();
    assert!(!requests[0].to_lowercase().contains("authorization:"));
}

#[tokio::test]
async fn test_translate_withServerError_shouldReturnStatus() {
    let server = StubServer::start("503 Service Unavailable", r#"{"error":"overloaded"}"#).await;

    let err = client(&server.url, "", 5).translate(&batch()).await.unwrap_err();
    match err {
        NetworkError::Status { status_code, message } => {
            assert_eq!(status_code, 503);
            assert!(message.contains("overloaded"));
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_translate_withMissingContent_shouldReturnInvalidBody() {
    let server = StubServer::start("200 OK", r#"{"choices": []}"#).await;

    let err = tokio_test::assert_err!(client(&server.url, "", 5).translate(&batch()).await);
    assert!(matches!(err, NetworkError::InvalidBody(_)));
}

#[tokio::test]
async fn test_translate_withNonJsonBody_shouldReturnInvalidBody() {
    let server = StubServer::start("200 OK", "<html>gateway</html>").await;

    let err = client(&server.url, "", 5).translate(&batch()).await.unwrap_err();
    assert!(matches!(err, NetworkError::InvalidBody(_)));
}

#[tokio::test]
async fn test_translate_withSilentServer_shouldTimeOut() {
    let server = StubServer::silent().await;

    let err = client(&server.url, "", 1).translate(&batch()).await.unwrap_err();
    assert_eq!(err, NetworkError::Timeout(1));
}

#[tokio::test]
async fn test_translate_withNothingListening_shouldReturnConnectionError() {
    let url = common::unused_local_url();

    let err = client(&url, "", 5).translate(&batch()).await.unwrap_err();
    assert!(matches!(err, NetworkError::Connection(_)));
}

#[tokio::test]
async fn test_connection_withHealthyServer_shouldSucceed() {
    let server = StubServer::start("200 OK", common::chat_body("Hello!")).await;
    tokio_test::assert_ok!(client(&server.url, "", 5).test_connection().await);
}
