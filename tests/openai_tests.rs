//! OpenAI-compatible chat client against a mocked completions endpoint.

use deepdive::llm::LLMClient;
use deepdive::llm::openai::OpenAIClient;
use deepdive::types::AppError;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============= Helper Functions =============

/// Create a mock chat completion response
fn mock_completion(content: Option<&str>) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_735_689_600,
        "model": "gemini-2.5-flash",
        "choices": [
            {
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": content
                },
                "finish_reason": "stop"
            }
        ],
        "usage": {
            "prompt_tokens": 12,
            "completion_tokens": 8,
            "total_tokens": 20
        }
    })
}

fn client(server: &MockServer) -> OpenAIClient {
    OpenAIClient::new(
        "test-key".to_string(),
        server.uri(),
        "gemini-2.5-flash".to_string(),
    )
}

// ============= Tests =============

#[tokio::test]
async fn test_generate_returns_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gemini-2.5-flash",
            "messages": [{ "role": "user", "content": "Summarize AI agents" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_completion(Some(
            "Agents plan and use tools.",
        ))))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    assert_eq!(client.model_name(), "gemini-2.5-flash");

    let text = client.generate("Summarize AI agents").await.unwrap();
    assert_eq!(text, "Agents plan and use tools.");
}

#[tokio::test]
async fn test_generate_sends_configured_temperature() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "temperature": 0.25,
            "messages": [{ "role": "user", "content": "Define RAG" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_completion(Some("Retrieval."))))
        .expect(1)
        .mount(&server)
        .await;

    let text = client(&server)
        .with_temperature(Some(0.25))
        .generate("Define RAG")
        .await
        .unwrap();
    assert_eq!(text, "Retrieval.");
}

#[tokio::test]
async fn test_generate_missing_content_is_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_completion(None)))
        .mount(&server)
        .await;

    let err = client(&server).generate("hello").await.unwrap_err();
    assert!(matches!(err, AppError::LLM(ref msg) if msg.contains("No response")));
}

#[tokio::test]
async fn test_generate_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "message": "API key not valid",
                "type": "invalid_request_error",
                "param": null,
                "code": "invalid_api_key"
            }
        })))
        .mount(&server)
        .await;

    let err = client(&server).generate("hello").await.unwrap_err();
    match err {
        AppError::LLM(msg) => assert!(msg.contains("API key not valid"), "message: {}", msg),
        other => panic!("Expected LLM error, got {:?}", other),
    }
}
