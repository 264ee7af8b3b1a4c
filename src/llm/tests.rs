use super::*;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> ChatConfig {
    ChatConfig {
        base_url: format!("{}/v1beta", server.uri()),
        model: "test-model".to_string(),
        api_key: Some("secret".to_string()),
        ..ChatConfig::default()
    }
}

fn test_client(config: &ChatConfig) -> GeminiClient {
    GeminiClient::new(config)
        .expect("Failed to create client")
        .with_http_client(HttpClient::new(Duration::from_secs(5), 1))
}

fn answer(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

#[test]
fn missing_api_key_is_rejected() {
    let config = ChatConfig::default();
    assert!(matches!(
        GeminiClient::new(&config),
        Err(AssistantError::MissingCredential { env_var }) if env_var == "GEMINI_KEY"
    ));
}

#[test]
fn debug_output_hides_api_key() {
    let config = ChatConfig {
        api_key: Some("super-secret".to_string()),
        ..ChatConfig::default()
    };
    let client = GeminiClient::new(&config).expect("Failed to create client");
    let debug = format!("{:?}", client);

    assert!(!debug.contains("super-secret"));
    assert!(debug.contains("gemini-2.0-flash-exp"));
}

#[test]
fn message_constructors() {
    assert_eq!(ChatMessage::user("hi").role, Role::User);
    assert_eq!(ChatMessage::assistant("hello").role, Role::Assistant);
    assert_eq!(Role::Assistant.to_string(), "assistant");
}

#[tokio::test(flavor = "multi_thread")]
async fn sends_history_with_gemini_roles() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/test-model:generateContent"))
        .and(header("x-goog-api-key", "secret"))
        .and(body_json(json!({
            "contents": [
                { "role": "user", "parts": [{ "text": "Bonjour" }] },
                { "role": "model", "parts": [{ "text": "Bonjour !" }] },
                { "role": "user", "parts": [{ "text": "Qu'est-ce qu'un LLM ?" }] }
            ],
            "generationConfig": { "temperature": 0.3 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(answer("Un grand modèle de langage.")))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&config_for(&server));
    let reply = tokio::task::spawn_blocking(move || {
        client.chat(&[
            ChatMessage::user("Bonjour"),
            ChatMessage::assistant("Bonjour !"),
            ChatMessage::user("Qu'est-ce qu'un LLM ?"),
        ])
    })
    .await
    .expect("blocking task should finish")
    .expect("chat should succeed");

    assert_eq!(reply, "Un grand modèle de langage.");
}

#[tokio::test(flavor = "multi_thread")]
async fn joins_multiple_parts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Hello, " }, { "text": "world" }] } }]
        })))
        .mount(&server)
        .await;

    let client = test_client(&config_for(&server));
    let reply = tokio::task::spawn_blocking(move || client.chat(&[ChatMessage::user("hi")]))
        .await
        .expect("blocking task should finish")
        .expect("chat should succeed");

    assert_eq!(reply, "Hello, world");
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_candidates_is_a_model_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let client = test_client(&config_for(&server));
    let result = tokio::task::spawn_blocking(move || client.chat(&[ChatMessage::user("hi")]))
        .await
        .expect("blocking task should finish");

    assert!(matches!(result, Err(AssistantError::Model(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_is_recoverable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = test_client(&config_for(&server));
    let result = tokio::task::spawn_blocking(move || client.chat(&[ChatMessage::user("hi")]))
        .await
        .expect("blocking task should finish");

    let error = result.expect_err("server error should fail the call");
    assert!(matches!(error, AssistantError::Network(_)));
    assert!(error.is_recoverable());
}

#[test]
fn empty_conversation_is_rejected() {
    let config = ChatConfig {
        api_key: Some("secret".to_string()),
        ..ChatConfig::default()
    };
    let client = GeminiClient::new(&config).expect("Failed to create client");
    assert!(matches!(client.chat(&[]), Err(AssistantError::Model(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn single_attempt_client_never_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let config = ChatConfig {
        retry_attempts: 3,
        ..config_for(&server)
    };
    let client = GeminiClient::new(&config)
        .expect("Failed to create client")
        .single_attempt();
    let result = tokio::task::spawn_blocking(move || client.chat(&[ChatMessage::user("oui ?")]))
        .await
        .expect("blocking task should finish");

    assert!(matches!(result, Err(AssistantError::Network(_))));
}
