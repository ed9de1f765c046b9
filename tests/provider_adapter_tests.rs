use codebuddy::history::{ChatTurn, ConversationHistory};
use codebuddy::llm_providers::{
    AdapterRegistry, AnthropicAdapter, GeminiAdapter, GroqAdapter, OllamaAdapter, ProviderAdapter,
};
use codebuddy::providers::{ProviderKind, ProviderSelection};
use codebuddy::ErrorKind;
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn selection(kind: ProviderKind, credential: &str, base_url: &str) -> ProviderSelection {
    ProviderSelection {
        kind,
        credential: credential.to_string(),
        model: "test-model".to_string(),
        base_url: Some(base_url.to_string()),
    }
}

/// One prior exchange
fn one_exchange() -> ConversationHistory {
    [
        ChatTurn::user("What does f do?"),
        ChatTurn::assistant("Nothing yet."),
    ]
    .into_iter()
    .collect()
}

async fn last_body(server: &MockServer) -> Value {
    let requests = server
        .received_requests()
        .await
        .expect("request recording is enabled");
    requests
        .last()
        .expect("one request was sent")
        .body_json()
        .expect("request body is JSON")
}

#[tokio::test]
async fn test_groq_sends_history_then_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .and(header("authorization", "Bearer gsk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Still nothing." } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = GroqAdapter;
    let client = adapter
        .build_client(&selection(ProviderKind::Groq, "gsk-test", &server.uri()))
        .expect("client should build");
    let result = adapter
        .invoke(&client, &one_exchange(), "And now?", "test-model")
        .await
        .expect("invoke should succeed");

    assert_eq!(result.raw_text, "Still nothing.");
    assert!(!result.streamed);

    let body = last_body(&server).await;
    let messages = body["messages"].as_array().expect("messages array");
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[2], json!({ "role": "user", "content": "And now?" }));
    assert_eq!(body["model"], "test-model");
    assert_eq!(body["max_tokens"], 5024);
    assert_eq!(body["stream"], false);
}

#[tokio::test]
async fn test_anthropic_sends_history_with_api_key_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [
                { "type": "text", "text": "Part one, " },
                { "type": "tool_use", "id": "x", "name": "noop", "input": {} },
                { "type": "text", "text": "part two." }
            ]
        })))
        .mount(&server)
        .await;

    let adapter = AnthropicAdapter;
    let client = adapter
        .build_client(&selection(ProviderKind::Anthropic, "sk-ant-test", &server.uri()))
        .expect("client should build");
    let result = adapter
        .invoke(&client, &one_exchange(), "And now?", "test-model")
        .await
        .expect("invoke should succeed");

    assert_eq!(result.raw_text, "Part one, part two.");
    let body = last_body(&server).await;
    assert_eq!(body["messages"].as_array().map(Vec::len), Some(3));
    assert_eq!(body["max_tokens"], 3024);
}

#[tokio::test]
async fn test_gemini_sends_only_the_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/test-model:generateContent"))
        .and(query_param("key", "AIza-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Hel" }, { "text": "lo" }] }
            }]
        })))
        .mount(&server)
        .await;

    let adapter = GeminiAdapter;
    let client = adapter
        .build_client(&selection(ProviderKind::Gemini, "AIza-test", &server.uri()))
        .expect("client should build");
    let result = adapter
        .invoke(&client, &one_exchange(), "And now?", "test-model")
        .await
        .expect("invoke should succeed");

    assert_eq!(result.raw_text, "Hello");
    let body = last_body(&server).await;
    let contents = body["contents"].as_array().expect("contents array");
    assert_eq!(contents.len(), 1);
    assert_eq!(contents[0]["role"], "user");
    assert_eq!(contents[0]["parts"][0]["text"], "And now?");
}

#[tokio::test]
async fn test_ollama_stream_is_drained_in_order() {
    let server = MockServer::start().await;
    let ndjson = concat!(
        "{\"message\":{\"role\":\"assistant\",\"content\":\"He\"},\"done\":false}\n",
        "{\"message\":{\"role\":\"assistant\",\"content\":\"llo\"},\"done\":false}\n",
        "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n",
    );
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(ndjson, "application/x-ndjson"))
        .mount(&server)
        .await;

    let adapter = OllamaAdapter;
    let client = adapter
        .build_client(&selection(ProviderKind::Ollama, "local", &server.uri()))
        .expect("client should build");
    let result = adapter
        .invoke(&client, &one_exchange(), "And now?", "test-model")
        .await
        .expect("invoke should succeed");

    assert_eq!(result.raw_text, "Hello");
    assert!(result.streamed);
    let body = last_body(&server).await;
    assert_eq!(body["stream"], true);
    assert_eq!(body["messages"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn test_http_failure_is_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let adapter = GroqAdapter;
    let client = adapter
        .build_client(&selection(ProviderKind::Groq, "bad", &server.uri()))
        .expect("client should build");
    let err = adapter
        .invoke(&client, &ConversationHistory::new(), "hi", "test-model")
        .await
        .expect_err("must fail");

    assert_eq!(err.kind(), ErrorKind::Provider);
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn test_answer_without_text_is_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let adapter = GroqAdapter;
    let client = adapter
        .build_client(&selection(ProviderKind::Groq, "gsk", &server.uri()))
        .expect("client should build");
    let err = adapter
        .invoke(&client, &ConversationHistory::new(), "hi", "test-model")
        .await
        .expect_err("must fail");

    assert_eq!(err.kind(), ErrorKind::Provider);
}

#[test]
fn test_blank_credentials_rejected_for_groq_and_ollama() {
    for adapter in [
        &GroqAdapter as &dyn ProviderAdapter,
        &OllamaAdapter as &dyn ProviderAdapter,
    ] {
        let err = adapter
            .build_client(&selection(adapter.kind(), "", "http://127.0.0.1:1"))
            .expect_err("blank credential must be rejected");
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    // Gemini and Anthropic defer to the first call
    assert!(
        GeminiAdapter
            .build_client(&selection(ProviderKind::Gemini, "", "http://127.0.0.1:1"))
            .is_ok()
    );
}

#[test]
fn test_registry_covers_every_provider() {
    let registry = AdapterRegistry::default();
    for kind in ProviderKind::ALL {
        let adapter = registry.get(*kind).expect("adapter registered");
        assert_eq!(adapter.kind(), *kind);
    }
    assert!(AdapterRegistry::empty().get(ProviderKind::Groq).is_none());
}

#[test]
fn test_system_turns_use_native_fields() {
    let history: ConversationHistory = [ChatTurn::system("Be brief.")].into_iter().collect();

    let anthropic = AnthropicAdapter.build_request(&history, "hi", "m");
    assert_eq!(anthropic["system"], "Be brief.");
    assert_eq!(anthropic["messages"].as_array().map(Vec::len), Some(1));

    let groq = GroqAdapter.build_request(&history, "hi", "m");
    assert_eq!(groq["messages"][0]["role"], "system");
}

#[test]
fn test_empty_history_sends_exactly_one_user_turn() {
    let history = ConversationHistory::new();
    for adapter in [
        &GroqAdapter as &dyn ProviderAdapter,
        &AnthropicAdapter as &dyn ProviderAdapter,
        &OllamaAdapter as &dyn ProviderAdapter,
    ] {
        let body = adapter.build_request(&history, "Explain this", "m");
        let messages = body["messages"].as_array().expect("messages array");
        assert_eq!(messages.len(), 1, "{} payload", adapter.kind());
        assert_eq!(
            messages[0],
            json!({ "role": "user", "content": "Explain this" }),
            "{} payload",
            adapter.kind()
        );
    }
}

#[test]
fn test_odd_window_history_still_opens_with_user_for_anthropic() {
    let history = ConversationHistory::new()
        .recorded("q1", "a1", 3)
        .recorded("q2", "a2", 3);

    let body = AnthropicAdapter.build_request(&history, "q3", "m");
    let roles: Vec<_> = body["messages"]
        .as_array()
        .expect("messages array")
        .iter()
        .map(|message| message["role"].clone())
        .collect();
    assert_eq!(roles, [json!("user"), json!("assistant"), json!("user")]);
}
