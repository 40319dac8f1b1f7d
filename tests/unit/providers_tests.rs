/*!
 * Tests for provider implementations
 */

use subtrans::errors::ProviderError;
use subtrans::language_utils::TargetLanguage;
use subtrans::providers::anthropic::{Anthropic, AnthropicRequest, AnthropicResponse};
use subtrans::providers::mock::{MockProvider, MockRequest};
use subtrans::providers::ollama::{ChatMessage, ChatRequest, ChatResponse, Ollama};
use subtrans::providers::openai::{OpenAI, OpenAIRequest, OpenAIResponse};
use subtrans::providers::Provider;

// Nothing listens on the discard port in the test environment
const UNREACHABLE: &str = "http://127.0.0.1:9";

fn mock_request(text: &str) -> MockRequest {
    MockRequest {
        text: text.to_string(),
        target_language: TargetLanguage::English,
    }
}

#[test]
fn test_openAIResponse_fromJson_shouldExtractFirstChoice() {
    let json = r#"{
        "id": "chatcmpl-1",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": "Xin chào" }, "finish_reason": "stop" },
            { "index": 1, "message": { "role": "assistant", "content": "ignored" }, "finish_reason": "stop" }
        ],
        "usage": { "prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15 }
    }"#;

    let response: OpenAIResponse = serde_json::from_str(json).unwrap();

    assert_eq!(OpenAI::extract_text(&response), "Xin chào");
    assert_eq!(response.usage.unwrap().completion_tokens, 3);
}

#[test]
fn test_anthropicResponse_fromJson_shouldJoinTextBlocks() {
    let json = r#"{
        "id": "msg_1",
        "type": "message",
        "content": [
            { "type": "text", "text": "Hello " },
            { "type": "tool_use", "id": "t1", "name": "noop", "input": {} },
            { "type": "text", "text": "world" }
        ]
    }"#;

    let response: AnthropicResponse = serde_json::from_str(json).unwrap();

    assert_eq!(Anthropic::extract_text(&response), "Hello world");
    assert!(response.usage.is_none());
}

#[test]
fn test_ollamaResponse_fromJson_shouldReturnMessageContent() {
    let json = r#"{ "model": "llama3.2:3b", "message": { "role": "assistant", "content": "Bonjour" }, "done": true }"#;

    let response: ChatResponse = serde_json::from_str(json).unwrap();

    assert_eq!(Ollama::extract_text(&response), "Bonjour");
    assert!(response.done);
}

#[test]
fn test_requests_shouldSerializeProviderSpecificFields() {
    let openai = serde_json::to_value(OpenAIRequest::new("gpt-4o-mini").add_message("user", "hi").max_tokens(64)).unwrap();
    assert_eq!(openai["model"], "gpt-4o-mini");
    assert_eq!(openai["messages"][0]["content"], "hi");

    let anthropic = serde_json::to_value(AnthropicRequest::new("claude-3-haiku-20240307", 128).system("be brief")).unwrap();
    assert_eq!(anthropic["max_tokens"], 128);
    assert_eq!(anthropic["system"], "be brief");

    let ollama = serde_json::to_value(ChatRequest::new("llama3.2:3b", vec![ChatMessage::new("user", "hi")]).max_tokens(32)).unwrap();
    assert_eq!(ollama["stream"], false);
    assert_eq!(ollama["options"]["num_predict"], 32);
}

#[tokio::test]
async fn test_openAIComplete_withUnreachableEndpoint_shouldReturnConnectionError() {
    let client = OpenAI::new("sk-test", UNREACHABLE, 2);

    let result = client.complete(OpenAIRequest::new("gpt-4o-mini").add_message("user", "hi")).await;

    assert!(matches!(result, Err(ProviderError::ConnectionError(_))));
}

#[tokio::test]
async fn test_ollamaTestConnection_withUnreachableEndpoint_shouldFail() {
    let client = Ollama::from_url(UNREACHABLE, 2);
    assert!(client.test_connection().await.is_err());
}

#[tokio::test]
async fn test_mockProvider_intermittent_shouldFailEveryNthRequest() {
    let provider = MockProvider::intermittent(3);

    let mut failures = Vec::new();
    for i in 0..6 {
        if provider.complete(mock_request("x")).await.is_err() {
            failures.push(i);
        }
    }

    assert_eq!(failures, vec![2, 5]);
    assert_eq!(provider.request_count(), 6);
}

#[tokio::test]
async fn test_mockProvider_clone_shouldShareCounters() {
    let provider = MockProvider::working();
    let clone = provider.clone();

    clone.complete(mock_request("a")).await.unwrap();

    assert_eq!(provider.request_count(), 1);
    assert_eq!(provider.received(), vec!["a".to_string()]);
}

#[tokio::test]
async fn test_mockProvider_withCustomResponse_shouldUseGenerator() {
    let provider = MockProvider::working().with_custom_response(|request| request.text.chars().rev().collect());

    let response = provider.complete(mock_request("abc")).await.unwrap();

    assert_eq!(MockProvider::extract_text(&response), "cba");
}

#[test]
fn test_tagTextLines_shouldLeaveStructureLinesAlone() {
    let tagged = MockProvider::tag_text_lines("WEBVTT\n\n00:01.000 --> 00:02.000\nHi\n[00:01.00]\n[00:02.00][00:03.00]Chorus", "vi");
    assert_eq!(tagged, "WEBVTT\n\n00:01.000 --> 00:02.000\nvi: Hi\n[00:01.00]\n[00:02.00][00:03.00]vi: Chorus");
}

#[test]
fn test_mockProvider_failingOn_shouldFailOnlyThatRequest() {
    let provider = MockProvider::failing_on(1);

    let results = tokio_test::block_on(async {
        let mut results = Vec::new();
        for text in ["a", "b", "c"] {
            results.push(provider.complete(mock_request(text)).await);
        }
        results
    });

    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(ProviderError::ConnectionError(_))));
    assert_eq!(MockProvider::extract_text(results[2].as_ref().unwrap()), "en: c");
}
