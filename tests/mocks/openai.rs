//! Mock OpenAI server for testing
//!
//! Provides wiremock-based mocks for:
//! - POST /chat/completions
//! - POST /audio/speech

use serde_json::{json, Value};
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

/// Bytes returned by the speech mock
pub const FAKE_MP3: &[u8] = b"ID3\x03\x00\x00\x00fake-mpeg-frames";

/// Mock OpenAI server wrapper
pub struct MockOpenAI {
    server: MockServer,
}

impl MockOpenAI {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub async fn received_requests(&self) -> Vec<wiremock::Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// JSON bodies of chat completion requests received so far
    pub async fn chat_request_bodies(&self) -> Vec<Value> {
        self.received_requests()
            .await
            .into_iter()
            .filter(|r| r.url.path() == "/chat/completions")
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }

    /// Chat completion returning `content`
    pub async fn mock_chat_reply(&self, content: &str) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header(
                "Authorization",
                format!("Bearer {}", crate::common::constants::TEST_OPENAI_API_KEY).as_str(),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-test123",
                "object": "chat.completion",
                "created": 1706745600,
                "model": "gpt-4o-mini",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": content},
                    "finish_reason": "stop"
                }],
                "usage": {
                    "prompt_tokens": 120,
                    "completion_tokens": 30,
                    "total_tokens": 150
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// Chat completion with a null message content
    pub async fn mock_chat_empty(&self) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-empty",
                "object": "chat.completion",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": null},
                    "finish_reason": "stop"
                }]
            })))
            .mount(&self.server)
            .await;
    }

    /// Chat completion failing with `status`
    pub async fn mock_chat_error(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "error": {"message": "upstream failure", "type": "server_error"}
            })))
            .mount(&self.server)
            .await;
    }

    /// Speech synthesis returning [`FAKE_MP3`]
    pub async fn mock_speech(&self) {
        Mock::given(method("POST"))
            .and(path("/audio/speech"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(FAKE_MP3)
                    .insert_header("content-type", "audio/mpeg"),
            )
            .mount(&self.server)
            .await;
    }

    pub async fn mock_speech_error(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/audio/speech"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }
}
