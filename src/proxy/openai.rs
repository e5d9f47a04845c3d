//! OpenAI provider
//!
//! Chat completions (`/chat/completions`) and speech synthesis
//! (`/audio/speech`) against the OpenAI API.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::{
    config::Config,
    error::{AppError, AppResult},
    persona::{Category, Persona, FALLBACK_REPLY},
    proxy::provider::{
        ByteStream, ChatMessage, ChatReply, ChatService, Role, SpeechService, TokenUsage,
    },
};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'static str,
}

/// OpenAI client for chat and speech
pub struct OpenAIProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    chat_model: String,
    temperature: f32,
    max_tokens: u32,
    tts_model: String,
    tts_voice: String,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.openai_api_url.trim_end_matches('/').to_string(),
            api_key: config.openai_api_key.clone(),
            chat_model: config.chat_model.clone(),
            temperature: config.chat_temperature,
            max_tokens: config.chat_max_tokens,
            tts_model: config.tts_model.clone(),
            tts_voice: config.tts_voice.clone(),
        }
    }

    /// Check if the provider is configured with an API key
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// POST a JSON body and return the raw response after a status check
    async fn post<T: Serialize>(&self, path: &str, body: &T) -> AppResult<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .headers(self.default_headers()?)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(url = %url, error = %e, "Failed to send request to OpenAI");
                e
            })?;

        let status = response.status();
        debug!(url = %url, status = %status, "Received response from OpenAI");

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(url = %url, status = %status, body = %text, "OpenAI request failed");
            return Err(AppError::UpstreamError(format!(
                "OpenAI error {}: {}",
                status, text
            )));
        }

        Ok(response)
    }

    /// Build default headers for provider requests
    fn default_headers(&self) -> AppResult<HeaderMap> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            AppError::ServiceUnavailable("OPENAI_API_KEY is not configured".to_string())
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid API key: {}", e)))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl ChatService for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    #[instrument(skip(self, history, persona), fields(turns = history.len(), operator = %persona.operator))]
    async fn send(&self, history: &[ChatMessage], persona: &Persona) -> AppResult<ChatReply> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage {
            role: Role::System,
            content: persona.system_prompt(),
        });
        messages.extend(
            history
                .iter()
                .filter(|m| m.role != Role::System)
                .cloned(),
        );

        let request = ChatCompletionRequest {
            model: &self.chat_model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };

        let response = self.post("/chat/completions", &request).await?;
        let body = response.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, "Failed to parse chat completion response");
            AppError::UpstreamError(format!("Failed to parse OpenAI response: {}", e))
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_REPLY.to_string());

        Ok(ChatReply {
            text,
            usage: parsed.usage,
        })
    }
}

#[async_trait]
impl SpeechService for OpenAIProvider {
    #[instrument(skip(self, text, _category), fields(chars = text.len()))]
    async fn synthesize(&self, text: &str, _category: Option<Category>) -> AppResult<ByteStream> {
        let request = SpeechRequest {
            model: &self.tts_model,
            input: text,
            voice: &self.tts_voice,
            response_format: "mp3",
        };

        let response = self.post("/audio/speech", &request).await?;
        Ok(Box::pin(response.bytes_stream()))
    }
}
