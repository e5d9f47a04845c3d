//! Provider abstraction layer
//!
//! Defines the trait interfaces for the chat completion and speech
//! synthesis backends so sessions and routes can run against test doubles.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    persona::{Category, Persona},
};

/// Stream type for audio returned by the speech provider
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// Chat message role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a conversation transcript
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Token accounting reported by the provider
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Assistant reply
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatReply {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

/// Chat completion backend
///
/// Implementations MUST use their own API key and never forward client
/// credentials upstream.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Get the provider name for logging and metrics
    fn name(&self) -> &'static str;

    /// Send the conversation so far and return the assistant reply.
    ///
    /// `history` holds user/assistant turns only; the persona becomes the
    /// system message.
    async fn send(&self, history: &[ChatMessage], persona: &Persona) -> AppResult<ChatReply>;
}

/// Speech synthesis backend
#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Synthesize `text` into an audio stream (MPEG)
    async fn synthesize(&self, text: &str, category: Option<Category>) -> AppResult<ByteStream>;
}
