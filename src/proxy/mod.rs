//! Proxy module
//!
//! Handles request forwarding to the upstream chat and speech providers.

pub mod openai;
pub mod provider;

pub use openai::OpenAIProvider;
pub use provider::{ByteStream, ChatMessage, ChatReply, ChatService, Role, SpeechService, TokenUsage};
