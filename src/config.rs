//! Configuration management for Cartomante
//!
//! Configuration is loaded from environment variables.

use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Redis connection URL
    pub redis_url: String,

    /// Supabase project URL
    pub supabase_url: String,
    /// Supabase service-role key, used for auth lookups and profile writes
    pub supabase_service_key: String,

    /// OpenAI API URL
    pub openai_api_url: String,
    /// OpenAI API key (chat and speech answer 503 without it)
    pub openai_api_key: Option<String>,
    /// Model used for chat completions
    pub chat_model: String,
    /// Sampling temperature for chat completions
    pub chat_temperature: f32,
    /// Maximum tokens per assistant reply
    pub chat_max_tokens: u32,
    /// Model used for speech synthesis
    pub tts_model: String,
    /// Voice used for speech synthesis
    pub tts_voice: String,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// Accepted clock skew for webhook signatures (in seconds)
    pub stripe_webhook_tolerance_seconds: u64,

    /// Cache TTL for profiles (in seconds)
    pub cache_ttl_seconds: u64,
    /// Cache TTL for JWT validation (in seconds)
    pub jwt_cache_ttl_seconds: u64,

    /// Seconds without client activity before a session ends itself
    pub session_idle_timeout_seconds: u64,

    /// Enable debug endpoints (development only)
    pub debug_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("CARTOMANTE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("CARTOMANTE_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid CARTOMANTE_PORT")?,

            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),

            supabase_url: env::var("SUPABASE_URL").context("SUPABASE_URL must be set")?,
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY")
                .context("SUPABASE_SERVICE_KEY must be set")?,

            openai_api_url: env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            chat_model: env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            chat_temperature: env::var("CHAT_TEMPERATURE")
                .unwrap_or_else(|_| "0.8".to_string())
                .parse()
                .context("Invalid CHAT_TEMPERATURE")?,
            chat_max_tokens: env::var("CHAT_MAX_TOKENS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("Invalid CHAT_MAX_TOKENS")?,
            tts_model: env::var("TTS_MODEL").unwrap_or_else(|_| "tts-1".to_string()),
            tts_voice: env::var("TTS_VOICE").unwrap_or_else(|_| "nova".to_string()),

            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET")
                .context("STRIPE_WEBHOOK_SECRET must be set")?,
            stripe_webhook_tolerance_seconds: env::var("STRIPE_WEBHOOK_TOLERANCE_SECONDS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("Invalid STRIPE_WEBHOOK_TOLERANCE_SECONDS")?,

            cache_ttl_seconds: env::var("CACHE_TTL_SECONDS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("Invalid CACHE_TTL_SECONDS")?,
            jwt_cache_ttl_seconds: env::var("JWT_CACHE_TTL_SECONDS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("Invalid JWT_CACHE_TTL_SECONDS")?,

            session_idle_timeout_seconds: env::var("SESSION_IDLE_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .context("Invalid SESSION_IDLE_TIMEOUT_SECONDS")?,

            debug_enabled: env::var("CARTOMANTE_DEBUG")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        })
    }
}
