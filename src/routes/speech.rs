//! Text-to-speech endpoint
//!
//! Streams synthesized MPEG audio back to the client as it arrives.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    error::{AppError, AppResult},
    middleware::auth::AuthenticatedUser,
    persona::Category,
    routes::metrics::record_request,
    AppState,
};

/// Longest text accepted for synthesis
const MAX_SPEECH_CHARS: usize = 4096;

/// Speech request
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Text-to-speech handler
pub async fn text_to_speech(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<SpeechRequest>,
) -> AppResult<Response> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest("Text is required".to_string()));
    }
    if text.chars().count() > MAX_SPEECH_CHARS {
        return Err(AppError::BadRequest(format!(
            "Text exceeds {} characters",
            MAX_SPEECH_CHARS
        )));
    }

    let category = request
        .category
        .as_deref()
        .and_then(|c| c.parse::<Category>().ok());

    let start = Instant::now();
    let stream = match state.speech.synthesize(text, category).await {
        Ok(stream) => stream,
        Err(e) => {
            record_request("text_to_speech", "error", start.elapsed().as_secs_f64());
            warn!(user_id = %user.user_id, error = %e, "Speech synthesis failed");
            return Err(e);
        }
    };
    record_request("text_to_speech", "success", start.elapsed().as_secs_f64());
    info!(user_id = %user.user_id, chars = text.len(), "Streaming synthesized speech");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "audio/mpeg"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}
