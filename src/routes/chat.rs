//! Chat endpoint
//!
//! Stateless single-turn chat: the client sends its history and the new
//! message, the server adds the persona and returns the reply.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::{AppError, AppResult},
    middleware::auth::AuthenticatedUser,
    persona::Persona,
    proxy::{ChatMessage, Role, TokenUsage},
    routes::metrics::record_request,
    AppState,
};

/// Longest client-supplied history kept in the prompt
const MAX_HISTORY_MESSAGES: usize = 40;

/// Chat request
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

/// Chat response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// Drop system messages and keep only the most recent turns
fn sanitize_history(history: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let turns: Vec<ChatMessage> = history
        .into_iter()
        .filter(|m| m.role != Role::System && !m.content.trim().is_empty())
        .collect();
    let skip = turns.len().saturating_sub(MAX_HISTORY_MESSAGES);
    turns.into_iter().skip(skip).collect()
}

/// Chat handler
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("Message is required".to_string()));
    }

    let persona = Persona::from_request(request.operator.as_deref(), request.category.as_deref());
    let mut history = sanitize_history(request.history);
    history.push(ChatMessage::user(message));

    let start = Instant::now();
    let result = state.chat.send(&history, &persona).await;
    let elapsed = start.elapsed().as_secs_f64();

    match result {
        Ok(reply) => {
            record_request("chat", "success", elapsed);
            info!(
                user_id = %user.user_id,
                operator = %persona.operator,
                category = ?persona.category,
                total_tokens = reply.usage.as_ref().map(|u| u.total_tokens),
                "Chat reply generated"
            );
            Ok(Json(ChatResponse {
                text: reply.text,
                usage: reply.usage,
            }))
        }
        Err(e) => {
            record_request("chat", "error", elapsed);
            warn!(user_id = %user.user_id, error = %e, "Chat request failed");
            Err(e)
        }
    }
}
