//! Authentication middleware
//!
//! Validates Supabase JWTs and caches validation results.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use crate::{error::AppError, AppState};

/// Authenticated caller, inserted into request extensions
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: Option<String>,
}

/// Extract the Authorization header and return the bearer token
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Hash a JWT for cache key
pub fn hash_jwt(jwt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(jwt.as_bytes());
    hex::encode(hasher.finalize())
}

/// Authentication middleware
///
/// This middleware:
/// 1. Extracts JWT from Authorization header
/// 2. Checks the JWT cache for an existing validation
/// 3. If not cached, validates with Supabase auth
/// 4. Adds AuthenticatedUser to request extensions
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = extract_bearer_token(auth_header).ok_or(AppError::InvalidToken)?;

    let token_hash = hash_jwt(token);
    debug!(token_hash = %token_hash, "Processing authentication request");

    let auth_user = match state.profile_cache.validate_jwt(token, &token_hash).await {
        Ok(user) => user,
        Err(e) => {
            warn!(error = %e, "JWT validation failed");
            return Err(e);
        }
    };

    let user = AuthenticatedUser {
        user_id: auth_user.id,
        email: auth_user.email,
    };

    debug!(user_id = %user.user_id, "User authenticated successfully");

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
