//! Admin login and logout.

use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};

use super::{error, success, ApiResult};
use crate::auth::session_token;
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
    pub logged_out: bool,
}

/// POST /api/auth/login - Exchange credentials for a session token.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let revision_id = state.store.revision();

    if !state
        .store
        .verify_credentials(&request.username, &request.password)
        .await
    {
        tracing::warn!(username = %request.username, "Failed admin login");
        return error(
            AppError::Unauthorized("Invalid username or password".to_string()),
            revision_id,
        );
    }

    let token = state.sessions.issue().await;
    tracing::info!(username = %request.username, "Admin logged in");
    success(LoginResponse { token }, revision_id)
}

/// POST /api/auth/logout - End the current session.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<LogoutResponse> {
    let logged_out = match session_token(&headers) {
        Some(token) => state.sessions.revoke(&token).await,
        None => false,
    };

    success(LogoutResponse { logged_out }, state.store.revision())
}
