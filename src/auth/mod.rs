//! Session-based admin authentication.
//!
//! A successful login issues an opaque token. Admin routes accept it in the
//! `x-session-token` header or as an `Authorization: Bearer` value.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::{AppError, ErrorResponse};

/// Header name for the session token.
pub const SESSION_HEADER: &str = "x-session-token";

/// Tokens issued to logged-in admins.
#[derive(Default)]
pub struct Sessions {
    tokens: RwLock<HashSet<String>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session and return its token.
    pub async fn issue(&self) -> String {
        let token = Uuid::new_v4().to_string();
        self.tokens.write().await.insert(token.clone());
        token
    }

    pub async fn is_valid(&self, token: &str) -> bool {
        let tokens = self.tokens.read().await;
        let mut found = false;
        for known in tokens.iter() {
            found |= constant_time_compare(token, known);
        }
        found
    }

    /// End a session. Returns whether the token was live.
    pub async fn revoke(&self, token: &str) -> bool {
        self.tokens.write().await.remove(token)
    }
}

/// Extract the session token from request headers.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(token.to_string());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Reject requests without a live session.
pub async fn session_auth_layer(sessions: Arc<Sessions>, request: Request, next: Next) -> Response {
    match session_token(request.headers()) {
        Some(token) if sessions.is_valid(&token).await => next.run(request).await,
        Some(_) => unauthorized_response("Session expired or invalid"),
        None => unauthorized_response("Login required"),
    }
}

/// Perform constant-time string comparison.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    a_bytes.ct_eq(b_bytes).into()
}

/// Create an unauthorized response.
fn unauthorized_response(message: &str) -> Response {
    let body = ErrorResponse::new(&AppError::Unauthorized(message.to_string()), 0);
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("test-key-123", "test-key-123"));
        assert!(!constant_time_compare("test-key-123", "test-key-124"));
        assert!(!constant_time_compare("short", "much-longer-key"));
        assert!(constant_time_compare("", ""));
        assert!(!constant_time_compare("", "not-empty"));
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let sessions = Sessions::new();
        let first = sessions.issue().await;
        let second = sessions.issue().await;
        assert_ne!(first, second);

        assert!(sessions.is_valid(&first).await);
        assert!(!sessions.is_valid("made-up").await);

        assert!(sessions.revoke(&first).await);
        assert!(!sessions.is_valid(&first).await);
        assert!(!sessions.revoke(&first).await);

        // Other sessions are unaffected
        assert!(sessions.is_valid(&second).await);
    }

    #[test]
    fn test_token_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(session_token(&headers).as_deref(), Some("abc"));

        headers.insert(SESSION_HEADER, HeaderValue::from_static("xyz"));
        assert_eq!(session_token(&headers).as_deref(), Some("xyz"));

        let mut basic = HeaderMap::new();
        basic.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(session_token(&basic), None);
    }
}
