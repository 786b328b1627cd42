//! REST API module.
//!
//! Public read and submission routes plus session-gated admin routes, all
//! answering with the `{success, data, revisionId}` envelope.

mod auth;
mod backup;
mod blogs;
mod content;
mod gallery;
mod messages;
mod notices;
mod search;
mod sync_log;

pub use auth::*;
pub use backup::*;
pub use blogs::*;
pub use content::*;
pub use gallery::*;
pub use messages::*;
pub use notices::*;
pub use search::*;
pub use sync_log::*;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub revision_id: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, revision_id: i64) -> Self {
        Self {
            success: true,
            data,
            revision_id,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, crate::errors::AppErrorWithRevision>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T, revision_id: i64) -> ApiResult<T> {
    Ok(ApiResponse::new(data, revision_id))
}

/// Create an error API response.
pub fn error<T: Serialize>(err: crate::errors::AppError, revision_id: i64) -> ApiResult<T> {
    Err(crate::errors::AppErrorWithRevision {
        error: err,
        revision_id,
    })
}

/// Optional `?category=` filter. `All` matches everything.
#[derive(Debug, Default, Deserialize)]
pub struct CategoryQuery {
    #[serde(default)]
    pub category: Option<String>,
}

impl CategoryQuery {
    pub fn matches(&self, category: &str) -> bool {
        match self.category.as_deref() {
            None | Some("") | Some("All") => true,
            Some(wanted) => wanted == category,
        }
    }
}

/// Body for delete endpoints.
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: bool,
}

/// Answer 503 `LOADING` until the store has finished its first load.
pub async fn loading_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.store.is_loading() {
        return crate::errors::AppErrorWithRevision {
            error: crate::errors::AppError::Unavailable("Content is still loading".to_string()),
            revision_id: state.store.revision(),
        }
        .into_response();
    }
    next.run(request).await
}

/// Rebuild the search index from current content.
async fn rebuild_search_index_async(state: &AppState) {
    if let Err(e) = state.search.rebuild_from(&state.store).await {
        tracing::warn!("Failed to rebuild search index: {}", e);
    }
}
