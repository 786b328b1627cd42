//! Backup export and import.

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;

use super::{error, rebuild_search_index_async, success, ApiResult};
use crate::errors::{AppError, AppErrorWithRevision};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ImportQuery {
    /// Import replaces everything, so it has to be asked for explicitly.
    #[serde(default)]
    pub confirm: bool,
}

/// Attachment name for an export made today.
pub fn backup_file_name() -> String {
    format!("school-data-backup-{}.json", Utc::now().format("%Y-%m-%d"))
}

/// GET /api/admin/export - Download all content as JSON.
pub async fn export_content(State(state): State<AppState>) -> Result<Response, AppErrorWithRevision> {
    let revision_id = state.store.revision();

    let body = state
        .store
        .export_json()
        .await
        .map_err(|e| AppErrorWithRevision {
            error: e,
            revision_id,
        })?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", backup_file_name()),
            ),
        ],
        body,
    )
        .into_response())
}

/// POST /api/admin/import?confirm=true - Replace all content from a backup.
pub async fn import_content(
    State(state): State<AppState>,
    Query(params): Query<ImportQuery>,
    body: String,
) -> ApiResult<()> {
    let revision_id = state.store.revision();

    if !params.confirm {
        return error(
            AppError::BadRequest(
                "Importing replaces all current data; repeat with confirm=true".to_string(),
            ),
            revision_id,
        );
    }

    match state.store.import_json(&body).await {
        Ok(()) => {
            rebuild_search_index_async(&state).await;
            success((), state.store.revision())
        }
        Err(e) => error(e, revision_id),
    }
}
